use crate::config::AppConfig;
use crate::shared::utils::DbPool;
use aws_sdk_s3::Client as S3Client;

#[derive(Clone)]
pub struct AppState {
    pub drive: Option<S3Client>,
    pub bucket_name: String,
    pub config: AppConfig,
    pub conn: DbPool,
    pub http: reqwest::Client,
}
