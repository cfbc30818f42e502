use axum::{
    extract::{Multipart, Path, State},
    routing::{delete, get, put},
    Json, Router,
};
use aws_config::BehaviorVersion;
use aws_sdk_s3::{config::Builder as S3ConfigBuilder, Client as S3Client};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::DriveConfig;
use crate::session::Session;
use crate::shared::error::ApiError;
use crate::shared::models::schema::{clients, files};
use crate::shared::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Pending,
    Verified,
    Rejected,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "verified" => Some(Self::Verified),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Verification is a one-shot decision out of pending.
    pub fn can_transition(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Verified) | (Self::Pending, Self::Rejected)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = files)]
pub struct FileRecord {
    pub id: Uuid,
    pub client_id: Uuid,
    pub file_name: String,
    pub storage_key: String,
    pub category: Option<String>,
    pub status: String,
    pub verified_at: Option<DateTime<Utc>>,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct SetFileStatusRequest {
    pub status: String,
}

pub fn storage_key_for(client_id: Uuid, file_name: &str) -> String {
    format!("clients/{}/{}", client_id, file_name)
}

pub async fn init_drive(config: &DriveConfig) -> Result<S3Client, Box<dyn std::error::Error>> {
    let endpoint = if !config.server.ends_with('/') {
        format!("{}/", config.server)
    } else {
        config.server.clone()
    };

    let base_config = aws_config::defaults(BehaviorVersion::latest())
        .endpoint_url(endpoint)
        .region("auto")
        .credentials_provider(aws_sdk_s3::config::Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "static",
        ))
        .load()
        .await;

    let s3_config = S3ConfigBuilder::from(&base_config)
        .force_path_style(true)
        .build();

    Ok(S3Client::from_conf(s3_config))
}

async fn upload_to_drive(
    client: &S3Client,
    bucket: &str,
    key: &str,
    data: Vec<u8>,
) -> Result<(), String> {
    client
        .put_object()
        .bucket(bucket)
        .key(key)
        .body(data.into())
        .send()
        .await
        .map_err(|e| e.to_string())?;
    Ok(())
}

async fn remove_from_drive(client: &S3Client, bucket: &str, key: &str) -> Result<(), String> {
    client
        .delete_object()
        .bucket(bucket)
        .key(key)
        .send()
        .await
        .map_err(|e| e.to_string())?;
    Ok(())
}

/// Upload writes the storage object first, then the metadata row with status
/// pending. An upload whose storage write fails leaves no metadata behind.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    _session: Session,
    Path(client_id): Path<Uuid>,
    mut payload: Multipart,
) -> Result<Json<FileRecord>, ApiError> {
    let mut conn = state.conn.get().map_err(ApiError::db)?;

    let client_exists: i64 = clients::table
        .filter(clients::id.eq(client_id))
        .count()
        .get_result(&mut conn)?;
    if client_exists == 0 {
        return Err(ApiError::NotFound(format!("client {client_id} not found")));
    }

    let mut file_name: Option<String> = None;
    let mut category: Option<String> = None;
    let mut data: Option<Vec<u8>> = None;

    while let Some(field) = payload
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("invalid multipart payload: {e}")))?
    {
        let field_name = field.name().map(|n| n.to_string());
        match field_name.as_deref() {
            Some("category") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Validation(format!("invalid category field: {e}")))?;
                category = Some(text);
            }
            _ => {
                file_name = field.file_name().map(|n| n.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(format!("invalid file field: {e}")))?;
                data = Some(bytes.to_vec());
            }
        }
    }

    let data = data.ok_or_else(|| ApiError::Validation("no file in payload".to_string()))?;
    let file_name = file_name.unwrap_or_else(|| "unnamed_file".to_string());

    let drive = state
        .drive
        .as_ref()
        .ok_or_else(|| ApiError::Storage("drive is not configured".to_string()))?;

    let storage_key = storage_key_for(client_id, &file_name);
    upload_to_drive(drive, &state.bucket_name, &storage_key, data)
        .await
        .map_err(|e| {
            error!("drive upload of {} failed: {}", storage_key, e);
            ApiError::Storage("failed to store file".to_string())
        })?;

    let record = FileRecord {
        id: Uuid::new_v4(),
        client_id,
        file_name,
        storage_key,
        category,
        status: FileStatus::Pending.as_str().to_string(),
        verified_at: None,
        uploaded_at: Utc::now(),
    };
    diesel::insert_into(files::table)
        .values(&record)
        .execute(&mut conn)?;

    info!("uploaded {} for client {}", record.storage_key, client_id);
    Ok(Json(record))
}

pub async fn list_files(
    State(state): State<Arc<AppState>>,
    _session: Session,
    Path(client_id): Path<Uuid>,
) -> Result<Json<Vec<FileRecord>>, ApiError> {
    let mut conn = state.conn.get().map_err(ApiError::db)?;
    let rows: Vec<FileRecord> = files::table
        .filter(files::client_id.eq(client_id))
        .order(files::uploaded_at.desc())
        .load(&mut conn)?;
    Ok(Json(rows))
}

/// Admin verification decision. The verification timestamp is written only
/// on the verified path.
pub async fn set_file_status(
    State(state): State<Arc<AppState>>,
    _session: Session,
    Path(id): Path<Uuid>,
    Json(req): Json<SetFileStatusRequest>,
) -> Result<Json<FileRecord>, ApiError> {
    let to = FileStatus::parse(&req.status)
        .ok_or_else(|| ApiError::Validation(format!("unknown file status: {}", req.status)))?;

    let mut conn = state.conn.get().map_err(ApiError::db)?;
    let record: FileRecord = files::table
        .find(id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound(format!("file {id} not found")))?;

    let from = FileStatus::parse(&record.status)
        .ok_or_else(|| ApiError::Database(format!("corrupt status on file {id}")))?;
    if !from.can_transition(to) {
        return Err(ApiError::Conflict(format!(
            "file is {} and cannot become {}",
            record.status, req.status
        )));
    }

    let verified_at = if to == FileStatus::Verified {
        Some(Utc::now())
    } else {
        None
    };

    diesel::update(files::table.find(id))
        .set((
            files::status.eq(to.as_str()),
            files::verified_at.eq(verified_at),
        ))
        .execute(&mut conn)?;

    Ok(Json(files::table.find(id).first(&mut conn)?))
}

/// Deletes the storage object first, then the metadata row. If storage
/// removal fails the row is kept and the error surfaces.
pub async fn delete_file_record(state: &AppState, id: Uuid) -> Result<(), ApiError> {
    let mut conn = state.conn.get().map_err(ApiError::db)?;
    let record: FileRecord = files::table
        .find(id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound(format!("file {id} not found")))?;

    let drive = state
        .drive
        .as_ref()
        .ok_or_else(|| ApiError::Storage("drive is not configured".to_string()))?;

    remove_from_drive(drive, &state.bucket_name, &record.storage_key)
        .await
        .map_err(|e| {
            error!("drive removal of {} failed: {}", record.storage_key, e);
            ApiError::Storage("failed to remove stored file".to_string())
        })?;

    diesel::delete(files::table.find(id)).execute(&mut conn)?;
    Ok(())
}

pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    _session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    delete_file_record(&state, id).await?;
    Ok(Json(serde_json::json!({ "deleted": id })))
}

pub fn configure_file_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/clients/:id/files", get(list_files).post(upload_file))
        .route("/api/files/:id/status", put(set_file_status))
        .route("/api/files/:id", delete(delete_file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_is_one_shot() {
        assert!(FileStatus::Pending.can_transition(FileStatus::Verified));
        assert!(FileStatus::Pending.can_transition(FileStatus::Rejected));
        for terminal in [FileStatus::Verified, FileStatus::Rejected] {
            for target in [FileStatus::Pending, FileStatus::Verified, FileStatus::Rejected] {
                assert!(!terminal.can_transition(target));
            }
        }
    }

    #[test]
    fn storage_keys_are_scoped_per_client() {
        let id = Uuid::nil();
        assert_eq!(
            storage_key_for(id, "contract.pdf"),
            format!("clients/{}/contract.pdf", id)
        );
    }

    #[test]
    fn status_strings_round_trip() {
        for status in [FileStatus::Pending, FileStatus::Verified, FileStatus::Rejected] {
            assert_eq!(FileStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(FileStatus::parse("archived"), None);
    }
}
