use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub drive: DriveConfig,
    pub mail: MailConfig,
    pub insights: InsightsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DriveConfig {
    pub server: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
    pub invite_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InsightsConfig {
    pub index_url: String,
    pub folder_id: String,
    pub api_key: String,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();

        Ok(Self {
            server: ServerConfig {
                host: var_or("SERVER_HOST", "0.0.0.0"),
                port: var_or("SERVER_PORT", "8080").parse()?,
            },
            database: DatabaseConfig {
                url: var_or(
                    "DATABASE_URL",
                    "postgres://onboard:@localhost:5432/onboardserver",
                ),
                max_connections: var_or("DATABASE_MAX_CONNECTIONS", "10").parse()?,
            },
            drive: DriveConfig {
                server: var_or("DRIVE_SERVER", "http://localhost:9000"),
                access_key: var_or("DRIVE_ACCESS_KEY", "minioadmin"),
                secret_key: var_or("DRIVE_SECRET_KEY", "minioadmin"),
                bucket: var_or("DRIVE_BUCKET", "onboard"),
            },
            mail: MailConfig {
                smtp_server: var_or("SMTP_SERVER", "localhost"),
                smtp_port: var_or("SMTP_PORT", "587").parse()?,
                username: var_or("SMTP_USERNAME", ""),
                password: var_or("SMTP_PASSWORD", ""),
                from_address: var_or("MAIL_FROM", "Onboarding <noreply@localhost>"),
                invite_base_url: var_or("INVITE_BASE_URL", "http://localhost:8080/invite"),
            },
            insights: InsightsConfig {
                index_url: var_or("INSIGHTS_INDEX_URL", "http://localhost:9090"),
                folder_id: var_or("INSIGHTS_FOLDER_ID", ""),
                api_key: var_or("INSIGHTS_API_KEY", ""),
            },
        })
    }
}
