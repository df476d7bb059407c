use serde::Deserialize;

use super::{LogFormat, StorageBackend};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Development,
    Staging,
    Production,
}

impl Profile {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "staging" | "stage" => Some(Self::Staging),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProfileDefaults {
    pub host: String,
    pub server_port: u16,
    pub database_url: Option<String>,
    pub storage_backend: StorageBackend,
    pub debug: bool,
    pub fail_fast_db: bool,
    pub log_format: LogFormat,
    pub request_timeout_secs: u64,
    pub cors_allowed_origins: Option<String>,
}

impl ProfileDefaults {
    pub fn for_profile(profile: Profile) -> Self {
        match profile {
            Profile::Development => Self {
                host: "0.0.0.0".to_string(),
                server_port: 8080,
                database_url: None,
                storage_backend: StorageBackend::Memory,
                debug: false,
                fail_fast_db: true,
                log_format: LogFormat::Text,
                request_timeout_secs: 10,
                cors_allowed_origins: None,
            },
            Profile::Staging => Self {
                host: "0.0.0.0".to_string(),
                server_port: 8080,
                database_url: None,
                storage_backend: StorageBackend::Postgres,
                debug: false,
                fail_fast_db: true,
                log_format: LogFormat::Json,
                request_timeout_secs: 10,
                cors_allowed_origins: Some("https://staging.example.com".to_string()),
            },
            Profile::Production => Self {
                host: "0.0.0.0".to_string(),
                server_port: 8080,
                database_url: None,
                storage_backend: StorageBackend::Postgres,
                debug: false,
                fail_fast_db: true,
                log_format: LogFormat::Json,
                request_timeout_secs: 10,
                cors_allowed_origins: None,
            },
        }
    }
}
