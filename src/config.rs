use crate::errors::{AppError, AppResult};
use std::path::PathBuf;

pub const DEFAULT_SSOT_PATH: &str = "../../ssot";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Raw `SSOT_PATH`, resolved later against the working directory.
    pub ssot_path: String,
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub api_token: Option<String>,
    pub log_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ssot_path: DEFAULT_SSOT_PATH.to_string(),
            database_url: None,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            api_token: None,
            log_dir: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Self {
            ssot_path: non_empty("SSOT_PATH").unwrap_or_else(|| DEFAULT_SSOT_PATH.to_string()),
            database_url: non_empty("DATABASE_URL"),
            bind_addr: non_empty("LIFEOS_BIND").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            api_token: non_empty("LIFEOS_API_TOKEN"),
            log_dir: non_empty("LIFEOS_LOG_DIR").map(PathBuf::from),
        }
    }

    pub fn require_database_url(&self) -> AppResult<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| AppError::Config("DATABASE_URL is missing".to_string()))
    }
}
