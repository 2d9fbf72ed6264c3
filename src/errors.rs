use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("CONFIG_INVALID: {0}")]
    Config(String),
    #[error("IO_FAILURE: {0}")]
    Io(String),
    #[error("FIXTURE_INVALID: {0}")]
    Fixture(#[from] FixtureError),
    #[error("NOT_FOUND: {0}")]
    NotFound(String),
    #[error("BAD_REQUEST: {0}")]
    BadRequest(String),
    #[error("UNAUTHORIZED: {0}")]
    Unauthorized(String),
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Diagnostics raised while reading source-of-truth fixtures. The Display text
/// is what the validator prints after `[<tag>] ERROR:`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FixtureError {
    #[error("SSOT_PATH not found: {}", .0.display())]
    RootMissing(PathBuf),
    #[error("SSOT_PATH is not a directory: {}", .0.display())]
    RootNotDirectory(PathBuf),
    #[error("Missing file: {}", .0.display())]
    MissingFile(PathBuf),
    #[error("Missing {description} json in {}", .dir.display())]
    NoCandidate { description: String, dir: PathBuf },
    #[error("Unable to read {}: {message}", .path.display())]
    Unreadable { path: PathBuf, message: String },
    #[error("Invalid JSON: {}\n{message}", .path.display())]
    InvalidJson { path: PathBuf, message: String },
    #[error("{name} must be an array")]
    NotArray { name: String },
    #[error("{context} must be an object")]
    NotObject { context: String },
    #[error("Missing key \"{key}\" in {context}")]
    MissingKey { key: String, context: String },
    #[error("{name}: \"{key}\" is empty")]
    EmptyKey { name: String, key: String },
    #[error("{name}: duplicate {key}=\"{value}\"")]
    DuplicateKey {
        name: String,
        key: String,
        value: String,
    },
    #[error("{name}: duplicate ({keys}) = {value}")]
    DuplicateCompositeKey {
        name: String,
        keys: String,
        value: String,
    },
    #[error("{from}: {field} \"{value}\" not found in {to}")]
    DanglingReference {
        from: String,
        field: String,
        value: String,
        to: String,
    },
    #[error("invalid record {context}: {message}")]
    InvalidRecord { context: String, message: String },
    #[error("missing {key}: {record}")]
    MissingNaturalKey { key: String, record: String },
    #[error("invalid rules: {0}")]
    Rules(String),
}
