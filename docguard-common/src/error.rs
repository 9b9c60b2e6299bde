//! Library errors for bootstrap configuration and warehouse storage
//!
//! HTTP-facing errors live in `docguard_api::error::ApiError`, which wraps
//! this type.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Root folder, uploads directory or database file could not be created
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bootstrap TOML unreadable or malformed
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON column could not be written or read back
    #[error("JSON column error: {0}")]
    Json(#[from] serde_json::Error),

    /// Stored row holds a value this build does not understand
    /// (unknown status, bad timestamp, bad id)
    #[error("Corrupt {column} value '{value}'")]
    Corrupt { column: &'static str, value: String },
}

impl Error {
    pub fn corrupt(column: &'static str, value: impl Into<String>) -> Self {
        Error::Corrupt {
            column,
            value: value.into(),
        }
    }
}
