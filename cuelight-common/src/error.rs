//! Common error types for cuelight

use thiserror::Error;

/// Common result type for cuelight operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the engine and its collaborators
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested show record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Show file could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Config file could not be parsed
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}
