//! Common error types for the penguin classifier

use thiserror::Error;

/// Common result type for penguin classifier operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the penguin classifier crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Tabular file could not be read or written
    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// JSON document could not be read or written
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// No trained model artifact at the expected location
    #[error("No trained model found at {0} (run `penguin-web train` first)")]
    ModelMissing(String),

    /// Model artifact is present but unusable
    #[error("Model error: {0}")]
    Model(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
