//! Error types for bucket filesystem operations

use crate::store::StoreError;
use thiserror::Error;

/// Bucket filesystem result type
pub type Result<T> = std::result::Result<T, BucketFsError>;

/// Bucket filesystem errors
#[derive(Error, Debug)]
pub enum BucketFsError {
    /// Path is not a `scheme://bucket/key` locator
    #[error("Invalid locator: {0}")]
    InvalidLocator(String),

    /// Open mode is unrecognized or unsupported
    #[error("Invalid open mode: {0}")]
    InvalidMode(String),

    /// Object required by the operation does not exist
    #[error("Object does not exist: {0}")]
    ObjectNotFound(String),

    /// Exclusive create found an existing object
    #[error("Object already exists: {0}")]
    ObjectExists(String),

    /// Operation has no object storage equivalent
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Directory still has children (cannot remove)
    #[error("Directory not empty: {0}")]
    DirectoryNotEmpty(String),

    /// No adapter is registered for the scheme
    #[error("No adapter registered for scheme: {0}")]
    UnknownScheme(String),

    /// Storage collaborator failed
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// Configuration failed validation
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl From<validator::ValidationErrors> for BucketFsError {
    fn from(errors: validator::ValidationErrors) -> Self {
        BucketFsError::Config(errors.to_string())
    }
}
