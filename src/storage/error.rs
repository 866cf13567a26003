//! Storage error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while writing the mirrored tree
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Refusing to write outside the task root: {0}")]
    InvalidPath(String),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;
