//! Error types for the SQL gateway
//!
//! Each operation has its own error enum. None of them cross the tool
//! boundary: the server renders them to `Error: {message}` text.

use std::path::PathBuf;

/// Failure while running a statement against the database
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// Could not open a connection to the database
    #[error("failed to open database {path:?}: {source}")]
    Connect {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// The statement was rejected or failed while running
    #[error(transparent)]
    Database(#[from] rusqlite::Error),

    /// A bound parameter could not be converted to a SQL value
    #[error("invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// The blocking database task panicked or was cancelled
    #[error("database task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Failure while persisting an overflow artifact
#[derive(Debug, thiserror::Error)]
pub enum OverflowWriteError {
    #[error("failed to write overflow artifact to {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize result set: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failure while reading table metadata
#[derive(Debug, thiserror::Error)]
pub enum IntrospectionError {
    #[error("failed to open database {path:?}: {source}")]
    Connect {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error(transparent)]
    Database(#[from] rusqlite::Error),

    #[error("database task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
