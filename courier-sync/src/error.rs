//! Error types for courier-sync.

use std::path::PathBuf;

use thiserror::Error;

/// Failures that end a run early. Per-document problems never surface here;
/// they are logged and the run moves on.
#[derive(Debug, Error)]
pub enum RelayError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error (watermark state file).
    #[error("watermark JSON error at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The stored `last_check` value is not a recognizable timestamp.
    #[error("invalid watermark timestamp '{value}' in {path}")]
    InvalidTimestamp { path: PathBuf, value: String },
}

/// Convenience constructor for [`RelayError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RelayError {
    RelayError::Io {
        path: path.into(),
        source,
    }
}

/// Convenience constructor for [`RelayError::Json`].
pub(crate) fn json_err(path: impl Into<PathBuf>, source: serde_json::Error) -> RelayError {
    RelayError::Json {
        path: path.into(),
        source,
    }
}
