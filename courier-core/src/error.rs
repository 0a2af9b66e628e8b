//! Error types for courier-core.

use std::path::PathBuf;

use thiserror::Error;

/// Startup configuration failures. Any of these ends the run before the
/// watermark is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is unset or blank.
    #[error("environment variable {var} is not set (e.g. export {var}='...')")]
    MissingVar { var: &'static str },

    /// The webhook URL does not look like an HTTP(S) endpoint.
    #[error("{var} must be an http(s) URL, got '{value}'")]
    InvalidUrl { var: &'static str, value: String },

    /// The working copy directory does not exist.
    #[error("working copy not found at {path}")]
    WorkingCopyNotFound { path: PathBuf },
}
