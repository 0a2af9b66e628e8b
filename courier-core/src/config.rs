//! Relay configuration.
//!
//! Everything the orchestrator needs is resolved here once, at startup:
//! secrets come from the environment, paths from the caller (CLI flags or
//! their defaults). Nothing downstream reads the environment again.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::types::Credential;

pub const ENV_WEBHOOK_URL: &str = "WEBHOOK_URL";
pub const ENV_BOT_CREDENTIAL: &str = "BOT_CREDENTIAL";

pub const DEFAULT_WORKING_COPY: &str = "./daily-summaries";
pub const DEFAULT_STATE_FILE: &str = "last_check.json";
pub const DEFAULT_REMOTE: &str = "origin";
pub const DEFAULT_BRANCH: &str = "master";
pub const DOCUMENT_EXTENSION: &str = "md";

/// Lookback used when no watermark has been stored yet.
pub const DEFAULT_LOOKBACK_HOURS: i64 = 24;

pub const SYNC_TIMEOUT: Duration = Duration::from_secs(30);
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);
/// Delay between consecutive webhook deliveries.
pub const DELIVERY_PACE: Duration = Duration::from_secs(1);

/// Filesystem locations for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayPaths {
    pub working_copy: PathBuf,
    pub state_file: PathBuf,
}

impl Default for RelayPaths {
    fn default() -> Self {
        Self {
            working_copy: PathBuf::from(DEFAULT_WORKING_COPY),
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
        }
    }
}

/// Validated settings for one relay run.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub working_copy: PathBuf,
    pub state_file: PathBuf,
    pub webhook_url: String,
    pub credential: Credential,
    pub remote: String,
    pub branch: String,
    /// Extension (without the dot) of documents picked up by the scanner.
    pub extension: String,
    pub sync_timeout: Duration,
    pub delivery_timeout: Duration,
    pub pace: Duration,
}

impl RelayConfig {
    /// Build the config from the process environment.
    pub fn from_env(paths: RelayPaths) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok(), paths)
    }

    /// Build the config from an arbitrary key lookup.
    ///
    /// Checks run in a fixed order: credential, webhook URL, working copy.
    pub fn from_lookup<F>(lookup: F, paths: RelayPaths) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credential = Credential::new(required(&lookup, ENV_BOT_CREDENTIAL)?);

        let webhook_url = required(&lookup, ENV_WEBHOOK_URL)?;
        if !(webhook_url.starts_with("http://") || webhook_url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl {
                var: ENV_WEBHOOK_URL,
                value: webhook_url,
            });
        }

        if !paths.working_copy.is_dir() {
            return Err(ConfigError::WorkingCopyNotFound {
                path: paths.working_copy,
            });
        }

        Ok(Self {
            working_copy: paths.working_copy,
            state_file: paths.state_file,
            webhook_url,
            credential,
            remote: DEFAULT_REMOTE.to_string(),
            branch: DEFAULT_BRANCH.to_string(),
            extension: DOCUMENT_EXTENSION.to_string(),
            sync_timeout: SYNC_TIMEOUT,
            delivery_timeout: DELIVERY_TIMEOUT,
            pace: DELIVERY_PACE,
        })
    }
}

fn required<F>(lookup: &F, var: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ConfigError::MissingVar { var }),
    }
}
