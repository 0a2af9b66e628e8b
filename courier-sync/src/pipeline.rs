//! Relay pipeline: lock, load watermark, pull, scan, deliver, save watermark.
//!
//! A run ends in exactly one of three states:
//! - [`RunOutcome::Busy`]: another run holds the lock; nothing touched.
//! - [`RunOutcome::SyncFailed`]: `git pull` failed; no scan, watermark kept.
//! - [`RunOutcome::Completed`]: watermark advanced, whatever the individual
//!   deliveries did (unless `dry_run`).

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};

use courier_core::RelayConfig;

use crate::delivery::{DeliveryError, Transport};
use crate::error::RelayError;
use crate::repo::Repository;
use crate::scan;
use crate::watermark::{self, WatermarkLock};

/// The subset of [`RelayConfig`] the pipeline itself needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaySettings {
    pub working_copy: PathBuf,
    pub state_file: PathBuf,
    pub extension: String,
    /// Delay between consecutive deliveries.
    pub pace: Duration,
}

impl From<&RelayConfig> for RelaySettings {
    fn from(config: &RelayConfig) -> Self {
        Self {
            working_copy: config.working_copy.clone(),
            state_file: config.state_file.clone(),
            extension: config.extension.clone(),
            pace: config.pace,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Scan and report, but send nothing and keep the watermark.
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDelivery {
    pub filename: String,
    pub error: DeliveryError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub previous_watermark: DateTime<Utc>,
    /// `None` on a dry run.
    pub new_watermark: Option<DateTime<Utc>>,
    pub up_to_date: bool,
    pub delivered: Vec<String>,
    pub failed: Vec<FailedDelivery>,
    pub would_deliver: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(RunSummary),
    SyncFailed { stderr: String },
    Busy { lock_path: PathBuf },
}

/// Orchestrates one relay run.
#[derive(Debug)]
pub struct Relay<R, T> {
    settings: RelaySettings,
    repository: R,
    transport: T,
}

impl<R: Repository, T: Transport> Relay<R, T> {
    pub fn new(settings: RelaySettings, repository: R, transport: T) -> Self {
        Self {
            settings,
            repository,
            transport,
        }
    }

    pub fn run(&self, options: &RunOptions) -> Result<RunOutcome, RelayError> {
        let state_file = &self.settings.state_file;
        let Some(_lock) = WatermarkLock::try_acquire(state_file)? else {
            let lock_path = WatermarkLock::lock_path(state_file);
            tracing::warn!(lock = %lock_path.display(), "another relay run is in progress");
            return Ok(RunOutcome::Busy { lock_path });
        };

        let previous = watermark::load_at(state_file, Utc::now());
        tracing::info!(
            repo = %self.settings.working_copy.display(),
            last_check = %previous,
            "checking for new documents"
        );

        let pull = self.repository.pull();
        if !pull.success {
            tracing::error!(stderr = %pull.stderr.trim(), "git pull failed, aborting run");
            return Ok(RunOutcome::SyncFailed {
                stderr: pull.stderr,
            });
        }
        let up_to_date = pull.is_up_to_date();
        if up_to_date {
            tracing::info!("working copy already up to date");
        } else {
            tracing::info!("pulled latest changes");
        }

        let documents = scan::scan(
            &self.settings.working_copy,
            &self.settings.extension,
            previous,
        )?;
        if documents.is_empty() {
            tracing::info!("no new documents");
        } else {
            tracing::info!(count = documents.len(), "found new documents");
        }

        let mut summary = RunSummary {
            previous_watermark: previous,
            new_watermark: None,
            up_to_date,
            delivered: Vec::new(),
            failed: Vec::new(),
            would_deliver: Vec::new(),
        };

        if options.dry_run {
            summary.would_deliver = documents.into_iter().map(|d| d.filename).collect();
            tracing::info!("[dry-run] nothing sent, watermark unchanged");
            return Ok(RunOutcome::Completed(summary));
        }

        for (index, document) in documents.iter().enumerate() {
            if index > 0 && !self.settings.pace.is_zero() {
                thread::sleep(self.settings.pace);
            }
            tracing::info!(file = %document.filename, "sending");
            match self.transport.deliver(document) {
                Ok(()) => {
                    tracing::info!(file = %document.filename, "delivered");
                    summary.delivered.push(document.filename.clone());
                }
                Err(error) => {
                    tracing::warn!(file = %document.filename, error = %error, "delivery failed");
                    summary.failed.push(FailedDelivery {
                        filename: document.filename.clone(),
                        error,
                    });
                }
            }
        }

        // Never move the watermark backwards, even if the clock did.
        let now = Utc::now().max(previous);
        watermark::save_at(state_file, now)?;
        summary.new_watermark = Some(now);
        tracing::info!(last_check = %now, "check complete");

        Ok(RunOutcome::Completed(summary))
    }
}
