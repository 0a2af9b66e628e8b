//! Watermark store: the single timestamp that separates documents already
//! relayed from new ones.
//!
//! Persists `{ "last_check": "<RFC 3339>" }` at the configured state path.
//! Writes use an atomic `.tmp` + rename. A sibling `.lock` file guards a
//! whole run so two relays never interleave load and save.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use courier_core::config::DEFAULT_LOOKBACK_HOURS;

use crate::error::{io_err, json_err, RelayError};

/// On-disk watermark payload.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WatermarkFile {
    pub last_check: DateTime<Utc>,
}

// Read side stays stringly so older state files with naive timestamps load.
#[derive(Debug, Deserialize)]
struct RawWatermarkFile {
    last_check: Option<String>,
}

/// Watermark used when nothing usable is stored: one lookback window ago.
pub fn default_watermark(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::hours(DEFAULT_LOOKBACK_HOURS)
}

/// Read the stored watermark.
///
/// Returns `Ok(None)` if the file does not exist or carries no
/// `last_check` key. Malformed content is an error.
pub fn read_at(path: &Path) -> Result<Option<DateTime<Utc>>, RelayError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let raw: RawWatermarkFile = serde_json::from_str(&contents).map_err(|e| json_err(path, e))?;
    let Some(value) = raw.last_check else {
        return Ok(None);
    };
    match parse_timestamp(&value) {
        Some(ts) => Ok(Some(ts)),
        None => Err(RelayError::InvalidTimestamp {
            path: path.to_path_buf(),
            value,
        }),
    }
}

/// Load the watermark for a run. Never fails: anything unusable falls back
/// to [`default_watermark`].
pub fn load_at(path: &Path, now: DateTime<Utc>) -> DateTime<Utc> {
    match read_at(path) {
        Ok(Some(ts)) => ts,
        Ok(None) => default_watermark(now),
        Err(err) => {
            tracing::warn!(error = %err, "ignoring unreadable watermark, using default lookback");
            default_watermark(now)
        }
    }
}

/// Save `at` as the new watermark atomically.
///
/// Writes to `<path>.tmp` then renames to `<path>`.
pub fn save_at(path: &Path, at: DateTime<Utc>) -> Result<(), RelayError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }

    let payload = WatermarkFile { last_check: at };
    let json = serde_json::to_string_pretty(&payload).map_err(|e| json_err(path, e))?;
    let tmp = PathBuf::from(format!("{}.tmp", path.display()));
    std::fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    // Naive ISO-8601 (no offset) is taken as local wall-clock time.
    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|ts| ts.with_timezone(&Utc))
}

// ---------------------------------------------------------------------------
// Run lock
// ---------------------------------------------------------------------------

/// Exclusive advisory lock held for the duration of a run.
///
/// Released when dropped. The lock file itself is left in place.
#[derive(Debug)]
pub struct WatermarkLock {
    file: File,
    path: PathBuf,
}

impl WatermarkLock {
    /// `<state_file>.lock`
    pub fn lock_path(state_file: &Path) -> PathBuf {
        PathBuf::from(format!("{}.lock", state_file.display()))
    }

    /// Try to take the lock without blocking.
    ///
    /// Returns `Ok(None)` if another process already holds it.
    pub fn try_acquire(state_file: &Path) -> Result<Option<Self>, RelayError> {
        let path = Self::lock_path(state_file);
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| io_err(&path, e))?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { file, path })),
            Err(err) if err.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(err) => Err(io_err(&path, err)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WatermarkLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

/// Compact age of a timestamp relative to now: `45s`, `3m`, `2h`, `1d`.
pub fn format_age(timestamp: DateTime<Utc>) -> String {
    let seconds = Utc::now()
        .signed_duration_since(timestamp)
        .num_seconds()
        .max(0) as u64;
    format_seconds(seconds)
}

fn format_seconds(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{seconds}s");
    }
    if seconds < 60 * 60 {
        return format!("{}m", seconds / 60);
    }
    if seconds < 60 * 60 * 24 {
        return format!("{}h", seconds / (60 * 60));
    }
    format!("{}d", seconds / (60 * 60 * 24))
}
