//! Change scanner.
//!
//! Flat, non-recursive listing of the working copy: a document qualifies
//! when it is a regular file with the document extension and its mtime is
//! strictly newer than the watermark. Results are sorted by filename.

use std::ffi::OsStr;
use std::path::Path;

use chrono::{DateTime, Utc};

use courier_core::Document;

use crate::error::{io_err, RelayError};

/// Collect documents in `directory` modified after `watermark`.
///
/// Only listing `directory` itself can fail. Per-file problems (metadata,
/// unreadable or non-UTF-8 content) are logged and the file is skipped.
pub fn scan(
    directory: &Path,
    extension: &str,
    watermark: DateTime<Utc>,
) -> Result<Vec<Document>, RelayError> {
    let entries = std::fs::read_dir(directory).map_err(|e| io_err(directory, e))?;

    let mut documents = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(dir = %directory.display(), error = %err, "skipping unreadable directory entry");
                continue;
            }
        };
        let path = entry.path();
        if path.extension() != Some(OsStr::new(extension)) {
            continue;
        }

        let metadata = match std::fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(err) => {
                tracing::warn!(file = %path.display(), error = %err, "failed to stat document");
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }
        let modified_at: DateTime<Utc> = match metadata.modified() {
            Ok(mtime) => mtime.into(),
            Err(err) => {
                tracing::warn!(file = %path.display(), error = %err, "no modification time for document");
                continue;
            }
        };
        if modified_at <= watermark {
            continue;
        }

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(file = %path.display(), error = %err, "failed to read document");
                continue;
            }
        };

        let filename = entry.file_name().to_string_lossy().into_owned();
        tracing::debug!(file = %filename, modified = %modified_at, "changed document");
        documents.push(Document {
            filename,
            path,
            content,
            modified_at,
        });
    }

    documents.sort_by(|a, b| a.filename.cmp(&b.filename));
    Ok(documents)
}
