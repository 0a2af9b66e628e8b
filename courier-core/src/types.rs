//! Domain types shared by the scanner, the delivery client and the CLI.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

/// Bot key sent with every webhook payload.
///
/// `Debug` and `Display` are redacted so the secret never ends up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// The raw secret, for building request payloads only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// A changed document picked up by a scan. Lives for a single run only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// File name relative to the working copy; unique within a scan.
    pub filename: String,
    pub path: PathBuf,
    pub content: String,
    pub modified_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_is_redacted_in_debug_and_display() {
        let credential = Credential::new("s3cr3t-bot-key");
        assert_eq!(format!("{credential:?}"), "Credential(***)");
        assert_eq!(credential.to_string(), "***");
        assert_eq!(credential.expose(), "s3cr3t-bot-key");
    }
}
