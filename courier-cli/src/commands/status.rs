//! `courier status`: show the stored watermark.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use courier_core::config::{DEFAULT_LOOKBACK_HOURS, DEFAULT_STATE_FILE};
use courier_sync::watermark;

/// Arguments for `courier status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Watermark state file.
    #[arg(long, default_value = DEFAULT_STATE_FILE)]
    pub state_file: PathBuf,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let stored = watermark::read_at(&self.state_file)
            .with_context(|| format!("failed to read {}", self.state_file.display()))?;

        match stored {
            Some(last_check) => println!(
                "{} last check {} ({} ago)",
                "■".green().bold(),
                last_check.to_rfc3339(),
                watermark::format_age(last_check)
            ),
            None => println!(
                "{} never checked; next run looks back {DEFAULT_LOOKBACK_HOURS}h",
                "■".bright_black().bold()
            ),
        }
        Ok(())
    }
}
