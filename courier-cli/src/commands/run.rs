//! `courier run`: one relay pass.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use courier_core::{
    config::{DEFAULT_STATE_FILE, DEFAULT_WORKING_COPY},
    RelayConfig, RelayPaths,
};
use courier_sync::{
    pipeline::RunSummary, GitRepository, Relay, RelaySettings, RunOptions, RunOutcome,
    WebhookClient,
};

/// Arguments for `courier run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Local git checkout to pull and scan.
    #[arg(long, default_value = DEFAULT_WORKING_COPY)]
    pub repo: PathBuf,

    /// Watermark state file.
    #[arg(long, default_value = DEFAULT_STATE_FILE)]
    pub state_file: PathBuf,

    /// List what would be sent without sending or moving the watermark.
    #[arg(long)]
    pub dry_run: bool,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            repo: PathBuf::from(DEFAULT_WORKING_COPY),
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            dry_run: false,
        }
    }
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let paths = RelayPaths {
            working_copy: self.repo,
            state_file: self.state_file,
        };
        // Configuration problems are reported, not raised: exit status stays 0.
        let config = match RelayConfig::from_env(paths) {
            Ok(config) => config,
            Err(err) => {
                println!("{} {err}", "✗".red().bold());
                return Ok(());
            }
        };

        println!(
            "{} checking {} for new documents",
            "■".bright_black(),
            config.working_copy.display()
        );

        let repository = GitRepository::new(
            &config.working_copy,
            &config.remote,
            &config.branch,
            config.sync_timeout,
        );
        let transport = WebhookClient::new(
            &config.webhook_url,
            config.credential.clone(),
            config.delivery_timeout,
        );
        let relay = Relay::new(RelaySettings::from(&config), repository, transport);

        let outcome = relay
            .run(&RunOptions {
                dry_run: self.dry_run,
            })
            .context("relay run failed")?;
        print_outcome(&outcome);
        Ok(())
    }
}

fn print_outcome(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Busy { lock_path } => {
            println!(
                "{} another courier run holds {}; skipped",
                "■".yellow().bold(),
                lock_path.display()
            );
        }
        RunOutcome::SyncFailed { stderr } => {
            println!("{} git pull failed: {}", "✗".red().bold(), stderr.trim());
        }
        RunOutcome::Completed(summary) => print_summary(summary),
    }
}

fn print_summary(summary: &RunSummary) {
    if summary.up_to_date {
        println!("{} working copy already up to date", "■".bright_black());
    } else {
        println!("{} pulled latest changes", "✓".green());
    }
    println!(
        "{} last check: {}",
        "■".bright_black(),
        summary.previous_watermark.to_rfc3339()
    );

    if summary.new_watermark.is_none() {
        if summary.would_deliver.is_empty() {
            println!("[dry-run] no new documents");
        }
        for name in &summary.would_deliver {
            println!("[dry-run]  ~  {name}");
        }
        return;
    }

    if summary.delivered.is_empty() && summary.failed.is_empty() {
        println!("{} no new documents", "■".bright_black());
    }
    for name in &summary.delivered {
        println!("  {}  {name}", "✓".green());
    }
    for failed in &summary.failed {
        println!("  {}  {}: {}", "✗".red(), failed.filename, failed.error);
    }
    println!(
        "{} check complete ({} delivered, {} failed)",
        "✓".green().bold(),
        summary.delivered.len(),
        summary.failed.len()
    );
}
