//! Courier: relay new documents from a git working copy to a chat webhook.
//!
//! # Usage
//!
//! ```text
//! courier                                   # same as `courier run`
//! courier run [--repo <dir>] [--state-file <file>] [--dry-run]
//! courier status [--state-file <file>]
//! ```
//!
//! `BOT_CREDENTIAL` and `WEBHOOK_URL` come from the environment (or `.env`).

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{run::RunArgs, status::StatusArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "courier",
    version,
    about = "Relay newly modified documents from a git working copy to a chat webhook",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pull, scan for documents newer than the watermark and deliver them.
    Run(RunArgs),

    /// Show the stored watermark.
    Status(StatusArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        None => RunArgs::default().run(),
        Some(Commands::Run(args)) => args.run(),
        Some(Commands::Status(args)) => args.run(),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
