//! OfficeFlow CLI - sign PDFs and drive approval workflows
//!
//! # Usage
//!
//! ```bash
//! # Sign several PDFs through the request queue
//! officeflow sign memo.pdf contract.pdf --signer "Dana Reyes" --signature dana.png
//!
//! # Try it without a signing service
//! officeflow sign memo.pdf --signer "Dana Reyes" --mock
//!
//! # Approval workflow stored as JSON
//! officeflow workflow new memo.json --document memo-17 --title "Budget memo" \
//!     --signer manager --signer finance
//! officeflow workflow submit memo.json
//! officeflow workflow approve memo.json --by manager
//!
//! # Show version and effective configuration
//! officeflow info
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

mod commands;
mod settings;

use commands::{info, sign, workflow};
use settings::Settings;

/// OfficeFlow - document signing and approvals
#[derive(Parser)]
#[command(
    name = "officeflow",
    version,
    about = "OfficeFlow CLI - PDF signing and approval workflows",
    long_about = "OfficeFlow signs PDFs through an external signing service.\n\n\
                  Requests go through a bounded queue that retries transient\n\
                  failures with exponential backoff."
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, short = 'c', value_name = "FILE", global = true, env = "OFFICEFLOW_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign PDF files through the signing service
    #[command(name = "sign")]
    Sign(sign::SignArgs),

    /// Manage approval workflow files
    #[command(name = "workflow")]
    Workflow(workflow::WorkflowArgs),

    /// Show version and configuration
    #[command(name = "info")]
    Info(info::InfoArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    match cli.command {
        Commands::Sign(args) => {
            let settings = Settings::load(cli.config.as_deref())?;
            sign::run(args, settings).await
        }
        Commands::Workflow(args) => workflow::run(args),
        Commands::Info(args) => {
            let settings = Settings::load(cli.config.as_deref())?;
            info::run(args, &settings)
        }
    }
}

/// Setup logging based on verbosity level
fn setup_logging(verbosity: u8) {
    use tracing_subscriber::EnvFilter;

    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}

/// Print a success message with a checkmark
pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

/// Print an error message with an X
pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red().bold(), msg);
}

/// Print an info message
pub fn print_info(msg: &str) {
    println!("{} {}", "ℹ".blue().bold(), msg);
}
