//! Info command - Show version and effective configuration
//!
//! Usage:
//! ```bash
//! officeflow info
//! officeflow info --json
//! ```

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::settings::Settings;

/// Arguments for the info command
#[derive(Args)]
pub struct InfoArgs {
    /// Print the effective configuration as JSON
    #[arg(long)]
    json: bool,
}

/// Run the info command
pub fn run(args: InfoArgs, settings: &Settings) -> Result<()> {
    if args.json {
        let mut redacted = settings.clone();
        if redacted.signing.api_token.is_some() {
            redacted.signing.api_token = Some("***".to_string());
        }
        println!("{}", serde_json::to_string_pretty(&redacted)?);
        return Ok(());
    }

    let version = env!("CARGO_PKG_VERSION");
    let queue = &settings.queue;
    let signing = &settings.signing;

    println!("{}", "OfficeFlow".bold().cyan());
    println!("{}", "═".repeat(50).cyan());
    println!();

    println!("{}", "Version Information:".bold());
    println!("  {} {}", "CLI Version:".dimmed(), version.green());
    println!();

    println!("{}", "Request Queue:".bold());
    println!("  {} {}", "Concurrency:".dimmed(), queue.concurrency);
    println!("  {} {}", "Max retries:".dimmed(), queue.max_retries);
    println!(
        "  {} {:?} doubling, capped at {:?}",
        "Backoff:".dimmed(),
        queue.initial_delay,
        queue.max_delay
    );
    println!("  {} {}", "History kept:".dimmed(), queue.recent_capacity);
    println!();

    println!("{}", "Signing Service:".bold());
    println!("  {} {}", "URL:".dimmed(), signing.base_url.green());
    println!(
        "  {} {}",
        "Token:".dimmed(),
        if signing.api_token.is_some() {
            "configured".green()
        } else {
            "not set".yellow()
        }
    );
    println!("  {} {:?}", "Timeout:".dimmed(), signing.timeout);
    println!();

    println!("{}", "Configuration:".bold());
    println!(
        "  {} officeflow.toml, --config FILE, OFFICEFLOW_QUEUE_* and OFFICEFLOW_SIGNING_* variables",
        "ℹ".blue()
    );
    println!();

    Ok(())
}
