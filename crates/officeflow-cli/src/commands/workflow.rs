//! Workflow command - Drive a document approval workflow stored as JSON
//!
//! Usage:
//! ```bash
//! officeflow workflow new memo.json --document memo-17 --title "Budget memo" \
//!     --signer manager --signer finance
//! officeflow workflow submit memo.json
//! officeflow workflow approve memo.json --by manager --comment "fine by me"
//! officeflow workflow reject memo.json --by finance --reason "over budget"
//! officeflow workflow revise memo.json
//! officeflow workflow show memo.json
//! ```

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use officeflow_workflow::{Decision, Workflow, WorkflowStatus};
use std::path::{Path, PathBuf};

/// Arguments for the workflow command
#[derive(Args)]
pub struct WorkflowArgs {
    #[command(subcommand)]
    action: WorkflowAction,
}

#[derive(Subcommand)]
enum WorkflowAction {
    /// Create a draft workflow file
    New {
        file: PathBuf,
        /// Document identifier
        #[arg(long)]
        document: String,
        /// Document title
        #[arg(long)]
        title: String,
        /// Signers in approval order (repeat the flag)
        #[arg(long = "signer", required = true)]
        signers: Vec<String>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Show workflow state and history
    Show { file: PathBuf },
    /// Send a draft out for approval
    Submit { file: PathBuf },
    /// Approve as the current signer
    Approve {
        file: PathBuf,
        #[arg(long)]
        by: String,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Reject as the current signer
    Reject {
        file: PathBuf,
        #[arg(long)]
        by: String,
        #[arg(long)]
        reason: String,
    },
    /// Return a rejected workflow to draft
    Revise { file: PathBuf },
}

/// Run the workflow command
pub fn run(args: WorkflowArgs) -> Result<()> {
    match args.action {
        WorkflowAction::New {
            file,
            document,
            title,
            signers,
            force,
        } => {
            if file.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", file.display());
            }
            let workflow = Workflow::new(document, title, signers)?;
            save(&file, &workflow)?;
            crate::print_success(&format!("Created draft workflow {}", file.display()));
            show(&workflow);
        }
        WorkflowAction::Show { file } => show(&load(&file)?),
        WorkflowAction::Submit { file } => {
            update(&file, |wf| wf.submit())?;
        }
        WorkflowAction::Approve { file, by, comment } => {
            update(&file, |wf| wf.approve(&by, comment.clone()))?;
        }
        WorkflowAction::Reject { file, by, reason } => {
            update(&file, |wf| wf.reject(&by, &reason))?;
        }
        WorkflowAction::Revise { file } => {
            update(&file, |wf| wf.revise())?;
        }
    }
    Ok(())
}

fn load(path: &Path) -> Result<Workflow> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read workflow file: {}", path.display()))?;
    Workflow::from_json(&json).with_context(|| format!("Invalid workflow file: {}", path.display()))
}

fn save(path: &Path, workflow: &Workflow) -> Result<()> {
    std::fs::write(path, workflow.to_json()?)
        .with_context(|| format!("Failed to write workflow file: {}", path.display()))
}

/// Load, apply one transition, save
fn update<F>(path: &Path, transition: F) -> Result<Workflow>
where
    F: FnOnce(&mut Workflow) -> Result<WorkflowStatus, officeflow_workflow::WorkflowError>,
{
    let mut workflow = load(path)?;
    let status = transition(&mut workflow)?;
    save(path, &workflow)?;

    crate::print_success(&format!("{} is now {}", workflow.title, status));
    if let Some(next) = workflow.current_signer() {
        crate::print_info(&format!("Waiting on {next}"));
    }
    Ok(workflow)
}

fn show(workflow: &Workflow) {
    let (approved, total) = workflow.progress();
    println!();
    println!("{}", workflow.title.bold().cyan());
    println!("{}", "═".repeat(40).cyan());
    println!("  {} {}", "Document:".dimmed(), workflow.document_id);
    println!("  {} {}", "Status:".dimmed(), status_label(workflow.status()));
    println!("  {} {approved}/{total} approved", "Progress:".dimmed());
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["#", "Signer", "Decision", "Comment"]);
    let current = workflow.current_signer();
    for (index, step) in workflow.steps().iter().enumerate() {
        let decision = match step.decision {
            Some(Decision::Approved) => Cell::new("approved").fg(Color::Green),
            Some(Decision::Rejected) => Cell::new("rejected").fg(Color::Red),
            None if current == Some(step.signer.as_str()) => {
                Cell::new("waiting").fg(Color::Yellow)
            }
            None => Cell::new("-"),
        };
        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(&step.signer),
            decision,
            Cell::new(step.comment.as_deref().unwrap_or("")),
        ]);
    }
    println!("{table}");

    println!("{}", "History:".bold());
    for event in workflow.history() {
        let actor = event.actor.as_deref().unwrap_or("-");
        let note = event
            .note
            .as_deref()
            .map(|n| format!(" ({n})"))
            .unwrap_or_default();
        println!(
            "  {} {:?} by {}{}",
            event.at.format("%Y-%m-%d %H:%M").to_string().dimmed(),
            event.action,
            actor,
            note
        );
    }
    println!();
}

fn status_label(status: WorkflowStatus) -> colored::ColoredString {
    let label = status.to_string();
    match status {
        WorkflowStatus::Draft => label.normal(),
        WorkflowStatus::InReview => label.yellow(),
        WorkflowStatus::Completed => label.green(),
        WorkflowStatus::Rejected => label.red(),
    }
}
