//! Sign command - Sign PDFs through the request queue
//!
//! Usage:
//! ```bash
//! officeflow sign memo.pdf contract.pdf --signer "Dana Reyes"
//! officeflow sign *.pdf --signer "Dana Reyes" --signature dana.png --page 2 --out-dir signed/
//! officeflow sign memo.pdf --signer "Dana Reyes" --mock
//! ```

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use futures::future::join_all;
use officeflow_queue::{QueueStatus, RequestQueue};
use officeflow_signing::{
    HttpSignatureService, MockSignatureService, Placement, QueuedSigner, SignRequest,
    SignatureService, SignedDocument, SigningError,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::settings::Settings;

/// How often progress is printed while signing
const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Arguments for the sign command
#[derive(Args)]
pub struct SignArgs {
    /// PDF files to sign
    #[arg(required = true, value_name = "PDF")]
    files: Vec<PathBuf>,

    /// Name of the person signing
    #[arg(long, short = 's')]
    signer: String,

    /// PNG image of the handwritten signature
    #[arg(long, value_name = "PNG")]
    signature: Option<PathBuf>,

    /// Page to place the signature on (1-based)
    #[arg(long, default_value_t = 1)]
    page: u32,

    /// Signature box position and size, in PDF points
    #[arg(long, default_value_t = 72.0)]
    x: f32,
    #[arg(long, default_value_t = 72.0)]
    y: f32,
    #[arg(long, default_value_t = 180.0)]
    width: f32,
    #[arg(long, default_value_t = 60.0)]
    height: f32,

    /// Reason recorded with the signature
    #[arg(long)]
    reason: Option<String>,

    /// Directory for signed files (default: next to each input)
    #[arg(long, short = 'o', value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Override the queue's concurrency limit
    #[arg(long)]
    concurrency: Option<usize>,

    /// Override the number of retries per document
    #[arg(long)]
    retries: Option<u32>,

    /// Use the built-in mock signer instead of the signing service
    #[arg(long)]
    mock: bool,
}

/// Run the sign command
pub async fn run(args: SignArgs, mut settings: Settings) -> Result<()> {
    if let Some(concurrency) = args.concurrency {
        settings.queue.concurrency = concurrency;
    }
    if let Some(retries) = args.retries {
        settings.queue.max_retries = retries;
    }
    let queue = RequestQueue::new(settings.queue.clone())?;

    let requests = build_requests(&args)?;

    println!("{}", "OfficeFlow Signing".bold().cyan());
    println!("{}", "═".repeat(40).cyan());
    println!(
        "  {} {}   {} {}",
        "Documents:".dimmed(),
        requests.len(),
        "Concurrency:".dimmed(),
        queue.concurrency()
    );
    println!();

    if args.mock {
        let signer = QueuedSigner::new(MockSignatureService::new(), queue);
        sign_all(signer, requests, &args).await
    } else {
        let service = HttpSignatureService::new(settings.signing.clone())?;
        if !service.is_available().await {
            crate::print_error(&format!(
                "Signing service at {} did not answer its health check",
                service.config().base_url
            ));
        }
        sign_all(QueuedSigner::new(service, queue), requests, &args).await
    }
}

fn build_requests(args: &SignArgs) -> Result<Vec<(PathBuf, SignRequest)>> {
    let signature = match &args.signature {
        Some(path) => Some(
            std::fs::read(path)
                .with_context(|| format!("Failed to read signature image: {}", path.display()))?,
        ),
        None => None,
    };
    let placement = Placement {
        page: args.page,
        x: args.x,
        y: args.y,
        width: args.width,
        height: args.height,
    };

    let mut requests = Vec::with_capacity(args.files.len());
    let mut seen = HashMap::new();
    for path in &args.files {
        let document_id = document_id(path)?;
        if let Some(earlier) = seen.insert(document_id.clone(), path) {
            bail!(
                "{} and {} would both be written as {document_id}.signed.pdf",
                earlier.display(),
                path.display()
            );
        }
        let pdf = std::fs::read(path)
            .with_context(|| format!("Failed to read PDF: {}", path.display()))?;

        let mut request = SignRequest::new(document_id, pdf, args.signer.clone())
            .with_placement(placement);
        if let Some(png) = &signature {
            request = request.with_signature_image(png.clone());
        }
        if let Some(reason) = &args.reason {
            request = request.with_reason(reason.clone());
        }
        requests.push((path.clone(), request));
    }
    Ok(requests)
}

async fn sign_all<S: SignatureService + 'static>(
    signer: QueuedSigner<S>,
    requests: Vec<(PathBuf, SignRequest)>,
    args: &SignArgs,
) -> Result<()> {
    let jobs = join_all(requests.iter().map(|(_, request)| signer.sign(request)));
    tokio::pin!(jobs);

    let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);
    ticker.tick().await;
    let results = loop {
        tokio::select! {
            results = &mut jobs => break results,
            _ = ticker.tick() => print_progress(&signer.status()),
        }
    };

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Document", "Result", "Output"]);

    let mut failures = 0;
    for ((path, request), result) in requests.iter().zip(results) {
        match result.map_err(anyhow::Error::from).and_then(|signed| {
            write_signed(path, args.out_dir.as_deref(), &signed)
        }) {
            Ok(output) => {
                table.add_row(vec![
                    Cell::new(&request.document_id),
                    Cell::new("signed").fg(Color::Green),
                    Cell::new(output.display()),
                ]);
            }
            Err(err) => {
                failures += 1;
                table.add_row(vec![
                    Cell::new(&request.document_id),
                    Cell::new("failed").fg(Color::Red),
                    Cell::new(describe(&err)),
                ]);
            }
        }
    }

    println!("{table}");
    let status = signer.status();
    println!(
        "  {} {}   {} {}",
        "Completed:".dimmed(),
        status.completed.to_string().green(),
        "Failed:".dimmed(),
        status.failed.to_string().red()
    );
    println!();

    if failures > 0 {
        bail!("{failures} of {} documents could not be signed", requests.len());
    }
    crate::print_success(&format!("Signed {} documents", requests.len()));
    Ok(())
}

fn print_progress(status: &QueueStatus) {
    let retrying = status
        .pending_items
        .iter()
        .filter(|item| item.is_backing_off())
        .count();
    crate::print_info(&format!(
        "{} active / {} waiting ({} retrying) / {} done / {} failed",
        status.active,
        status.pending,
        retrying,
        status.completed,
        status.failed
    ));
}

fn describe(err: &anyhow::Error) -> String {
    match err.downcast_ref::<SigningError>() {
        Some(signing) if signing.is_transient() => format!("{signing} (gave up after retries)"),
        Some(signing) => signing.to_string(),
        None => format!("{err:#}"),
    }
}

/// Document id for a file: its name without the extension
fn document_id(path: &Path) -> Result<String> {
    match path.file_stem().and_then(|s| s.to_str()) {
        Some(stem) if !stem.is_empty() => Ok(stem.to_string()),
        _ => bail!("Cannot derive a document id from {}", path.display()),
    }
}

/// Where the signed copy of `input` goes
fn output_path(input: &Path, out_dir: Option<&Path>, document_id: &str) -> PathBuf {
    let file_name = format!("{document_id}.signed.pdf");
    match out_dir {
        Some(dir) => dir.join(file_name),
        None => input.with_file_name(file_name),
    }
}

fn write_signed(input: &Path, out_dir: Option<&Path>, signed: &SignedDocument) -> Result<PathBuf> {
    if let Some(dir) = out_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let output = output_path(input, out_dir, &signed.document_id);
    std::fs::write(&output, &signed.pdf)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_from_file_name() {
        assert_eq!(document_id(Path::new("/tmp/memo-17.pdf")).unwrap(), "memo-17");
        assert!(document_id(Path::new("/")).is_err());
    }

    #[test]
    fn test_output_path() {
        let input = Path::new("/docs/memo.pdf");
        assert_eq!(
            output_path(input, None, "memo"),
            PathBuf::from("/docs/memo.signed.pdf")
        );
        assert_eq!(
            output_path(input, Some(Path::new("/out")), "memo"),
            PathBuf::from("/out/memo.signed.pdf")
        );
    }

    fn mock_args(files: Vec<PathBuf>, out_dir: Option<PathBuf>) -> SignArgs {
        SignArgs {
            files,
            signer: "Kim".to_string(),
            signature: None,
            page: 1,
            x: 72.0,
            y: 72.0,
            width: 180.0,
            height: 60.0,
            reason: None,
            out_dir,
            concurrency: Some(1),
            retries: Some(0),
            mock: true,
        }
    }

    #[tokio::test]
    async fn test_mock_batch_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("leave.pdf");
        std::fs::write(&input, b"%PDF-1.7\n%%EOF").unwrap();

        run(mock_args(vec![input], None), Settings::default())
            .await
            .unwrap();

        let signed = std::fs::read(dir.path().join("leave.signed.pdf")).unwrap();
        assert!(signed.starts_with(b"%PDF-1.7"));
        assert!(String::from_utf8_lossy(&signed).contains("OfficeFlow-Signature"));
    }

    #[tokio::test]
    async fn test_same_file_name_in_two_folders_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let mut inputs = Vec::new();
        for folder in ["a", "b"] {
            let folder = dir.path().join(folder);
            std::fs::create_dir(&folder).unwrap();
            let input = folder.join("memo.pdf");
            std::fs::write(&input, b"%PDF-1.7\n%%EOF").unwrap();
            inputs.push(input);
        }
        let out = dir.path().join("out");

        let err = run(mock_args(inputs, Some(out.clone())), Settings::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("memo.signed.pdf"));
        assert!(!out.exists());
    }
}
