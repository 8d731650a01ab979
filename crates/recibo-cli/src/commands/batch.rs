//! Batch processing command for multiple receipt files.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDateTime;
use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

use recibo_core::models::config::ReciboConfig;
use recibo_core::ReceiptSource;

use super::process::{extract_report, format_report, parse_now, OutputFormat, ReceiptReport};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern matching receipt files
    #[arg(required = true)]
    input: String,

    /// Output directory for per-file results
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,

    /// Include draft transactions in the per-file results
    #[arg(long)]
    draft: bool,

    /// Reference time for date checks and the fallback date
    #[arg(long, value_parser = parse_now)]
    now: Option<NaiveDateTime>,
}

/// Result of processing a single file.
struct FileOutcome {
    path: PathBuf,
    report: Result<ReceiptReport, String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = Arc::new(super::config::load(config_path)?);

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file() && ReceiptSource::is_supported(p))
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(output_dir) = &args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    // OCR and extraction are blocking; the semaphore caps concurrent workers.
    let semaphore = Arc::new(Semaphore::new(args.jobs.max(1)));
    let mut handles = Vec::with_capacity(files.len());

    for path in files {
        let permit = Arc::clone(&semaphore).acquire_owned().await?;
        let config = Arc::clone(&config);
        let pb = overall_pb.clone();
        let (now, draft) = (args.now, args.draft);

        handles.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let outcome = process_single_file(path, &config, now, draft);
            pb.inc(1);
            outcome
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        let outcome = handle.await?;

        if let Err(message) = &outcome.report {
            if args.continue_on_error {
                warn!("Failed to process {}: {}", outcome.path.display(), message);
            } else {
                overall_pb.abandon();
                error!("Failed to process {}: {}", outcome.path.display(), message);
                anyhow::bail!("Processing failed for {}: {}", outcome.path.display(), message);
            }
        }

        results.push(outcome);
    }

    overall_pb.finish_with_message("Complete");

    if let Some(output_dir) = &args.output_dir {
        write_outputs(output_dir, &results, args.format, &config)?;
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let failed: Vec<_> = results.iter().filter(|r| r.report.is_err()).collect();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(results.len() - failed.len()).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            if let Err(message) = &result.report {
                println!("  - {}: {}", result.path.display(), message);
            }
        }
    }

    Ok(())
}

fn process_single_file(
    path: PathBuf,
    config: &ReciboConfig,
    now: Option<NaiveDateTime>,
    draft: bool,
) -> FileOutcome {
    let start = Instant::now();
    let report = extract_report(&path, config, now, draft).map_err(|e| format!("{:#}", e));

    FileOutcome {
        path,
        report,
        processing_time_ms: start.elapsed().as_millis() as u64,
    }
}

fn write_outputs(
    output_dir: &Path,
    results: &[FileOutcome],
    format: OutputFormat,
    config: &ReciboConfig,
) -> anyhow::Result<()> {
    for result in results {
        let Ok(report) = &result.report else {
            continue;
        };

        let output_name = result
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("receipt");
        let output_path = output_dir.join(format!("{}.{}", output_name, format.extension()));

        fs::write(&output_path, format_report(report, format, &config.policy)?)?;
        debug!("Wrote output to {}", output_path.display());
    }

    Ok(())
}

fn write_summary(path: &Path, results: &[FileOutcome]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "amount",
        "amount_pattern",
        "date",
        "date_detected",
        "merchant",
        "confidence",
        "processing_time_ms",
        "error",
    ])?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_string();
        let elapsed = result.processing_time_ms.to_string();

        let record = match &result.report {
            Ok(report) => {
                let receipt = &report.receipt;
                [
                    filename,
                    "success".to_string(),
                    receipt.amount.map(|a| a.to_string()).unwrap_or_default(),
                    receipt.amount_pattern.map(|p| p.to_string()).unwrap_or_default(),
                    receipt.date_iso(),
                    receipt.date_detected.to_string(),
                    receipt.merchant.clone().unwrap_or_default(),
                    format!("{:.2}", receipt.confidence),
                    elapsed,
                    String::new(),
                ]
            }
            Err(message) => [
                filename,
                "error".to_string(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                elapsed,
                message.clone(),
            ],
        };

        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}
