//! Batch processing command for multiple receipt images.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use futures_util::StreamExt;
use futures_util::stream;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info, warn};

use hoadon_core::ProcessedReceipt;

use super::output::{CSV_HEADER, OutputFormat, csv_fields, format_result};
use super::process::process_image;
use super::{build_pipeline, is_image_file, load_config, resolve_model_dir};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern matching input images
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of images processed at once (default: pipeline.max_workers)
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,

    /// Model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    receipt: Option<ProcessedReceipt>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let mut files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| is_image_file(p))
        .collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    let jobs = args.jobs.unwrap_or(config.pipeline.max_workers).max(1);

    println!(
        "{} Found {} files to process ({} at a time)",
        style("ℹ").blue(),
        files.len(),
        jobs
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let model_dir = resolve_model_dir(args.model_dir.as_deref(), &config);
    let pipeline = Arc::new(build_pipeline(&model_dir, &config)?);

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")
            .unwrap()
            .progress_chars("=>-"),
    );

    let mut pending = stream::iter(files)
        .map(|path| {
            let pipeline = Arc::clone(&pipeline);
            async move {
                let file_start = Instant::now();
                let task_path = path.clone();
                let outcome =
                    tokio::task::spawn_blocking(move || process_image(&pipeline, &task_path, None))
                        .await
                        .map_err(anyhow::Error::from)
                        .and_then(|r| r);
                (path, outcome, file_start.elapsed().as_millis() as u64)
            }
        })
        .buffer_unordered(jobs);

    let mut results = Vec::new();
    while let Some((path, outcome, processing_time_ms)) = pending.next().await {
        overall_pb.inc(1);
        match outcome {
            Ok(receipt) => {
                debug!("{}: {}/4 fields", path.display(), receipt.fields.found_count());
                if let Some(output_dir) = &args.output_dir {
                    write_output(output_dir, &path, &receipt, args.format)?;
                }
                results.push(ProcessResult {
                    path,
                    receipt: Some(receipt),
                    error: None,
                    processing_time_ms,
                });
            }
            Err(e) => {
                let error_msg = e.to_string();
                if args.continue_on_error {
                    warn!("Failed to process {}: {}", path.display(), error_msg);
                    results.push(ProcessResult {
                        path,
                        receipt: None,
                        error: Some(error_msg),
                        processing_time_ms,
                    });
                } else {
                    overall_pb.abandon();
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    anyhow::bail!("Processing failed: {}", error_msg);
                }
            }
        }
    }

    overall_pb.finish_with_message("Complete");
    results.sort_by(|a, b| a.path.cmp(&b.path));

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

    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();
    let successful = results.len() - failed.len();
    info!("Batch finished in {:?}", start.elapsed());

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

/// Write one file's fields into `output_dir` as soon as it is done.
fn write_output(
    output_dir: &Path,
    input: &Path,
    receipt: &ProcessedReceipt,
    format: OutputFormat,
) -> anyhow::Result<PathBuf> {
    let output_path = output_dir.join(output_name(input, format));
    let content = format_result(&receipt.fields, None, format)?;
    fs::write(&output_path, content)?;
    debug!("Wrote output to {}", output_path.display());
    Ok(output_path)
}

/// `receipt.png` becomes `receipt.json` (or `.csv`, `.txt`).
fn output_name(path: &Path, format: OutputFormat) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("receipt");
    format!("{}.{}", stem, format.extension())
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    let mut header = vec!["filename", "status"];
    header.extend(CSV_HEADER);
    header.extend(["rejected_regions", "processing_time_ms", "error"]);
    wtr.write_record(&header)?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        let time = result.processing_time_ms.to_string();

        let mut record: Vec<String> = vec![filename.to_string()];
        match &result.receipt {
            Some(receipt) => {
                record.push("success".to_string());
                record.extend(csv_fields(&receipt.fields));
                record.push(receipt.rejected_regions.to_string());
                record.push(time);
                record.push(String::new());
            }
            None => {
                record.push("error".to_string());
                record.extend(std::iter::repeat_n(String::new(), CSV_HEADER.len() + 1));
                record.push(time);
                record.push(result.error.clone().unwrap_or_default());
            }
        }
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}
