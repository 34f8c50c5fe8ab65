//! Process command - extract fields from a single receipt image.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use hoadon_core::ProcessedReceipt;

use super::output::{OutputFormat, format_result};
use super::{OrtPipeline, build_pipeline, describe_error, is_image_file, load_config, resolve_model_dir};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input receipt image
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Include the grouped lines with their boxes
    #[arg(long)]
    lines: bool,

    /// Write the preprocessed image and full result into this directory
    #[arg(long)]
    save_artifacts: Option<PathBuf>,
}

pub async fn run(args: ProcessArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }
    if !is_image_file(&args.input) {
        warn!(
            "{} has no known image extension, trying to decode anyway",
            args.input.display()
        );
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {msg}")
            .unwrap()
            .progress_chars("##-"),
    );

    pb.set_message("Loading OCR models...");
    pb.set_position(10);
    let pipeline = build_pipeline(&resolve_model_dir(args.model_dir.as_deref(), &config), &config)?;

    pb.set_message("Running OCR...");
    pb.set_position(40);
    let receipt = process_image(&pipeline, &args.input, args.save_artifacts.as_deref())?;

    pb.finish_and_clear();

    for warning in &receipt.quality.warnings {
        eprintln!("{} {}", style("⚠").yellow(), warning);
    }
    if receipt.rejected_regions > 0 {
        eprintln!(
            "{} {} text regions rejected (invalid box geometry)",
            style("⚠").yellow(),
            receipt.rejected_regions
        );
    }

    let lines = args.lines.then_some(receipt.lines.as_slice());
    let output = format_result(&receipt.fields, lines, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// Decode and process one image, optionally saving artifacts.
pub fn process_image(
    pipeline: &OrtPipeline,
    input: &Path,
    artifacts: Option<&Path>,
) -> anyhow::Result<ProcessedReceipt> {
    let bytes = fs::read(input)?;
    let image = image::load_from_memory(&bytes)
        .map_err(|e| describe_error(input, e.into()))?;

    let receipt = pipeline
        .process(&image)
        .map_err(|e| describe_error(input, e))?;

    if let Some(dir) = artifacts {
        fs::create_dir_all(dir)?;
        pipeline
            .prepare(&image)
            .save(dir.join("preprocessed.png"))?;
        fs::write(
            dir.join("result.json"),
            serde_json::to_string_pretty(&receipt)?,
        )?;
        debug!("Artifacts written to {}", dir.display());
    }

    Ok(receipt)
}
