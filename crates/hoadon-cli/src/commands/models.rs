//! Models command - download and manage OCR models.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;
use futures_util::{Stream, StreamExt};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tracing::debug;

use hoadon_core::HoadonConfig;

use super::{load_config, resolve_model_dir};

/// Arguments for the models command.
#[derive(Args)]
pub struct ModelsArgs {
    /// Model directory (default: models.model_dir from config)
    #[arg(short, long, global = true)]
    model_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: ModelsCommand,
}

#[derive(Subcommand)]
enum ModelsCommand {
    /// Check which model files are present
    Status,

    /// Download model files
    Download(DownloadArgs),

    /// Remove downloaded models
    Clean,

    /// Print the model directory
    Path,
}

#[derive(Args)]
struct DownloadArgs {
    /// URL the files are fetched from (default: models.download_base_url)
    #[arg(long)]
    base_url: Option<String>,

    /// Force re-download even if files exist
    #[arg(long)]
    force: bool,
}

/// A file the OCR engine loads from the model directory.
struct ModelFile {
    filename: String,
    description: &'static str,
    required: bool,
}

fn model_files(config: &HoadonConfig) -> [ModelFile; 3] {
    [
        ModelFile {
            filename: config.models.detection_model.clone(),
            description: "Text detection",
            required: true,
        },
        ModelFile {
            filename: config.models.recognition_model.clone(),
            description: "Vietnamese recognition",
            required: true,
        },
        ModelFile {
            filename: config.models.dictionary.clone(),
            description: "Character dictionary",
            required: false,
        },
    ]
}

pub async fn run(args: ModelsArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let model_dir = resolve_model_dir(args.model_dir.as_deref(), &config);

    match args.command {
        ModelsCommand::Status => check_status(&model_dir, &config),
        ModelsCommand::Download(download_args) => {
            download_models(download_args, &model_dir, &config).await
        }
        ModelsCommand::Clean => clean_models(&model_dir, &config),
        ModelsCommand::Path => {
            println!("{}", model_dir.display());
            Ok(())
        }
    }
}

/// `base` joined with `file`, with exactly one slash between them.
fn file_url(base: &str, file: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), file)
}

async fn download_models(
    args: DownloadArgs,
    model_dir: &Path,
    config: &HoadonConfig,
) -> anyhow::Result<()> {
    let base_url = args
        .base_url
        .or_else(|| config.models.download_base_url.clone())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "No download source configured.\n\n\
                 Pass --base-url <URL> or run 'hoadon config set models.download_base_url <URL>'."
            )
        })?;

    fs::create_dir_all(model_dir)?;

    println!(
        "{} Downloading models from {} to {}",
        style("ℹ").blue(),
        style(&base_url).cyan(),
        model_dir.display()
    );
    println!();

    let client = reqwest::Client::builder()
        .user_agent(concat!("hoadon-cli/", env!("CARGO_PKG_VERSION")))
        .timeout(std::time::Duration::from_secs(300))
        .build()?;

    let multi_progress = MultiProgress::new();
    let mut success_count = 0;
    let mut skip_count = 0;
    let mut error_count = 0;

    for model in model_files(config) {
        let path = model_dir.join(&model.filename);

        if path.exists() && !args.force {
            let size = fs::metadata(&path)?.len();
            println!(
                "  {} {} (already exists, {})",
                style("✓").green(),
                model.filename,
                format_size(size)
            );
            skip_count += 1;
            continue;
        }

        let pb = multi_progress.add(ProgressBar::new(0));
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.green} {msg:<30} [{bar:25.cyan/blue}] {bytes}/{total_bytes}")
                .unwrap()
                .progress_chars("=>-"),
        );
        pb.set_message(model.filename.clone());

        let url = file_url(&base_url, &model.filename);
        debug!("Fetching {}", url);

        match download_file(&client, &url, &path, &pb).await {
            Ok(()) => {
                pb.finish_with_message(format!("{} {}", style("✓").green(), model.filename));
                success_count += 1;
            }
            Err(e) => {
                pb.finish_with_message(format!("{} {} - {}", style("✗").red(), model.filename, e));
                if model.required {
                    error_count += 1;
                }
            }
        }
    }

    println!();

    if error_count == 0 {
        println!("{} Models ready", style("✓").green().bold());
        println!(
            "   {} downloaded, {} already present",
            success_count, skip_count
        );
    } else {
        println!(
            "{} Download completed with errors",
            style("⚠").yellow().bold()
        );
        println!(
            "   {} downloaded, {} skipped, {} failed",
            success_count, skip_count, error_count
        );
        println!();
        println!("Retry with: hoadon models download --force");
    }

    println!();
    check_status(model_dir, config)?;

    if error_count > 0 {
        anyhow::bail!("{} required model files failed to download", error_count);
    }

    Ok(())
}

async fn download_file(
    client: &reqwest::Client,
    url: &str,
    path: &Path,
    pb: &ProgressBar,
) -> anyhow::Result<()> {
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        anyhow::bail!("HTTP {}", response.status());
    }

    if let Some(content_length) = response.content_length() {
        pb.set_length(content_length);
    }

    save_stream(response.bytes_stream(), path, pb).await
}

/// Stream chunks into `<path>.tmp`, then rename it to `path`.
///
/// A failed stream or write leaves neither file behind.
async fn save_stream<S, C, E>(stream: S, path: &Path, pb: &ProgressBar) -> anyhow::Result<()>
where
    S: Stream<Item = Result<C, E>> + Unpin,
    C: AsRef<[u8]>,
    E: std::error::Error + Send + Sync + 'static,
{
    // Partial downloads never take the final name
    let temp_path = path.with_extension("tmp");
    if let Err(e) = write_chunks(stream, &temp_path, pb).await {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    fs::rename(&temp_path, path)?;

    Ok(())
}

async fn write_chunks<S, C, E>(mut stream: S, temp_path: &Path, pb: &ProgressBar) -> anyhow::Result<()>
where
    S: Stream<Item = Result<C, E>> + Unpin,
    C: AsRef<[u8]>,
    E: std::error::Error + Send + Sync + 'static,
{
    let mut file = File::create(temp_path)?;
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let bytes = chunk.as_ref();
        file.write_all(bytes)?;
        downloaded += bytes.len() as u64;
        pb.set_position(downloaded);
    }

    file.flush()?;
    Ok(())
}

fn check_status(model_dir: &Path, config: &HoadonConfig) -> anyhow::Result<()> {
    println!("{}", style("Model Status").bold());
    println!("Directory: {}", model_dir.display());
    println!();

    let mut ready = true;
    let mut total_size: u64 = 0;

    for model in model_files(config) {
        let path = model_dir.join(&model.filename);
        let (status, size_str) = if path.exists() {
            let size = fs::metadata(&path)?.len();
            total_size += size;
            (style("✓").green(), format_size(size))
        } else if model.required {
            ready = false;
            (style("✗").red(), "missing".to_string())
        } else {
            (style("-").dim(), "built-in fallback".to_string())
        };

        println!(
            "    {} {:<25} {:>18}  {}",
            status, model.filename, size_str, model.description
        );
    }

    println!();
    if ready {
        println!(
            "    {} Ready ({} total)",
            style("✓").green(),
            format_size(total_size)
        );
    } else {
        println!(
            "    {} Run 'hoadon models download --base-url <URL>' to download",
            style("⚠").yellow()
        );
    }

    Ok(())
}

fn clean_models(model_dir: &Path, config: &HoadonConfig) -> anyhow::Result<()> {
    let mut total_removed = 0;
    let mut total_freed: u64 = 0;

    for model in model_files(config) {
        let path = model_dir.join(&model.filename);
        if path.exists() {
            let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            fs::remove_file(&path)?;
            total_removed += 1;
            total_freed += size;
            println!("  {} Removed {}", style("✓").green(), model.filename);
        }
    }

    // Leftovers from interrupted downloads
    if let Ok(entries) = fs::read_dir(model_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map(|e| e == "tmp").unwrap_or(false) {
                let _ = fs::remove_file(&path);
            }
        }
    }

    if total_removed > 0 {
        println!();
        println!(
            "{} Removed {} files, freed {}",
            style("✓").green(),
            total_removed,
            format_size(total_freed)
        );
    } else {
        println!("{} No model files to remove.", style("ℹ").blue());
    }

    Ok(())
}

fn format_size(bytes: u64) -> String {
    if bytes >= 1_000_000_000 {
        format!("{:.1}GB", bytes as f64 / 1_000_000_000.0)
    } else if bytes >= 1_000_000 {
        format!("{:.1}MB", bytes as f64 / 1_000_000.0)
    } else if bytes >= 1_000 {
        format!("{:.1}KB", bytes as f64 / 1_000.0)
    } else {
        format!("{}B", bytes)
    }
}
