//! Subcommands and the helpers they share.

pub mod batch;
pub mod config;
pub mod extract;
pub mod models;
pub mod output;
pub mod process;

use std::path::{Path, PathBuf};

use tracing::debug;

use hoadon_core::{HoadonConfig, HoadonError, OrtOcrEngine, ReceiptPipeline, create_engine_from_dir};

/// Pipeline type built from on-disk ONNX models.
pub type OrtPipeline = ReceiptPipeline<
    hoadon_core::ocr::DbTextDetector<hoadon_core::OrtBackend>,
    hoadon_core::ocr::CtcTextRecognizer<hoadon_core::OrtBackend>,
>;

/// `<user config dir>/hoadon/config.json`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hoadon")
        .join("config.json")
}

/// The file config commands read and write: `--config` when given.
pub fn config_file_path(explicit: Option<&Path>) -> PathBuf {
    explicit.map(Path::to_path_buf).unwrap_or_else(default_config_path)
}

/// Load `--config`, else the user config file if present, else defaults.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<HoadonConfig> {
    if let Some(path) = explicit {
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        return Ok(HoadonConfig::from_file(path)?);
    }

    let path = default_config_path();
    if path.exists() {
        debug!("Using config file {}", path.display());
        Ok(HoadonConfig::from_file(&path)?)
    } else {
        debug!("No config file, using defaults");
        Ok(HoadonConfig::default())
    }
}

/// `--model-dir` when given, else `models.model_dir` from config.
pub fn resolve_model_dir(arg: Option<&Path>, config: &HoadonConfig) -> PathBuf {
    arg.map(Path::to_path_buf)
        .unwrap_or_else(|| config.models.model_dir.clone())
}

/// Load the models and build a pipeline from config.
pub fn build_pipeline(model_dir: &Path, config: &HoadonConfig) -> anyhow::Result<OrtPipeline> {
    let det = model_dir.join(&config.models.detection_model);
    let rec = model_dir.join(&config.models.recognition_model);

    if !det.exists() || !rec.exists() {
        anyhow::bail!(
            "OCR models not found in {}.\n\n\
             Run 'hoadon models download --base-url <URL>' or pass --model-dir.",
            model_dir.display()
        );
    }

    let engine: OrtOcrEngine = create_engine_from_dir(model_dir, config)
        .map_err(|e| anyhow::anyhow!("Failed to load OCR models: {}", e))?;

    Ok(ReceiptPipeline::from_config(engine, config)?)
}

/// Turn a pipeline error into a message that says whose fault it was.
pub fn describe_error(path: &Path, err: HoadonError) -> anyhow::Error {
    if err.is_input_error() {
        anyhow::anyhow!("Invalid input image {}: {}", path.display(), err)
    } else {
        anyhow::anyhow!("Processing failed for {}: {}", path.display(), err)
    }
}

/// Whether a path has an image extension the decoder handles.
pub fn is_image_file(path: &Path) -> bool {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    matches!(
        ext.as_str(),
        "png" | "jpg" | "jpeg" | "webp" | "tiff" | "tif" | "bmp"
    )
}
