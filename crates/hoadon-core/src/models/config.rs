//! Configuration structures for the receipt pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{HoadonError, Result};
use crate::ocr::{AnchorPolicy, DEFAULT_LINE_THRESHOLD};

/// Main configuration for the hoadon pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoadonConfig {
    /// OCR model configuration.
    pub ocr: OcrConfig,

    /// Input validation and resizing.
    pub preprocessing: PreprocessingConfig,

    /// Line grouping.
    pub grouping: GroupingConfig,

    /// Model files.
    pub models: ModelConfig,

    /// Batch processing.
    pub pipeline: PipelineConfig,
}

/// OCR engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Binarization threshold for the detection probability map (0.0 - 1.0).
    pub detection_threshold: f32,

    /// Minimum mean probability of a detected box (0.0 - 1.0).
    pub box_threshold: f32,

    /// How far detected kernels are expanded back to full text size.
    pub unclip_ratio: f32,

    /// Longer side of the detection input, in pixels.
    pub detection_size: u32,

    /// Number of CPU threads per model.
    pub num_threads: usize,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            detection_threshold: 0.3,
            box_threshold: 0.6,
            unclip_ratio: 1.5,
            detection_size: 960,
            num_threads: 4,
        }
    }
}

/// Input image checks and resizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    /// Smaller images are rejected.
    pub min_width: u32,
    pub min_height: u32,

    /// Grayscale mean above which the image is reported as mostly blank.
    pub blank_mean: f64,

    /// Grayscale standard deviation below which contrast is reported low.
    pub min_contrast: f64,

    /// Laplacian variance below which the image is reported blurry.
    pub min_sharpness: f64,

    /// Taller images are downscaled before OCR.
    pub max_height: u32,

    /// Scale factor applied to tall images.
    pub downscale_factor: f32,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            min_width: 100,
            min_height: 100,
            blank_mean: 250.0,
            min_contrast: 10.0,
            min_sharpness: 100.0,
            max_height: 1000,
            downscale_factor: 0.5,
        }
    }
}

/// Line grouping configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupingConfig {
    /// Maximum vertical distance from a line's anchor, in pixels.
    pub line_threshold: f32,

    pub anchor_policy: AnchorPolicy,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            line_threshold: DEFAULT_LINE_THRESHOLD,
            anchor_policy: AnchorPolicy::default(),
        }
    }
}

/// Model file paths and download source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,

    /// Base URL the model files are downloaded from.
    pub download_base_url: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "vi_rec.onnx".to_string(),
            dictionary: "vi_dict.txt".to_string(),
            download_base_url: None,
        }
    }
}

/// Batch processing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Images processed concurrently.
    pub max_workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { max_workers: 2 }
    }
}

impl HoadonConfig {
    /// Load configuration from a JSON file. Missing keys take defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| HoadonError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| HoadonError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(HoadonError::Config(msg));

        if !self.grouping.line_threshold.is_finite() {
            return fail(format!(
                "grouping.line_threshold must be finite, got {}",
                self.grouping.line_threshold
            ));
        }
        for (key, value) in [
            ("ocr.detection_threshold", self.ocr.detection_threshold),
            ("ocr.box_threshold", self.ocr.box_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return fail(format!("{} must be within 0..=1, got {}", key, value));
            }
        }
        if !(self.ocr.unclip_ratio >= 1.0) {
            return fail(format!(
                "ocr.unclip_ratio must be at least 1, got {}",
                self.ocr.unclip_ratio
            ));
        }
        let factor = self.preprocessing.downscale_factor;
        if !(factor > 0.0 && factor <= 1.0) {
            return fail(format!(
                "preprocessing.downscale_factor must be within (0, 1], got {}",
                factor
            ));
        }
        if self.pipeline.max_workers == 0 {
            return fail("pipeline.max_workers must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = HoadonConfig::default();
        assert_eq!(config.grouping.line_threshold, 30.0);
        assert_eq!(config.grouping.anchor_policy, AnchorPolicy::FirstFragment);
        assert_eq!(config.preprocessing.max_height, 1000);
        assert_eq!(config.pipeline.max_workers, 2);
        assert_eq!(config.models.download_base_url, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"grouping": {"anchor_policy": "running_mean"}, "pipeline": {"max_workers": 8}}"#,
        )
        .unwrap();

        let config = HoadonConfig::from_file(&path).unwrap();
        assert_eq!(config.grouping.anchor_policy, AnchorPolicy::RunningMean);
        assert_eq!(config.grouping.line_threshold, 30.0);
        assert_eq!(config.pipeline.max_workers, 8);
        assert_eq!(config.ocr, OcrConfig::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = HoadonConfig::default();
        config.models.download_base_url = Some("https://models.example.test/vi".to_string());
        config.save(&path).unwrap();

        assert_eq!(HoadonConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = HoadonConfig::default();
        config.grouping.line_threshold = f32::NAN;
        assert!(matches!(config.validate(), Err(HoadonError::Config(_))));

        let mut config = HoadonConfig::default();
        config.ocr.box_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = HoadonConfig::default();
        config.preprocessing.downscale_factor = 0.0;
        assert!(config.validate().is_err());

        let mut config = HoadonConfig::default();
        config.pipeline.max_workers = 0;
        assert!(config.validate().is_err());

        // negative thresholds are allowed: every fragment gets its own line
        let mut config = HoadonConfig::default();
        config.grouping.line_threshold = -1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            HoadonConfig::from_file(&path),
            Err(HoadonError::Config(_))
        ));
    }
}
