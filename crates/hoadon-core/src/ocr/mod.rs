//! OCR stages: region detection, recognition, and line grouping.
//!
//! Detection and recognition are separate capabilities behind
//! [`RegionDetector`] and [`TextRecognizer`], so any engine can stand in
//! for the bundled PaddleOCR models.

mod detector;
mod engine;
pub mod geometry;
pub mod lines;
mod preprocessing;
mod recognizer;

#[cfg(test)]
pub(crate) mod testing;

pub use detector::{DbTextDetector, Detection};
pub use engine::{OcrEngine, RecognizedRegions};
pub use geometry::{BoundingBox, Fragment, RegionCoords};
pub use lines::{AnchorPolicy, DEFAULT_LINE_THRESHOLD, Line, LineGrouper, group_into_lines, join_lines};
pub use preprocessing::{ImagePreprocessor, ImageQuality, ImageValidator, QualityWarning};
pub use recognizer::{CtcTextRecognizer, default_vietnamese_dictionary, load_dictionary};

#[cfg(feature = "native")]
pub use engine::{OrtOcrEngine, create_engine_from_dir};

use image::DynamicImage;

use crate::error::OcrError;

/// Finds candidate text regions in an image.
pub trait RegionDetector: Send + Sync {
    /// Raw `[x_min, y_min, x_max, y_max]` boxes; callers validate them.
    fn detect(&self, image: &DynamicImage) -> Result<Vec<RegionCoords>, OcrError>;
}

/// Transcribes one cropped text region.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError>;
}
