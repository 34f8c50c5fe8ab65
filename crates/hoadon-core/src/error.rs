//! Error types for the hoadon-core library.

use thiserror::Error;

/// Main error type for the hoadon library.
#[derive(Error, Debug)]
pub enum HoadonError {
    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Inference error from the inference layer.
    #[error("inference error: {0}")]
    Inference(#[from] hoadon_inference::InferenceError),

    /// Image decoding error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Invalid box geometry.
    #[error("geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl HoadonError {
    /// Whether the failure was caused by the submitted image rather than
    /// by the processing machinery.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            HoadonError::Image(_) | HoadonError::Ocr(OcrError::InvalidImage(_))
        )
    }
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text detection failed.
    #[error("text detection failed: {0}")]
    Detection(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Image preprocessing failed.
    #[error("preprocessing failed: {0}")]
    Preprocessing(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Reasons a detected region is rejected before it becomes a fragment.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// A coordinate is NaN or infinite.
    #[error("non-finite coordinate in box {0:?}")]
    NonFinite([f32; 4]),

    /// `min >= max` on at least one axis.
    #[error("inverted or empty box {0:?}")]
    Inverted([f32; 4]),

    /// The box leaves the image.
    #[error("box {coords:?} lies outside the {width}x{height} image")]
    OutOfBounds {
        coords: [f32; 4],
        width: u32,
        height: u32,
    },
}

/// Result type for the hoadon library.
pub type Result<T> = std::result::Result<T, HoadonError>;
