//! Core library for Vietnamese receipt OCR.
//!
//! This crate provides:
//! - Two-stage OCR (text region detection, per-crop recognition) behind
//!   the [`RegionDetector`] and [`TextRecognizer`] traits
//! - Grouping of recognized fragments into reading-order lines
//! - Rule-based extraction of date, total, address and phone fields
//! - [`ReceiptPipeline`], tying the stages together

pub mod error;
pub mod models;
pub mod ocr;
pub mod pipeline;
pub mod receipt;

pub use error::{GeometryError, HoadonError, OcrError, Result};
pub use models::{ExtractionResult, HoadonConfig, ProcessedReceipt};
pub use ocr::{
    AnchorPolicy, BoundingBox, Fragment, Line, LineGrouper, OcrEngine, RegionDetector,
    TextRecognizer, group_into_lines, join_lines,
};
#[cfg(feature = "native")]
pub use ocr::{OrtOcrEngine, create_engine_from_dir};
pub use pipeline::ReceiptPipeline;
pub use receipt::{ReceiptExtractor, find_address, find_date, find_phone, find_total};

/// Re-export inference types.
pub use hoadon_inference::{InferenceBackend, InputTensor, OutputTensor};

#[cfg(feature = "native")]
pub use hoadon_inference::{OrtBackend, OrtOptions};
