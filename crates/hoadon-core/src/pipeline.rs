//! End-to-end receipt processing: image in, fields out.

use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use tracing::{debug, info};

use crate::error::Result;
use crate::models::config::HoadonConfig;
use crate::models::receipt::{ExtractionResult, ProcessedReceipt};
use crate::ocr::{
    Fragment, ImagePreprocessor, ImageQuality, ImageValidator, LineGrouper, OcrEngine,
    RegionDetector, TextRecognizer, join_lines,
};
use crate::receipt::ReceiptExtractor;

/// Validates an image, runs OCR, groups lines and extracts fields.
///
/// Holds no per-request state, so one pipeline serves concurrent requests
/// through a shared reference.
pub struct ReceiptPipeline<D: RegionDetector, R: TextRecognizer> {
    engine: OcrEngine<D, R>,
    validator: ImageValidator,
    preprocessor: ImagePreprocessor,
    grouper: LineGrouper,
    extractor: ReceiptExtractor,
}

impl<D: RegionDetector, R: TextRecognizer> ReceiptPipeline<D, R> {
    /// Pipeline with default validation, resizing and grouping.
    pub fn new(engine: OcrEngine<D, R>) -> Self {
        Self {
            engine,
            validator: ImageValidator::new(),
            preprocessor: ImagePreprocessor::new(),
            grouper: LineGrouper::default(),
            extractor: ReceiptExtractor::new(),
        }
    }

    pub fn from_config(engine: OcrEngine<D, R>, config: &HoadonConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            engine,
            validator: ImageValidator::from_config(&config.preprocessing),
            preprocessor: ImagePreprocessor::from_config(&config.ocr, &config.preprocessing),
            grouper: LineGrouper::new(config.grouping.line_threshold)
                .with_anchor_policy(config.grouping.anchor_policy),
            extractor: ReceiptExtractor::new(),
        })
    }

    /// Process a decoded image.
    pub fn process(&self, image: &DynamicImage) -> Result<ProcessedReceipt> {
        let start = Instant::now();
        let (width, height) = image.dimensions();
        info!("Processing receipt image: {}x{}", width, height);

        let quality = self.validator.validate(image)?;
        let image = self.prepare(image);

        let regions = self.engine.recognize_fragments(&image)?;
        let mut receipt = self.process_fragments(regions.fragments);
        receipt.rejected_regions = regions.rejected;
        receipt.quality = quality;
        receipt.image_size = image.dimensions();
        receipt.processing_time_ms = start.elapsed().as_millis() as u64;

        info!(
            "Receipt processed: {} lines, {}/4 fields in {}ms",
            receipt.lines.len(),
            receipt.fields.found_count(),
            receipt.processing_time_ms
        );

        Ok(receipt)
    }

    /// Decode encoded image bytes (PNG, JPEG, ...) and process them.
    pub fn process_bytes(&self, bytes: &[u8]) -> Result<ProcessedReceipt> {
        let image = image::load_from_memory(bytes)?;
        self.process(&image)
    }

    /// Group already recognized fragments and extract fields, without OCR.
    pub fn process_fragments(&self, fragments: Vec<Fragment>) -> ProcessedReceipt {
        let start = Instant::now();
        let lines = self.grouper.group(fragments);
        let text = join_lines(&lines);
        debug!("Joined text has {} lines", lines.len());

        let fields: ExtractionResult = self.extractor.extract(&text);

        ProcessedReceipt {
            fields,
            lines,
            rejected_regions: 0,
            quality: ImageQuality::default(),
            image_size: (0, 0),
            processing_time_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// The image OCR actually runs on: `image`, downscaled when tall.
    pub fn prepare<'a>(&self, image: &'a DynamicImage) -> std::borrow::Cow<'a, DynamicImage> {
        self.preprocessor.downscale_tall(image)
    }

    pub fn engine(&self) -> &OcrEngine<D, R> {
        &self.engine
    }
}
