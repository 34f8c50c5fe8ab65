//! Two-stage OCR engine: region detection, then per-crop recognition.

use image::{DynamicImage, GenericImageView};
use tracing::{debug, warn};

use crate::error::{GeometryError, OcrError};

use super::geometry::{BoundingBox, Fragment};
use super::preprocessing::ImagePreprocessor;
use super::{RegionDetector, TextRecognizer};

/// OCR engine owning one detector and one recognizer.
///
/// Both models are loaded once and shared by every request the process
/// handles.
pub struct OcrEngine<D: RegionDetector, R: TextRecognizer> {
    detector: D,
    recognizer: R,
    preprocessor: ImagePreprocessor,
}

/// Fragments recovered from one image.
#[derive(Debug, Clone, Default)]
pub struct RecognizedRegions {
    pub fragments: Vec<Fragment>,
    /// Detected regions dropped for invalid geometry.
    pub rejected: usize,
}

impl<D: RegionDetector, R: TextRecognizer> OcrEngine<D, R> {
    pub fn new(detector: D, recognizer: R) -> Self {
        Self {
            detector,
            recognizer,
            preprocessor: ImagePreprocessor::new(),
        }
    }

    /// Detect regions, validate them, and transcribe each accepted crop.
    ///
    /// A region that is non-finite, inverted, or leaves the image is
    /// skipped with a warning. Detector or recognizer failures abort.
    pub fn recognize_fragments(&self, image: &DynamicImage) -> Result<RecognizedRegions, OcrError> {
        let (width, height) = image.dimensions();
        let regions = self.detector.detect(image)?;

        debug!("Detector returned {} regions", regions.len());

        let mut result = RecognizedRegions {
            fragments: Vec::with_capacity(regions.len()),
            rejected: 0,
        };

        for coords in regions {
            let bbox = match validate_region(coords, width, height) {
                Ok(bbox) => bbox,
                Err(e) => {
                    warn!("Skipping region: {}", e);
                    result.rejected += 1;
                    continue;
                }
            };

            let crop = self.preprocessor.crop_region(image, &bbox);
            let text = self.recognizer.recognize(&crop)?;
            result.fragments.push(Fragment::new(bbox, text));
        }

        debug!(
            "Recognized {} fragments, rejected {} regions",
            result.fragments.len(),
            result.rejected
        );

        Ok(result)
    }
}

fn validate_region(coords: [f32; 4], width: u32, height: u32) -> Result<BoundingBox, GeometryError> {
    let bbox = BoundingBox::try_from(coords)?;
    bbox.check_within(width, height)?;
    Ok(bbox)
}

/// Concrete engine type produced by [`create_engine_from_dir`].
#[cfg(feature = "native")]
pub type OrtOcrEngine = OcrEngine<
    super::DbTextDetector<crate::OrtBackend>,
    super::CtcTextRecognizer<crate::OrtBackend>,
>;

/// Load the detection and recognition models from a directory.
///
/// File names come from `config.models`; the dictionary falls back to the
/// built-in Vietnamese set when its file is absent.
#[cfg(feature = "native")]
pub fn create_engine_from_dir(
    model_dir: &std::path::Path,
    config: &crate::models::config::HoadonConfig,
) -> Result<OrtOcrEngine, OcrError> {
    use super::recognizer::{default_vietnamese_dictionary, load_dictionary};
    use super::{CtcTextRecognizer, DbTextDetector};
    use crate::{OrtBackend, OrtOptions};

    let det_path = model_dir.join(&config.models.detection_model);
    let rec_path = model_dir.join(&config.models.recognition_model);
    let dict_path = model_dir.join(&config.models.dictionary);

    for path in [&det_path, &rec_path] {
        if !path.exists() {
            return Err(OcrError::ModelLoad(format!(
                "model file not found: {}",
                path.display()
            )));
        }
    }

    let options = OrtOptions {
        intra_threads: config.ocr.num_threads,
        ..OrtOptions::default()
    };

    let backend = OrtBackend::from_file(&det_path, &options)
        .map_err(|e| OcrError::ModelLoad(format!("failed to load detector: {}", e)))?;
    let detector = DbTextDetector::new(backend).with_config(&config.ocr);
    debug!("Loaded detector from {}", det_path.display());

    let backend = OrtBackend::from_file(&rec_path, &options)
        .map_err(|e| OcrError::ModelLoad(format!("failed to load recognizer: {}", e)))?;
    let dictionary = if dict_path.exists() {
        load_dictionary(&dict_path)?
    } else {
        debug!("No dictionary at {}, using built-in set", dict_path.display());
        default_vietnamese_dictionary()
    };
    let recognizer = CtcTextRecognizer::new(backend, dictionary);
    debug!("Loaded recognizer from {}", rec_path.display());

    Ok(OcrEngine::new(detector, recognizer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::testing::{StubDetector, StubRecognizer};
    use image::RgbImage;
    use pretty_assertions::assert_eq;

    fn image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
    }

    #[test]
    fn test_rejects_invalid_regions() {
        let detector = StubDetector(vec![
            [10.0, 10.0, 80.0, 30.0],
            // past the bottom edge
            [10.0, 180.0, 80.0, 260.0],
            // inverted
            [50.0, 40.0, 20.0, 60.0],
            [f32::NAN, 0.0, 10.0, 10.0],
            [100.0, 10.0, 190.0, 30.0],
        ]);
        let engine = OcrEngine::new(detector, StubRecognizer::new(&["Tổng", "50.000"]));

        let result = engine.recognize_fragments(&image(200, 200)).unwrap();

        assert_eq!(result.rejected, 3);
        let texts: Vec<&str> = result.fragments.iter().map(|f| f.text()).collect();
        assert_eq!(texts, vec!["Tổng", "50.000"]);
        assert_eq!(result.fragments[1].bbox().to_array(), [100.0, 10.0, 190.0, 30.0]);
    }

    #[test]
    fn test_recognizer_failure_aborts() {
        let detector = StubDetector(vec![[0.0, 0.0, 10.0, 10.0]]);
        let engine = OcrEngine::new(detector, StubRecognizer::failing());

        assert!(matches!(
            engine.recognize_fragments(&image(50, 50)),
            Err(OcrError::Recognition(_))
        ));
    }

    #[test]
    fn test_no_regions() {
        let engine = OcrEngine::new(StubDetector(Vec::new()), StubRecognizer::new(&[]));
        let result = engine.recognize_fragments(&image(50, 50)).unwrap();
        assert!(result.fragments.is_empty());
        assert_eq!(result.rejected, 0);
    }

    #[cfg(feature = "native")]
    #[test]
    fn test_missing_models_fail_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let config = crate::models::config::HoadonConfig::default();

        assert!(matches!(
            create_engine_from_dir(dir.path(), &config),
            Err(OcrError::ModelLoad(_))
        ));
    }
}
