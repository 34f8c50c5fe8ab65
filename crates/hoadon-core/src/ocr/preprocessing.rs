//! Image preprocessing and quality checks for OCR.

use std::borrow::Cow;
use std::fmt;

use image::{DynamicImage, GenericImageView, GrayImage};
use ndarray::Array4;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::OcrError;
use crate::models::config::{OcrConfig, PreprocessingConfig};

use super::geometry::BoundingBox;

/// Image preprocessor for the OCR pipeline.
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    /// Longer side of the detection input.
    det_target_size: u32,
    /// Fixed height of recognition input.
    rec_target_height: u32,
    /// Maximum width of recognition input.
    rec_target_width: u32,
    /// Images taller than this are downscaled before OCR.
    max_height: u32,
    /// Scale applied to tall images.
    downscale_factor: f32,
}

impl ImagePreprocessor {
    /// Create a new preprocessor with default settings.
    pub fn new() -> Self {
        Self {
            det_target_size: 960,
            rec_target_height: 48,
            rec_target_width: 320,
            max_height: 1000,
            downscale_factor: 0.5,
        }
    }

    /// Build from the OCR and preprocessing config sections.
    pub fn from_config(ocr: &OcrConfig, preprocessing: &PreprocessingConfig) -> Self {
        Self::new()
            .with_detection_size(ocr.detection_size)
            .with_downscale(preprocessing.max_height, preprocessing.downscale_factor)
    }

    /// Set the longer side of the detection input.
    pub fn with_detection_size(mut self, size: u32) -> Self {
        self.det_target_size = size.max(32);
        self
    }

    /// Set the tall-image downscale rule.
    pub fn with_downscale(mut self, max_height: u32, factor: f32) -> Self {
        self.max_height = max_height;
        self.downscale_factor = factor;
        self
    }

    /// Halve (by default) images taller than the configured limit.
    ///
    /// Detection and cropping both run on the returned image, so region
    /// coordinates stay consistent with the crops.
    pub fn downscale_tall<'a>(&self, image: &'a DynamicImage) -> Cow<'a, DynamicImage> {
        let (width, height) = image.dimensions();
        if height <= self.max_height || !(self.downscale_factor > 0.0 && self.downscale_factor < 1.0)
        {
            return Cow::Borrowed(image);
        }

        let new_width = ((width as f32 * self.downscale_factor) as u32).max(1);
        let new_height = ((height as f32 * self.downscale_factor) as u32).max(1);
        debug!(
            "Downscaling {}x{} image to {}x{}",
            width, height, new_width, new_height
        );

        Cow::Owned(image.resize_exact(
            new_width,
            new_height,
            image::imageops::FilterType::Triangle,
        ))
    }

    /// Preprocess image for text detection model.
    ///
    /// Returns (preprocessed tensor, scale_x, scale_y, original_size).
    pub fn preprocess_for_detection(
        &self,
        image: &DynamicImage,
    ) -> Result<(Array4<f32>, f32, f32, (u32, u32)), OcrError> {
        let (orig_width, orig_height) = image.dimensions();
        if orig_width == 0 || orig_height == 0 {
            return Err(OcrError::Preprocessing("empty image".to_string()));
        }

        let (new_width, new_height) =
            self.calculate_resize_dimensions(orig_width, orig_height, self.det_target_size);

        let resized = image.resize_exact(
            new_width,
            new_height,
            image::imageops::FilterType::Lanczos3,
        );

        // DB models need both sides divisible by 32
        let pad_width = new_width.div_ceil(32) * 32;
        let pad_height = new_height.div_ceil(32) * 32;

        let rgb = resized.to_rgb8();
        let mut tensor = Array4::<f32>::zeros((1, 3, pad_height as usize, pad_width as usize));

        // ImageNet normalization: (x / 255 - mean) / std
        let mean = [0.485f32, 0.456, 0.406];
        let std = [0.229f32, 0.224, 0.225];

        for (x, y, pixel) in rgb.enumerate_pixels() {
            for c in 0..3 {
                let value = pixel[c] as f32 / 255.0;
                tensor[[0, c, y as usize, x as usize]] = (value - mean[c]) / std[c];
            }
        }

        let scale_x = new_width as f32 / orig_width as f32;
        let scale_y = new_height as f32 / orig_height as f32;

        Ok((tensor, scale_x, scale_y, (orig_width, orig_height)))
    }

    /// Preprocess a cropped text region for recognition.
    pub fn preprocess_for_recognition(
        &self,
        image: &DynamicImage,
    ) -> Result<Array4<f32>, OcrError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(OcrError::Preprocessing("empty crop".to_string()));
        }

        let aspect_ratio = width as f32 / height as f32;
        let target_width = (self.rec_target_height as f32 * aspect_ratio) as u32;
        let target_width = target_width.clamp(1, self.rec_target_width);

        let resized = image.resize_exact(
            target_width,
            self.rec_target_height,
            image::imageops::FilterType::Lanczos3,
        );

        let rgb = resized.to_rgb8();

        // Right side stays zero-padded up to the fixed width
        let mut tensor = Array4::<f32>::zeros((
            1,
            3,
            self.rec_target_height as usize,
            self.rec_target_width as usize,
        ));

        for (x, y, pixel) in rgb.enumerate_pixels() {
            for c in 0..3 {
                let value = pixel[c] as f32 / 255.0;
                tensor[[0, c, y as usize, x as usize]] = (value - 0.5) / 0.5;
            }
        }

        Ok(tensor)
    }

    /// Crop a validated region out of the image.
    pub fn crop_region(&self, image: &DynamicImage, bbox: &BoundingBox) -> DynamicImage {
        let (x, y, width, height) = bbox.pixel_rect();
        let width = width.min(image.width().saturating_sub(x)).max(1);
        let height = height.min(image.height().saturating_sub(y)).max(1);
        image.crop_imm(x, y, width, height)
    }

    fn calculate_resize_dimensions(
        &self,
        width: u32,
        height: u32,
        target_size: u32,
    ) -> (u32, u32) {
        let max_dim = width.max(height);

        if max_dim <= target_size {
            return (width, height);
        }

        let scale = target_size as f32 / max_dim as f32;
        let new_width = (width as f32 * scale) as u32;
        let new_height = (height as f32 * scale) as u32;

        (new_width.max(1), new_height.max(1))
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Soft quality problems. They are reported, never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityWarning {
    MostlyBlank,
    LowContrast,
    Blurry,
}

impl fmt::Display for QualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityWarning::MostlyBlank => write!(f, "image appears to be mostly blank"),
            QualityWarning::LowContrast => write!(f, "image has low contrast, OCR may fail"),
            QualityWarning::Blurry => {
                write!(f, "image appears blurry, OCR may be less accurate")
            }
        }
    }
}

/// Grayscale statistics of an input image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageQuality {
    pub mean: f64,
    pub std_dev: f64,
    /// Variance of the 4-neighbour Laplacian; low values mean blur.
    pub laplacian_variance: f64,
    pub warnings: Vec<QualityWarning>,
}

/// Input image validation.
#[derive(Debug, Clone)]
pub struct ImageValidator {
    min_width: u32,
    min_height: u32,
    blank_mean: f64,
    min_contrast: f64,
    min_sharpness: f64,
}

impl ImageValidator {
    pub fn new() -> Self {
        Self::from_config(&PreprocessingConfig::default())
    }

    pub fn from_config(config: &PreprocessingConfig) -> Self {
        Self {
            min_width: config.min_width,
            min_height: config.min_height,
            blank_mean: config.blank_mean,
            min_contrast: config.min_contrast,
            min_sharpness: config.min_sharpness,
        }
    }

    /// Reject undersized images and measure quality of the rest.
    pub fn validate(&self, image: &DynamicImage) -> Result<ImageQuality, OcrError> {
        let (width, height) = image.dimensions();
        if width < self.min_width || height < self.min_height {
            return Err(OcrError::InvalidImage(format!(
                "image must be at least {}x{}, got {}x{}",
                self.min_width, self.min_height, width, height
            )));
        }

        let gray = image.to_luma8();
        let (mean, std_dev) = mean_and_std(&gray);
        let laplacian_variance = laplacian_variance(&gray);

        let mut warnings = Vec::new();
        if mean > self.blank_mean {
            warnings.push(QualityWarning::MostlyBlank);
        }
        if std_dev < self.min_contrast {
            warnings.push(QualityWarning::LowContrast);
        }
        if laplacian_variance < self.min_sharpness {
            warnings.push(QualityWarning::Blurry);
        }

        for warning in &warnings {
            warn!("{}", warning);
        }

        debug!(
            "Image quality: mean {:.1}, std {:.1}, laplacian variance {:.1}",
            mean, std_dev, laplacian_variance
        );

        Ok(ImageQuality {
            mean,
            std_dev,
            laplacian_variance,
            warnings,
        })
    }
}

impl Default for ImageValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn mean_and_std(gray: &GrayImage) -> (f64, f64) {
    let count = gray.width() as f64 * gray.height() as f64;
    if count == 0.0 {
        return (0.0, 0.0);
    }

    let sum: f64 = gray.pixels().map(|p| p[0] as f64).sum();
    let mean = sum / count;
    let variance = gray
        .pixels()
        .map(|p| {
            let d = p[0] as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / count;

    (mean, variance.sqrt())
}

fn laplacian_variance(gray: &GrayImage) -> f64 {
    let (width, height) = gray.dimensions();
    if width < 3 || height < 3 {
        return 0.0;
    }

    let px = |x: u32, y: u32| gray.get_pixel(x, y)[0] as f64;

    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    let mut count = 0.0;

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let value =
                px(x - 1, y) + px(x + 1, y) + px(x, y - 1) + px(x, y + 1) - 4.0 * px(x, y);
            sum += value;
            sum_sq += value * value;
            count += 1.0;
        }
    }

    let mean = sum / count;
    sum_sq / count - mean * mean
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, RgbImage};
    use pretty_assertions::assert_eq;

    fn checkerboard(width: u32, height: u32, block: u32) -> DynamicImage {
        let gray = GrayImage::from_fn(width, height, |x, y| {
            if (x / block + y / block) % 2 == 0 {
                Luma([0u8])
            } else {
                Luma([255u8])
            }
        });
        DynamicImage::ImageLuma8(gray)
    }

    #[test]
    fn test_resize_dimensions() {
        let preprocessor = ImagePreprocessor::new();

        let (w, h) = preprocessor.calculate_resize_dimensions(500, 300, 960);
        assert_eq!((w, h), (500, 300));

        let (w, h) = preprocessor.calculate_resize_dimensions(1920, 1080, 960);
        assert_eq!(w, 960);
        assert!(h < 960);
    }

    #[test]
    fn test_detection_tensor_is_padded() {
        let preprocessor = ImagePreprocessor::new();
        let image = DynamicImage::ImageRgb8(RgbImage::new(100, 50));

        let (tensor, scale_x, scale_y, size) =
            preprocessor.preprocess_for_detection(&image).unwrap();

        assert_eq!(tensor.shape(), &[1, 3, 64, 128]);
        assert_eq!((scale_x, scale_y), (1.0, 1.0));
        assert_eq!(size, (100, 50));
    }

    #[test]
    fn test_recognition_tensor_shape() {
        let preprocessor = ImagePreprocessor::new();
        let crop = DynamicImage::ImageRgb8(RgbImage::new(200, 20));

        let tensor = preprocessor.preprocess_for_recognition(&crop).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 48, 320]);
    }

    #[test]
    fn test_downscale_only_tall_images() {
        let preprocessor = ImagePreprocessor::new();

        let short = DynamicImage::ImageRgb8(RgbImage::new(300, 900));
        assert!(matches!(preprocessor.downscale_tall(&short), Cow::Borrowed(_)));

        let tall = DynamicImage::ImageRgb8(RgbImage::new(300, 1200));
        let scaled = preprocessor.downscale_tall(&tall);
        assert_eq!(scaled.dimensions(), (150, 600));
    }

    #[test]
    fn test_crop_region() {
        let preprocessor = ImagePreprocessor::new();
        let image = DynamicImage::ImageRgb8(RgbImage::new(100, 100));
        let bbox = BoundingBox::new(10.0, 20.0, 50.5, 40.0).unwrap();

        let crop = preprocessor.crop_region(&image, &bbox);
        assert_eq!(crop.dimensions(), (41, 20));
    }

    #[test]
    fn test_rejects_small_image() {
        let validator = ImageValidator::new();
        let image = DynamicImage::ImageRgb8(RgbImage::new(99, 300));

        assert!(matches!(
            validator.validate(&image),
            Err(OcrError::InvalidImage(_))
        ));
    }

    #[test]
    fn test_blank_image_warnings() {
        let validator = ImageValidator::new();
        let white = DynamicImage::ImageLuma8(GrayImage::from_pixel(200, 200, Luma([255u8])));

        let quality = validator.validate(&white).unwrap();
        assert_eq!(
            quality.warnings,
            vec![
                QualityWarning::MostlyBlank,
                QualityWarning::LowContrast,
                QualityWarning::Blurry
            ]
        );
    }

    #[test]
    fn test_sharp_image_has_no_warnings() {
        let validator = ImageValidator::new();
        let quality = validator.validate(&checkerboard(200, 200, 10)).unwrap();

        assert!(quality.warnings.is_empty());
        assert!((quality.mean - 127.5).abs() < 1.0);
        assert!(quality.laplacian_variance > 100.0);
    }
}
