//! Text region detection using a PaddleOCR DB model.

use image::DynamicImage;
use ndarray::ArrayD;
use tracing::debug;

use crate::error::OcrError;
use crate::models::config::OcrConfig;
use hoadon_inference::{InferenceBackend, InputTensor};

use super::RegionDetector;
use super::geometry::RegionCoords;
use super::preprocessing::ImagePreprocessor;

/// Smallest connected component kept as a text region, in map pixels.
const MIN_COMPONENT_PIXELS: usize = 10;

/// Text detector using PaddleOCR DB model.
pub struct DbTextDetector<B: InferenceBackend> {
    backend: B,
    preprocessor: ImagePreprocessor,
    threshold: f32,
    box_threshold: f32,
    unclip_ratio: f32,
}

/// One detected region with its mean probability.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub coords: RegionCoords,
    pub score: f32,
}

impl<B: InferenceBackend> DbTextDetector<B> {
    /// Create a new text detector with the given backend.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            preprocessor: ImagePreprocessor::new(),
            threshold: 0.3,
            box_threshold: 0.6,
            unclip_ratio: 1.5,
        }
    }

    /// Apply thresholds and input size from config.
    pub fn with_config(mut self, config: &OcrConfig) -> Self {
        self.threshold = config.detection_threshold;
        self.box_threshold = config.box_threshold;
        self.unclip_ratio = config.unclip_ratio;
        self.preprocessor = self.preprocessor.with_detection_size(config.detection_size);
        self
    }

    /// Detect text regions with their scores.
    pub fn detect_with_scores(&self, image: &DynamicImage) -> Result<Vec<Detection>, OcrError> {
        let (tensor, scale_x, scale_y, orig_size) =
            self.preprocessor.preprocess_for_detection(image)?;

        debug!(
            "Detection input shape: {:?}, scales: ({}, {})",
            tensor.shape(),
            scale_x,
            scale_y
        );

        let output = self
            .backend
            .run_single(InputTensor::Float32(tensor.into_dyn()))
            .and_then(|t| t.into_f32())
            .map_err(|e| OcrError::Detection(e.to_string()))?;

        debug!("Detection output shape: {:?}", output.shape());

        let detections = self.post_process(&output, scale_x, scale_y, orig_size)?;
        debug!("Detected {} text regions", detections.len());

        Ok(detections)
    }

    fn post_process(
        &self,
        output: &ArrayD<f32>,
        scale_x: f32,
        scale_y: f32,
        orig_size: (u32, u32),
    ) -> Result<Vec<Detection>, OcrError> {
        // Probability map of shape [1, 1, H, W]
        let shape = output.shape();
        if shape.len() != 4 || shape[0] == 0 || shape[1] == 0 {
            return Err(OcrError::Detection(format!(
                "invalid output shape: {:?}",
                shape
            )));
        }

        let height = shape[2];
        let width = shape[3];

        let mut prob_map = vec![0.0f32; width * height];
        for y in 0..height {
            for x in 0..width {
                prob_map[y * width + x] = output[[0, 0, y, x]];
            }
        }
        let binary: Vec<bool> = prob_map.iter().map(|&p| p > self.threshold).collect();

        let mut detections = Vec::new();

        for component in connected_components(&binary, width, height) {
            let (bbox, score) = self.box_from_component(&component, &prob_map, width);

            if score < self.box_threshold {
                continue;
            }

            let (w, h) = (orig_size.0 as f32, orig_size.1 as f32);
            let coords = [
                (bbox[0] / scale_x).clamp(0.0, w),
                (bbox[1] / scale_y).clamp(0.0, h),
                (bbox[2] / scale_x).clamp(0.0, w),
                (bbox[3] / scale_y).clamp(0.0, h),
            ];

            detections.push(Detection { coords, score });
        }

        Ok(detections)
    }

    fn box_from_component(
        &self,
        component: &[(usize, usize)],
        prob_map: &[f32],
        width: usize,
    ) -> (RegionCoords, f32) {
        let mut min_x = usize::MAX;
        let mut max_x = 0;
        let mut min_y = usize::MAX;
        let mut max_y = 0;
        let mut score_sum = 0.0f32;

        for &(x, y) in component {
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
            score_sum += prob_map[y * width + x];
        }

        let avg_score = score_sum / component.len() as f32;

        // DB shrinks text kernels during training; expand them back
        let w = (max_x - min_x) as f32;
        let h = (max_y - min_y) as f32;
        let expand_x = w * (self.unclip_ratio - 1.0) / 2.0;
        let expand_y = h * (self.unclip_ratio - 1.0) / 2.0;

        let bbox = [
            (min_x as f32 - expand_x).max(0.0),
            (min_y as f32 - expand_y).max(0.0),
            max_x as f32 + expand_x,
            max_y as f32 + expand_y,
        ];

        (bbox, avg_score)
    }
}

impl<B: InferenceBackend> RegionDetector for DbTextDetector<B> {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<RegionCoords>, OcrError> {
        Ok(self
            .detect_with_scores(image)?
            .into_iter()
            .map(|d| d.coords)
            .collect())
    }
}

/// 4-connected components of the binary map, dropping specks.
fn connected_components(binary: &[bool], width: usize, height: usize) -> Vec<Vec<(usize, usize)>> {
    let mut visited = vec![false; width * height];
    let mut components = Vec::new();

    for start in 0..binary.len() {
        if !binary[start] || visited[start] {
            continue;
        }

        let mut component = Vec::new();
        let mut stack = vec![start];
        visited[start] = true;

        while let Some(idx) = stack.pop() {
            let (x, y) = (idx % width, idx / width);
            component.push((x, y));

            let mut neighbors = Vec::with_capacity(4);
            if x > 0 {
                neighbors.push(idx - 1);
            }
            if x + 1 < width {
                neighbors.push(idx + 1);
            }
            if y > 0 {
                neighbors.push(idx - width);
            }
            if y + 1 < height {
                neighbors.push(idx + width);
            }

            for n in neighbors {
                if binary[n] && !visited[n] {
                    visited[n] = true;
                    stack.push(n);
                }
            }
        }

        if component.len() >= MIN_COMPONENT_PIXELS {
            components.push(component);
        }
    }

    components
}
