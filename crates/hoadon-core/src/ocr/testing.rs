//! Stand-ins for models, shared by the OCR and pipeline tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use image::DynamicImage;
use ndarray::ArrayD;

use crate::error::OcrError;
use hoadon_inference::{InferenceBackend, InputTensor, OutputTensor};

use super::geometry::RegionCoords;
use super::{RegionDetector, TextRecognizer};

/// Backend that ignores its input and returns a fixed tensor.
pub struct StubBackend {
    output: ArrayD<f32>,
    inputs: Vec<String>,
    outputs: Vec<String>,
}

impl StubBackend {
    pub fn new(output: ArrayD<f32>) -> Self {
        Self {
            output,
            inputs: vec!["x".to_string()],
            outputs: vec!["out".to_string()],
        }
    }
}

impl InferenceBackend for StubBackend {
    fn run(
        &self,
        _inputs: &[(&str, InputTensor)],
    ) -> hoadon_inference::Result<Vec<(String, OutputTensor)>> {
        Ok(vec![(
            self.outputs[0].clone(),
            OutputTensor::Float32(self.output.clone()),
        )])
    }

    fn input_names(&self) -> &[String] {
        &self.inputs
    }

    fn output_names(&self) -> &[String] {
        &self.outputs
    }
}

/// Detector returning a fixed list of regions.
pub struct StubDetector(pub Vec<RegionCoords>);

impl RegionDetector for StubDetector {
    fn detect(&self, _image: &DynamicImage) -> Result<Vec<RegionCoords>, OcrError> {
        Ok(self.0.clone())
    }
}

/// Recognizer handing out texts in call order.
pub struct StubRecognizer {
    texts: Mutex<VecDeque<String>>,
    fail: bool,
}

impl StubRecognizer {
    pub fn new(texts: &[&str]) -> Self {
        Self {
            texts: Mutex::new(texts.iter().map(|t| t.to_string()).collect()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            texts: Mutex::new(VecDeque::new()),
            fail: true,
        }
    }
}

impl TextRecognizer for StubRecognizer {
    fn recognize(&self, _image: &DynamicImage) -> Result<String, OcrError> {
        if self.fail {
            return Err(OcrError::Recognition("stub failure".to_string()));
        }
        let mut texts = self.texts.lock().unwrap();
        Ok(texts.pop_front().unwrap_or_default())
    }
}
