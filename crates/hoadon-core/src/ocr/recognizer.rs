//! Text recognition using a PaddleOCR CTC recognition model.

use std::path::Path;

use image::DynamicImage;
use ndarray::ArrayD;
use tracing::{debug, trace};

use crate::error::OcrError;
use hoadon_inference::{InferenceBackend, InputTensor};

use super::TextRecognizer;
use super::preprocessing::ImagePreprocessor;

/// CTC blank, always at index 0 of a dictionary.
const BLANK: char = ' ';

/// Text recognizer using a CRNN/SVTR model with greedy CTC decoding.
pub struct CtcTextRecognizer<B: InferenceBackend> {
    backend: B,
    preprocessor: ImagePreprocessor,
    dictionary: Vec<char>,
}

impl<B: InferenceBackend> CtcTextRecognizer<B> {
    /// Create a new text recognizer.
    ///
    /// `dictionary[0]` is the CTC blank; see [`load_dictionary`].
    pub fn new(backend: B, dictionary: Vec<char>) -> Self {
        Self {
            backend,
            preprocessor: ImagePreprocessor::new(),
            dictionary,
        }
    }

    fn decode_output(&self, output: &ArrayD<f32>) -> Result<String, OcrError> {
        // Output shape is [1, T, num_classes] where T is sequence length
        let shape = output.shape();
        if shape.len() != 3 || shape[0] == 0 {
            return Err(OcrError::Recognition(format!(
                "invalid output shape: {:?}",
                shape
            )));
        }

        let seq_len = shape[1];
        let num_classes = shape[2];

        let mut text = String::new();
        let mut prev_idx = 0usize;

        for t in 0..seq_len {
            let mut max_idx = 0;
            let mut max_val = f32::NEG_INFINITY;

            for c in 0..num_classes {
                let val = output[[0, t, c]];
                if val > max_val {
                    max_val = val;
                    max_idx = c;
                }
            }

            if max_idx != 0 && max_idx != prev_idx {
                match self.dictionary.get(max_idx) {
                    Some(&c) => text.push(c),
                    None => trace!("Class {} outside dictionary, skipped", max_idx),
                }
            }

            prev_idx = max_idx;
        }

        let text = text.trim().to_string();
        trace!("Recognized: '{}'", text);
        Ok(text)
    }
}

impl<B: InferenceBackend> TextRecognizer for CtcTextRecognizer<B> {
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError> {
        let tensor = self.preprocessor.preprocess_for_recognition(image)?;

        let output = self
            .backend
            .run_single(InputTensor::Float32(tensor.into_dyn()))
            .and_then(|t| t.into_f32())
            .map_err(|e| OcrError::Recognition(e.to_string()))?;

        self.decode_output(&output)
    }
}

/// Load a PaddleOCR dictionary file: one character per line.
///
/// The blank is prepended and a trailing space class appended, matching
/// how Paddle recognition heads are exported.
pub fn load_dictionary(path: &Path) -> Result<Vec<char>, OcrError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| OcrError::ModelLoad(format!("failed to load dictionary: {}", e)))?;

    let chars = dictionary_from_str(&content);
    debug!("Loaded dictionary with {} characters", chars.len());
    Ok(chars)
}

fn dictionary_from_str(content: &str) -> Vec<char> {
    let mut chars = vec![BLANK];
    chars.extend(content.lines().filter_map(|line| line.chars().next()));
    chars.push(' ');
    chars
}

/// Built-in Vietnamese character set, used when no dictionary file exists.
pub fn default_vietnamese_dictionary() -> Vec<char> {
    let mut chars = vec![BLANK];

    chars.extend('0'..='9');
    chars.extend('A'..='Z');
    chars.extend('a'..='z');

    // Base vowels with each of the five tone marks, both cases
    const TONED: &str = "àáảãạăằắẳẵặâầấẩẫậèéẻẽẹêềếểễệìíỉĩịòóỏõọôồốổỗộơờớởỡợùúủũụưừứửữựỳýỷỹỵđ";
    for c in TONED.chars() {
        chars.push(c);
        chars.extend(c.to_uppercase());
    }

    chars.extend([
        '.', ',', ';', ':', '!', '?', '-', '_', '/', '\\', '(', ')', '[', ']', '<', '>', '@', '#',
        '$', '%', '&', '*', '+', '=', '\'', '"',
    ]);

    chars.extend(['₫', '€', '°']);
    chars.push(' ');

    chars
}
