//! Inference backend implementations.

#[cfg(feature = "native")]
pub mod ort;

use crate::{InputTensor, OutputTensor, Result};

/// Trait for ONNX inference backends.
///
/// Implementations must be shareable across threads: one loaded model is
/// reused by every request the process handles.
pub trait InferenceBackend: Send + Sync {
    /// Run inference with the given named inputs.
    ///
    /// Outputs are returned in model order together with their names.
    fn run(&self, inputs: &[(&str, InputTensor)]) -> Result<Vec<(String, OutputTensor)>>;

    /// Get the input names expected by the model.
    fn input_names(&self) -> &[String];

    /// Get the output names produced by the model.
    fn output_names(&self) -> &[String];

    /// Run a single-input model and return its first output.
    ///
    /// PaddleOCR detection and recognition graphs both take one image
    /// tensor and return one tensor, so this is what the OCR stages use.
    fn run_single(&self, input: InputTensor) -> Result<OutputTensor> {
        let name = self
            .input_names()
            .first()
            .cloned()
            .unwrap_or_else(|| "x".to_string());

        self.run(&[(name.as_str(), input)])?
            .into_iter()
            .next()
            .map(|(_, tensor)| tensor)
            .ok_or_else(|| crate::InferenceError::MissingOutput("<first>".to_string()))
    }
}
