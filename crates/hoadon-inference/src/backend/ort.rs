//! ONNX Runtime (ort) backend for native platforms with XNNPACK.

use std::path::Path;
use std::sync::Mutex;

use ndarray::{ArrayD, IxDyn};
use ort::ep::XNNPACK;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::{Session, SessionInputValue};
use ort::value::Tensor;
use tracing::debug;

use crate::error::InferenceError;
use crate::tensor::{InputTensor, OutputTensor};
use crate::{InferenceBackend, Result};

/// Session options for [`OrtBackend`].
#[derive(Debug, Clone)]
pub struct OrtOptions {
    /// Intra-op thread count.
    pub intra_threads: usize,
    /// Register the XNNPACK execution provider.
    pub use_xnnpack: bool,
}

impl Default for OrtOptions {
    fn default() -> Self {
        Self {
            intra_threads: 4,
            use_xnnpack: true,
        }
    }
}

/// Backend using ONNX Runtime for native inference.
///
/// `Session::run` takes `&mut self`, so the session sits behind a mutex;
/// concurrent requests serialize on each model, not on the whole pipeline.
pub struct OrtBackend {
    session: Mutex<Session>,
    input_names: Vec<String>,
    output_names: Vec<String>,
}

impl OrtBackend {
    /// Load a model from a file path.
    pub fn from_file<P: AsRef<Path>>(path: P, options: &OrtOptions) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading ONNX model from: {}", path.display());

        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes, options)
    }

    /// Load a model from bytes.
    pub fn from_bytes(bytes: &[u8], options: &OrtOptions) -> Result<Self> {
        debug!(
            "Loading ONNX model from {} bytes ({} threads, xnnpack: {})",
            bytes.len(),
            options.intra_threads,
            options.use_xnnpack
        );

        let mut builder =
            Session::builder().map_err(|e| InferenceError::SessionCreate(e.to_string()))?;
        if options.use_xnnpack {
            builder = builder
                .with_execution_providers([XNNPACK::default().build()])
                .map_err(|e| InferenceError::SessionCreate(e.to_string()))?;
        }

        let session = builder
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| InferenceError::SessionCreate(e.to_string()))?
            .with_intra_threads(options.intra_threads.max(1))
            .map_err(|e| InferenceError::SessionCreate(e.to_string()))?
            .commit_from_memory(bytes)
            .map_err(|e| InferenceError::ModelLoad(e.to_string()))?;

        let input_names: Vec<String> = session
            .inputs()
            .iter()
            .map(|i| i.name().to_string())
            .collect();

        let output_names: Vec<String> = session
            .outputs()
            .iter()
            .map(|o| o.name().to_string())
            .collect();

        debug!("Model inputs: {:?}, outputs: {:?}", input_names, output_names);

        Ok(Self {
            session: Mutex::new(session),
            input_names,
            output_names,
        })
    }

    fn convert_input(tensor: &InputTensor) -> Result<SessionInputValue<'static>> {
        let shape: Vec<i64> = tensor.shape().iter().map(|&s| s as i64).collect();
        let converted = match tensor {
            InputTensor::Float32(arr) => {
                Tensor::from_array((shape, arr.iter().copied().collect::<Vec<f32>>()))
                    .map(Into::into)
            }
            InputTensor::Int64(arr) => {
                Tensor::from_array((shape, arr.iter().copied().collect::<Vec<i64>>()))
                    .map(Into::into)
            }
        };
        converted.map_err(|e| InferenceError::InvalidInput(e.to_string()))
    }
}

fn to_array<T: Clone>(dims: Vec<usize>, data: &[T]) -> Result<ArrayD<T>> {
    ArrayD::from_shape_vec(IxDyn(&dims), data.to_vec())
        .map_err(|e| InferenceError::OutputExtraction(e.to_string()))
}

impl InferenceBackend for OrtBackend {
    fn run(&self, inputs: &[(&str, InputTensor)]) -> Result<Vec<(String, OutputTensor)>> {
        let ort_inputs = inputs
            .iter()
            .map(|(name, tensor)| Ok((*name, Self::convert_input(tensor)?)))
            .collect::<Result<Vec<_>>>()?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| InferenceError::InferenceFailed(format!("session lock poisoned: {}", e)))?;

        let outputs = session
            .run(ort_inputs)
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        let mut results = Vec::with_capacity(outputs.len());

        for (name, value) in outputs.iter() {
            let tensor = if let Ok((shape, data)) = value.try_extract_tensor::<f32>() {
                let dims = shape.iter().map(|&s| s as usize).collect();
                OutputTensor::Float32(to_array(dims, data)?)
            } else if let Ok((shape, data)) = value.try_extract_tensor::<i64>() {
                let dims = shape.iter().map(|&s| s as usize).collect();
                OutputTensor::Int64(to_array(dims, data)?)
            } else {
                return Err(InferenceError::OutputExtraction(format!(
                    "unsupported output type for '{}'",
                    name
                )));
            };

            results.push((name.to_string(), tensor));
        }

        Ok(results)
    }

    fn input_names(&self) -> &[String] {
        &self.input_names
    }

    fn output_names(&self) -> &[String] {
        &self.output_names
    }
}
