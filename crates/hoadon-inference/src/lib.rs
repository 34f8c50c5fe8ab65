//! ONNX inference abstraction layer for hoadon.
//!
//! Model code in `hoadon-core` talks to the [`InferenceBackend`] trait only.
//! The `native` feature provides [`OrtBackend`], ONNX Runtime with the
//! XNNPACK execution provider.

mod backend;
mod error;
mod tensor;

pub use backend::InferenceBackend;
pub use error::InferenceError;
pub use tensor::{InputTensor, OutputTensor, TensorType};

#[cfg(feature = "native")]
pub use backend::ort::{OrtBackend, OrtOptions};

/// Result type for inference operations.
pub type Result<T> = std::result::Result<T, InferenceError>;
