//! Configuration and result models.

pub mod config;
pub mod receipt;

pub use config::HoadonConfig;
pub use receipt::{ExtractionResult, ProcessedReceipt};
