//! Receipt parser running every field extractor over line text.

use tracing::debug;

use crate::models::receipt::ExtractionResult;
use crate::ocr::{Line, join_lines};

use super::rules::{
    AddressExtractor, DateExtractor, FieldExtractor, PhoneExtractor, TotalExtractor,
};

/// Extracts receipt fields from newline-joined text.
pub struct ReceiptExtractor {
    date: DateExtractor,
    total: TotalExtractor,
    address: AddressExtractor,
    phone: PhoneExtractor,
}

impl ReceiptExtractor {
    pub fn new() -> Self {
        Self {
            date: DateExtractor::new(),
            total: TotalExtractor::new(),
            address: AddressExtractor::new(),
            phone: PhoneExtractor::new(),
        }
    }

    /// Run all four extractors. Absent fields are `None`; this never fails.
    pub fn extract(&self, text: &str) -> ExtractionResult {
        let result = ExtractionResult {
            date: self.date.extract(text).map(|m| m.value),
            total: self.total.extract(text).map(|m| m.value),
            address: self.address.extract(text).map(|m| m.value),
            phone: self.phone.extract(text).map(|m| m.value),
            raw_text: text.to_string(),
        };

        debug!(
            "Extracted {}/4 fields from {} chars",
            result.found_count(),
            text.chars().count()
        );

        result
    }

    /// Join lines top to bottom and extract from the result.
    pub fn extract_lines(&self, lines: &[Line]) -> ExtractionResult {
        self.extract(&join_lines(lines))
    }
}

impl Default for ReceiptExtractor {
    fn default() -> Self {
        Self::new()
    }
}
