//! Extracted receipt data.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ocr::{ImageQuality, Line};
use crate::receipt::rules::parse_receipt_date;

/// The four receipt fields found in a text, plus the text itself.
///
/// Fields are independent: each is `None` when no rule matched, and no
/// cross-field consistency is checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Date exactly as printed, e.g. `05/10/2023`.
    pub date: Option<String>,
    /// Total normalized to `.` decimal form, e.g. `1234.56`.
    pub total: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    /// Newline-joined line text the fields were extracted from.
    pub raw_text: String,
}

impl ExtractionResult {
    /// The date as a calendar date (day-month-year).
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        self.date.as_deref().and_then(parse_receipt_date)
    }

    /// The total as a decimal amount.
    pub fn total_amount(&self) -> Option<Decimal> {
        self.total.as_deref().and_then(|t| Decimal::from_str(t).ok())
    }

    /// Number of fields found, out of four.
    pub fn found_count(&self) -> usize {
        [&self.date, &self.total, &self.address, &self.phone]
            .iter()
            .filter(|f| f.is_some())
            .count()
    }
}

/// Everything produced for one receipt image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedReceipt {
    pub fields: ExtractionResult,
    /// Reading-order lines, top to bottom.
    pub lines: Vec<Line>,
    /// Detected regions dropped for invalid geometry.
    pub rejected_regions: usize,
    pub quality: ImageQuality,
    /// Size of the image OCR ran on, after any downscaling.
    pub image_size: (u32, u32),
    pub processing_time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_absent_fields_serialize_as_null() {
        let result = ExtractionResult {
            total: Some("50000".to_string()),
            raw_text: "Tổng: 50.000".to_string(),
            ..Default::default()
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "date": null,
                "total": "50000",
                "address": null,
                "phone": null,
                "raw_text": "Tổng: 50.000",
            })
        );
    }

    #[test]
    fn test_typed_accessors() {
        let result = ExtractionResult {
            date: Some("05 tháng 10 năm 2023".to_string()),
            total: Some("1234.56".to_string()),
            phone: Some("0912345678".to_string()),
            ..Default::default()
        };

        assert_eq!(result.parsed_date(), NaiveDate::from_ymd_opt(2023, 10, 5));
        assert_eq!(result.total_amount(), Decimal::from_str("1234.56").ok());
        assert_eq!(result.found_count(), 3);
        assert_eq!(ExtractionResult::default().found_count(), 0);
    }
}
