//! Total amount extraction.

use std::str::FromStr;

use rust_decimal::Decimal;

use super::patterns::TOTAL_RULES;
use super::{FieldExtractor, RuleMatch, first_match, iter_matches};

/// Total amount extractor.
pub struct TotalExtractor;

impl TotalExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TotalExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for TotalExtractor {
    type Output = RuleMatch;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        first_match(&TOTAL_RULES, text)
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        iter_matches(&TOTAL_RULES, text).collect()
    }
}

/// First labeled or currency-marked total, normalized to `1234.56` form.
pub fn find_total(text: &str) -> Option<String> {
    TotalExtractor.extract(text).map(|m| m.value)
}

/// Vietnamese number convention: `.` groups thousands, `,` is the decimal
/// mark. Returns `None` unless the result is a valid decimal number.
pub fn normalize_amount(value: &str) -> Option<String> {
    let cleaned = value.replace('.', "").replace(',', ".");
    if !cleaned.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    Decimal::from_str(&cleaned).ok().map(|_| cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_amount() {
        assert_eq!(normalize_amount("1.234,56"), Some("1234.56".to_string()));
        assert_eq!(normalize_amount("50.000"), Some("50000".to_string()));
        assert_eq!(normalize_amount("120000"), Some("120000".to_string()));
        assert_eq!(normalize_amount(","), None);
        assert_eq!(normalize_amount("..."), None);
        assert_eq!(normalize_amount("1,2,3"), None);
    }

    #[test]
    fn test_specific_label_wins() {
        assert_eq!(
            find_total("Tổng thanh toán: 1.234,56 VND"),
            Some("1234.56".to_string())
        );

        let text = "Thành tiền: 30.000\nTổng cộng: 45.000";
        assert_eq!(find_total(text), Some("45000".to_string()));
    }

    #[test]
    fn test_case_insensitive_labels() {
        assert_eq!(find_total("TỔNG CỘNG 99.000"), Some("99000".to_string()));
        assert_eq!(find_total("TOTAL: 12,50"), Some("12.50".to_string()));
    }

    #[test]
    fn test_currency_suffix() {
        assert_eq!(find_total("Cà phê sữa 25.000đ"), Some("25000".to_string()));
        assert_eq!(find_total("35.000 ₫"), Some("35000".to_string()));
        assert_eq!(find_total("Tiền hàng 40.000 vnd."), Some("40000".to_string()));
    }

    #[test]
    fn test_currency_suffix_needs_whole_word() {
        assert_eq!(find_total("Số 12 Đường Lê Lợi"), None);
        assert_eq!(find_total("Giao 3 đơn"), None);
    }

    #[test]
    fn test_fuzzy_misread_label() {
        assert_eq!(find_total("T0ng tiem: 80.000"), Some("80000".to_string()));
    }

    #[test]
    fn test_unparsable_amount_skipped() {
        assert_eq!(find_total("Tổng: ,"), None);
        assert_eq!(find_total("Tổng: , \nTổng: 70.000"), Some("70000".to_string()));
    }

    #[test]
    fn test_no_total() {
        assert_eq!(find_total(""), None);
        assert_eq!(find_total("Xin cảm ơn"), None);
    }
}
