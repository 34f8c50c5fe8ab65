//! Phone number extraction.

use super::patterns::PHONE_RULES;
use super::{FieldExtractor, RuleMatch, first_match, iter_matches};

/// Phone number extractor: labeled numbers first, then bare mobiles.
pub struct PhoneExtractor;

impl PhoneExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PhoneExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for PhoneExtractor {
    type Output = RuleMatch;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        first_match(&PHONE_RULES, text)
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        iter_matches(&PHONE_RULES, text).collect()
    }
}

pub fn find_phone(text: &str) -> Option<String> {
    PhoneExtractor.extract(text).map(|m| m.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_labeled_phone() {
        assert_eq!(find_phone("Hotline: 0912345678"), Some("0912345678".to_string()));
        assert_eq!(find_phone("SĐT:02838123456"), Some("02838123456".to_string()));
        assert_eq!(find_phone("tel 028381234"), Some("028381234".to_string()));
        assert_eq!(
            find_phone("Điện thoại: 0243123456"),
            Some("0243123456".to_string())
        );
    }

    #[test]
    fn test_bare_mobile() {
        let text = "CỬA HÀNG ABC\nLiên hệ 0987654321 để đặt hàng";
        assert_eq!(find_phone(text), Some("0987654321".to_string()));
        assert_eq!(find_phone("+84912345678"), Some("+84912345678".to_string()));
    }

    #[test]
    fn test_labeled_beats_bare() {
        let text = "Zalo 0987654321\nHotline: 19001234567";
        assert_eq!(find_phone(text), Some("19001234567".to_string()));
    }

    #[test]
    fn test_mobile_not_inside_longer_number() {
        assert_eq!(find_phone("Mã GD 109123456789"), None);
        assert_eq!(find_phone("STK 0912345678901"), None);
    }

    #[test]
    fn test_extract_all_adjacent_mobiles() {
        let numbers: Vec<String> = PhoneExtractor::new()
            .extract_all("0912345678 0987654321,0321234567")
            .into_iter()
            .map(|m| m.value)
            .collect();

        assert_eq!(numbers, vec!["0912345678", "0987654321", "0321234567"]);
    }

    #[test]
    fn test_unknown_prefix_rejected() {
        assert_eq!(find_phone("0112345678"), None);
        assert_eq!(find_phone(""), None);
    }
}
