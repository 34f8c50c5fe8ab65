//! Date extraction for Vietnamese receipts.

use chrono::NaiveDate;

use super::patterns::DATE_RULES;
use super::{FieldExtractor, RuleMatch, first_match, iter_matches};

/// Date field extractor.
pub struct DateExtractor;

impl DateExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for DateExtractor {
    type Output = RuleMatch;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        first_match(&DATE_RULES, text)
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        iter_matches(&DATE_RULES, text).collect()
    }
}

/// First calendar-valid date in the text, exactly as written.
pub fn find_date(text: &str) -> Option<String> {
    DateExtractor.extract(text).map(|m| m.value)
}

/// Parse a day-month-year date as found on receipts.
///
/// Accepts `05/10/2023`, `5-10-23`, `05.10.2023` and the long form
/// `05 tháng 10 năm 2023`. Two-digit years up to 50 are 20xx, the rest 19xx.
pub fn parse_receipt_date(value: &str) -> Option<NaiveDate> {
    let mut parts = value
        .split(|c: char| !c.is_ascii_digit())
        .filter(|p| !p.is_empty());

    let day: u32 = parts.next()?.parse().ok()?;
    let month: u32 = parts.next()?.parse().ok()?;
    let year = parse_year(parts.next()?)?;

    if parts.next().is_some() {
        return None;
    }

    NaiveDate::from_ymd_opt(year, month, day)
}

/// Post-processor for date rules: keep the text if it is a real date.
pub(crate) fn validate_date(value: &str) -> Option<String> {
    parse_receipt_date(value).map(|_| value.to_string())
}

fn parse_year(s: &str) -> Option<i32> {
    let year: i32 = s.parse().ok()?;
    match s.len() {
        2 if year <= 50 => Some(2000 + year),
        2 => Some(1900 + year),
        4 => Some(year),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_labeled_date() {
        assert_eq!(find_date("Ngày: 05/10/2023"), Some("05/10/2023".to_string()));
        assert_eq!(find_date("ngày 1-2-24"), Some("1-2-24".to_string()));
        assert_eq!(find_date("Date: 31.12.2022"), Some("31.12.2022".to_string()));
    }

    #[test]
    fn test_label_beats_earlier_bare_date() {
        let text = "In lúc 01/01/2024\nNgày: 15/03/2024";
        assert_eq!(find_date(text), Some("15/03/2024".to_string()));
    }

    #[test]
    fn test_long_vietnamese_form() {
        let text = "Ngày 05 tháng 10 năm 2023";
        assert_eq!(find_date(text), Some("05 tháng 10 năm 2023".to_string()));
        assert_eq!(
            parse_receipt_date("05 tháng 10 năm 2023"),
            NaiveDate::from_ymd_opt(2023, 10, 5)
        );
    }

    #[test]
    fn test_invalid_calendar_date_skipped() {
        let text = "Ngày: 45/13/2023\nIn lại 06/10/2023";
        assert_eq!(find_date(text), Some("06/10/2023".to_string()));

        assert_eq!(find_date("Ngày: 30/02/2024"), None);
    }

    #[test]
    fn test_bare_date_requires_four_digit_year() {
        assert_eq!(find_date("Mã 12/05/23"), None);
        assert_eq!(find_date("HĐ 12/05/2023 09:30"), Some("12/05/2023".to_string()));
    }

    #[test]
    fn test_two_digit_year_window() {
        assert_eq!(parse_receipt_date("01/01/50"), NaiveDate::from_ymd_opt(2050, 1, 1));
        assert_eq!(parse_receipt_date("01/01/99"), NaiveDate::from_ymd_opt(1999, 1, 1));
        assert_eq!(parse_receipt_date("01/01/202"), None);
    }

    #[test]
    fn test_extract_all_keeps_rule_order() {
        let text = "01/01/2024 Ngày: 02/01/2024";
        let values: Vec<String> = DateExtractor
            .extract_all(text)
            .into_iter()
            .map(|m| m.value)
            .collect();
        assert_eq!(values, vec!["02/01/2024", "01/01/2024", "02/01/2024"]);
    }

    #[test]
    fn test_no_date() {
        assert_eq!(find_date(""), None);
        assert_eq!(find_date("Cảm ơn quý khách"), None);
    }
}
