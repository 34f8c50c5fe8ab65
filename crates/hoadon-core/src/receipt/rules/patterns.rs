//! Regex and keyword tables for Vietnamese receipt extraction.
//!
//! Each list is ordered: earlier entries are tried first.

use lazy_static::lazy_static;
use regex::Regex;

use super::PatternRule;
use super::dates::validate_date;
use super::totals::normalize_amount;

/// Day, month, year separated by `-`, `/` or `.`.
const DMY: &str = r"\d{1,2}[-/.]\d{1,2}[-/.]";

lazy_static! {
    pub static ref DATE_RULES: Vec<PatternRule> = vec![
        PatternRule::new(
            "labeled_ngay",
            Regex::new(&format!(r"(?i)Ngày[:\s]*({DMY}\d{{2,4}})")).unwrap(),
            validate_date,
        ),
        PatternRule::new(
            "labeled_date",
            Regex::new(&format!(r"(?i)Date[:\s]*({DMY}\d{{2,4}})")).unwrap(),
            validate_date,
        ),
        // "Ngày 05 tháng 10 năm 2023", common on printed VAT invoices
        PatternRule::new(
            "long_form",
            Regex::new(r"(?i)(?:Ngày[:\s]*)?(\d{1,2}\s+tháng\s+\d{1,2}\s+năm\s+\d{4})").unwrap(),
            validate_date,
        ),
        PatternRule::new(
            "bare",
            Regex::new(&format!(r"({DMY}\d{{4}})")).unwrap(),
            validate_date,
        ),
    ];

    pub static ref TOTAL_RULES: Vec<PatternRule> = {
        let labels = [
            ("tong_cong", "Tổng cộng"),
            ("tong_tien", "Tổng tiền"),
            ("tong_so_tien", "Tổng số tiền"),
            ("tong_thanh_toan", "Tổng thanh toán"),
            ("tong", "Tổng"),
            ("total", "Total"),
            ("thanh_tien", "Thành tiền"),
        ];

        let mut rules: Vec<PatternRule> = labels
            .iter()
            .map(|&(name, label)| {
                PatternRule::new(
                    name,
                    Regex::new(&format!(r"(?i){label}[:\s]*([\d.,]+)")).unwrap(),
                    normalize_amount,
                )
            })
            .collect();

        rules.push(PatternRule::new(
            "currency_suffix",
            Regex::new(r"(?i)([\d.,]+)\s*(?:VND\b|₫|đ\b)").unwrap(),
            normalize_amount,
        ));

        // OCR misreads of "Tổng tiền": lost diacritics, 0 for o, n/m swaps
        rules.push(PatternRule::new(
            "fuzzy_tong_tien",
            Regex::new(r"(?i)T[oôơ0]ng\s*t[iíìîï]e[nm][: ]*([\d.,]+)").unwrap(),
            normalize_amount,
        ));

        rules
    };

    pub static ref PHONE_RULES: Vec<PatternRule> = vec![
        PatternRule::new(
            "labeled",
            Regex::new(r"(?i)(?:SĐT|Tel|Phone|Hotline|Điện thoại)[\s:]*(\d{9,11})").unwrap(),
            accept,
        ),
        // Whole digit runs, so a number inside a longer run never matches
        PatternRule::new("mobile", Regex::new(r"(\+?\d+)").unwrap(), mobile_number),
    ];

    /// Mobile carrier prefixes: `+84` or `0`, carrier code, 7 digits.
    static ref MOBILE_SHAPE: Regex =
        Regex::new(r"^(?:\+84|0)(?:3[2-9]|5[689]|7[06-9]|8[1-689]|9[0-46-9])\d{7}$").unwrap();
}

/// Line prefixes that mark an address.
pub const ADDRESS_LABELS: &[&str] = &[
    "Địa chỉ",
    "Address",
    "DC:",
    "Đ/c:",
    "Chi nhánh",
    "Văn phòng",
    "Trụ sở",
    "Khu vực",
    "TP.",
    "Q.",
];

/// Administrative and street words; two of them suggest an address line.
pub const LOCATION_WORDS: &[&str] = &[
    "Phường",
    "Quận",
    "Huyện",
    "Tỉnh",
    "Thành phố",
    "Đường",
    "Phố",
    "Ngõ",
    "Khu",
    "Số",
];

/// Words that disqualify a line from being an unlabeled address.
pub const ADDRESS_EXCLUDES: &[&str] = &["tổng", "total", "ngày", "date", "số lượng", "giá", "mã"];

fn accept(value: &str) -> Option<String> {
    Some(value.to_string())
}

fn mobile_number(value: &str) -> Option<String> {
    MOBILE_SHAPE.is_match(value).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_compile_in_order() {
        let names: Vec<&str> = DATE_RULES.iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["labeled_ngay", "labeled_date", "long_form", "bare"]);

        assert_eq!(TOTAL_RULES.len(), 9);
        assert_eq!(TOTAL_RULES[3].name, "tong_thanh_toan");
        assert_eq!(TOTAL_RULES[8].name, "fuzzy_tong_tien");

        assert_eq!(PHONE_RULES.len(), 2);
    }

    #[test]
    fn test_mobile_prefixes() {
        for number in ["0912345678", "0321234567", "0861234567", "+84987654321"] {
            assert!(mobile_number(number).is_some(), "{} should match", number);
        }
        for number in ["0112345678", "0951234567", "0871234567", "09123456789", "84912345678"] {
            assert!(mobile_number(number).is_none(), "{} should not match", number);
        }
    }
}
