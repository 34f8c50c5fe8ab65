//! Rule-based field extractors for Vietnamese receipts.

pub mod address;
pub mod dates;
pub mod patterns;
pub mod phone;
pub mod totals;

pub use address::{AddressExtractor, find_address};
pub use dates::{DateExtractor, find_date, parse_receipt_date};
pub use phone::{PhoneExtractor, find_phone};
pub use totals::{TotalExtractor, find_total, normalize_amount};

use regex::Regex;

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the first accepted occurrence of the field.
    fn extract(&self, text: &str) -> Option<Self::Output>;

    /// Extract all accepted occurrences, in rule order.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}

/// One entry of an ordered rule table.
pub struct PatternRule {
    pub name: &'static str,
    pub regex: Regex,
    /// Capture group holding the value.
    pub group: usize,
    /// Validates and normalizes a captured value; `None` rejects the match.
    pub post: fn(&str) -> Option<String>,
}

impl PatternRule {
    pub fn new(name: &'static str, regex: Regex, post: fn(&str) -> Option<String>) -> Self {
        Self {
            name,
            regex,
            group: 1,
            post,
        }
    }
}

/// A value accepted by a rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    /// Post-processed value.
    pub value: String,
    /// Name of the rule that produced it.
    pub rule: &'static str,
    /// Byte span of the captured text.
    pub position: (usize, usize),
    /// Captured text before post-processing.
    pub source: String,
}

/// Accepted matches, lazily: rules in order, matches left to right within
/// a rule.
pub fn iter_matches<'a>(
    rules: &'a [PatternRule],
    text: &'a str,
) -> impl Iterator<Item = RuleMatch> + 'a {
    rules.iter().flat_map(move |rule| {
        rule.regex.captures_iter(text).filter_map(move |caps| {
            let m = caps.get(rule.group)?;
            let value = (rule.post)(m.as_str())?;
            Some(RuleMatch {
                value,
                rule: rule.name,
                position: (m.start(), m.end()),
                source: m.as_str().to_string(),
            })
        })
    })
}

/// The first accepted match; later rules are not scanned.
pub fn first_match(rules: &[PatternRule], text: &str) -> Option<RuleMatch> {
    iter_matches(rules, text).next()
}
