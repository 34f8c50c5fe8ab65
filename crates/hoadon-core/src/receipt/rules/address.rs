//! Address extraction.
//!
//! Addresses have no fixed shape, so this works line by line: first a
//! labeled line (`Địa chỉ: ...`), then an unlabeled line that reads like a
//! Vietnamese street address.

use super::patterns::{ADDRESS_EXCLUDES, ADDRESS_LABELS, LOCATION_WORDS};
use super::{FieldExtractor, RuleMatch};

/// Minimum length of a labeled address, exclusive.
const MIN_LABELED_CHARS: usize = 10;

/// Length bounds of an unlabeled address line, inclusive.
const UNLABELED_CHARS: std::ops::RangeInclusive<usize> = 10..=100;

/// Location words an unlabeled line must contain.
const MIN_LOCATION_WORDS: usize = 2;

/// Address field extractor.
pub struct AddressExtractor;

impl AddressExtractor {
    pub fn new() -> Self {
        Self
    }

    fn labeled(text: &str) -> impl Iterator<Item = RuleMatch> + '_ {
        text.lines().filter_map(move |line| {
            let line = line.trim();
            let rest = ADDRESS_LABELS
                .iter()
                .find_map(|label| strip_prefix_ignore_case(line, label))?;

            let address = rest.trim_matches(':').trim();
            (address.chars().count() > MIN_LABELED_CHARS).then(|| RuleMatch {
                value: address.to_string(),
                rule: "labeled",
                position: span_of(text, address),
                source: line.to_string(),
            })
        })
    }

    fn unlabeled(text: &str) -> impl Iterator<Item = RuleMatch> + '_ {
        text.lines().filter_map(move |line| {
            let line = line.trim();
            looks_like_address(line).then(|| RuleMatch {
                value: line.to_string(),
                rule: "location_words",
                position: span_of(text, line),
                source: line.to_string(),
            })
        })
    }
}

impl Default for AddressExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for AddressExtractor {
    type Output = RuleMatch;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        Self::labeled(text).next().or_else(|| Self::unlabeled(text).next())
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        Self::labeled(text).chain(Self::unlabeled(text)).collect()
    }
}

/// First labeled address, else the first line shaped like an address.
pub fn find_address(text: &str) -> Option<String> {
    AddressExtractor.extract(text).map(|m| m.value)
}

fn looks_like_address(line: &str) -> bool {
    if !UNLABELED_CHARS.contains(&line.chars().count()) {
        return false;
    }

    let lower = line.to_lowercase();
    let location_words = LOCATION_WORDS
        .iter()
        .filter(|w| lower.contains(&w.to_lowercase()))
        .count();

    location_words >= MIN_LOCATION_WORDS
        && line.chars().any(|c| c.is_ascii_digit())
        && line.contains(',')
        && !ADDRESS_EXCLUDES.iter().any(|w| lower.contains(w))
}

/// `line` minus `prefix` when it starts with it, ignoring case.
fn strip_prefix_ignore_case<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let split = line
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(line.len()))
        .nth(prefix.chars().count())?;

    let (head, rest) = line.split_at(split);
    (head.to_lowercase() == prefix.to_lowercase()).then_some(rest)
}

/// Byte span of `part`, a subslice of `text`.
fn span_of(text: &str, part: &str) -> (usize, usize) {
    let start = part.as_ptr() as usize - text.as_ptr() as usize;
    (start, start + part.len())
}
