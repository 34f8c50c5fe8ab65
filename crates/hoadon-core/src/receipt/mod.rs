//! Field extraction from receipt text.
//!
//! Each field has an ordered rule table in [`rules::patterns`]; the first
//! match a field's post-processor accepts wins.

mod parser;
pub mod rules;

pub use parser::ReceiptExtractor;
pub use rules::{FieldExtractor, RuleMatch, find_address, find_date, find_phone, find_total};
