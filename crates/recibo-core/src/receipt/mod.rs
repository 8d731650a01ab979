//! Receipt field extraction module.

mod parser;
pub mod rules;
mod source;

pub use parser::{ExtractionResult, ReceiptParser, RuleReceiptParser};
pub use source::{ReceiptSource, IMAGE_EXTENSIONS, TEXT_EXTENSIONS};

use crate::models::receipt::ReceiptData;

/// Extract receipt fields from OCR text with default settings.
///
/// Never fails: fields that cannot be recovered are `None`, and the date
/// falls back to the current time with `date_detected` unset.
pub fn extract_receipt(text: &str) -> ReceiptData {
    RuleReceiptParser::new().parse(text).receipt
}
