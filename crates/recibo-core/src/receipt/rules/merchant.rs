//! Merchant name heuristic.

use super::{ExtractionMatch, FieldExtractor};
use crate::models::receipt::truncate_chars;

/// Picks the first line that reads like a name rather than a number or date.
pub struct MerchantExtractor {
    min_chars: usize,
    max_chars: usize,
}

impl MerchantExtractor {
    pub fn new() -> Self {
        Self {
            min_chars: 3,
            max_chars: 200,
        }
    }

    /// A line must be longer than `min_chars` characters after trimming.
    pub fn with_min_chars(mut self, min_chars: usize) -> Self {
        self.min_chars = min_chars;
        self
    }

    /// Names are truncated to `max_chars` characters.
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    fn qualifies(&self, line: &str) -> bool {
        line.chars().count() > self.min_chars && !is_numeric_line(line)
    }
}

impl Default for MerchantExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for MerchantExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results = Vec::new();
        let mut offset = 0;

        for raw_line in text.split_inclusive('\n') {
            let start = offset;
            offset += raw_line.len();

            let line = raw_line.trim();
            if !self.qualifies(line) {
                continue;
            }

            let name = truncate_chars(line, self.max_chars);
            let leading = raw_line.len() - raw_line.trim_start().len();
            results.push(
                ExtractionMatch::new(name, 0.6, line)
                    .with_position(start + leading, start + leading + line.len()),
            );
        }

        results
    }
}

/// Only digits, `.`, `,`, `/`, `-` and whitespace.
fn is_numeric_line(line: &str) -> bool {
    line.chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '/' | '-') || c.is_whitespace())
}

/// Extract the merchant name from receipt text.
pub fn extract_merchant(text: &str) -> Option<String> {
    MerchantExtractor::new().extract(text).map(|m| m.value)
}
