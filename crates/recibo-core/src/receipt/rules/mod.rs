//! Rule-based field extractors for receipts.

pub mod amounts;
pub mod confidence;
pub mod dates;
pub mod merchant;
pub mod numbers;
pub mod patterns;

pub use amounts::{extract_amount, AmountExtractor, AmountPattern, ExtractedAmount};
pub use confidence::{score_confidence, ConfidenceSignals};
pub use dates::{extract_date, spanish_month, DateExtractor, DatePattern, ReceiptDate};
pub use merchant::{extract_merchant, MerchantExtractor};
pub use numbers::normalize_amount;

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from text.
    fn extract(&self, text: &str) -> Option<Self::Output>;

    /// Extract all occurrences of the field.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}

/// Which match of a pattern is used when it matches more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Earliest occurrence in the text.
    First,
    /// Latest occurrence in the text.
    Last,
}

impl Selection {
    /// Pick one item out of the matches of a pattern, in text order.
    pub fn pick<T>(self, matches: impl IntoIterator<Item = T>) -> Option<T> {
        let mut matches = matches.into_iter();
        match self {
            Selection::First => matches.next(),
            Selection::Last => matches.last(),
        }
    }
}

/// Extraction context with confidence scores.
#[derive(Debug, Clone)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,
    /// Position in source text.
    pub position: Option<(usize, usize)>,
    /// Source text that was matched.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, confidence: f32, source: impl Into<String>) -> Self {
        Self {
            value,
            confidence,
            position: None,
            source: source.into(),
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }
}
