//! Extraction confidence scoring.

/// Weights are kept in hundredths so that sums are exact.
const AMOUNT_POINTS: u32 = 50;
const DATE_POINTS: u32 = 30;
const MERCHANT_POINTS: u32 = 10;
const LONG_TEXT_POINTS: u32 = 10;
const MEDIUM_TEXT_POINTS: u32 = 5;

const LONG_TEXT: usize = 50;
const MEDIUM_TEXT: usize = 20;

/// Presence signals feeding the confidence score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfidenceSignals {
    /// An amount was extracted.
    pub amount: bool,
    /// A date was parsed from the text (not the fallback).
    pub date_detected: bool,
    /// A merchant was extracted.
    pub merchant: bool,
    /// Source text length in characters.
    pub text_length: usize,
}

/// Weighted score in [0.0, 1.0]: amount 0.5, detected date 0.3, merchant
/// 0.1, and 0.1 for text longer than 50 characters (0.05 above 20).
pub fn score_confidence(signals: &ConfidenceSignals) -> f32 {
    let mut points = 0;

    if signals.amount {
        points += AMOUNT_POINTS;
    }
    if signals.date_detected {
        points += DATE_POINTS;
    }
    if signals.merchant {
        points += MERCHANT_POINTS;
    }

    // Text length is a rough proxy for OCR quality.
    if signals.text_length > LONG_TEXT {
        points += LONG_TEXT_POINTS;
    } else if signals.text_length > MEDIUM_TEXT {
        points += MEDIUM_TEXT_POINTS;
    }

    points.min(100) as f32 / 100.0
}
