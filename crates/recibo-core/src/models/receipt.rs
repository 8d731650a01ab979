//! Receipt extraction record and the persisted receipt update.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::config::PolicyConfig;
use crate::receipt::rules::AmountPattern;

/// ISO-8601 layout used for every date the engine emits.
pub const ISO_DATETIME: &str = "%Y-%m-%dT%H:%M:%S";

/// Structured fields extracted from one receipt text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptData {
    /// Most probable total amount, two fractional digits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,

    /// Pattern that produced the amount.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_pattern: Option<AmountPattern>,

    /// Transaction date, or the processing time when none was found.
    pub date: NaiveDateTime,

    /// Whether `date` was parsed from the text rather than defaulted.
    pub date_detected: bool,

    /// First plausible merchant line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant: Option<String>,

    /// Confidence score in [0.0, 1.0].
    pub confidence: f32,

    /// Length of the source text in characters.
    pub text_length: usize,
}

impl ReceiptData {
    /// Date formatted as an ISO-8601 string.
    pub fn date_iso(&self) -> String {
        self.date.format(ISO_DATETIME).to_string()
    }

    /// Whether the confidence clears the given threshold.
    pub fn meets_confidence(&self, threshold: f32) -> bool {
        self.confidence >= threshold
    }
}

/// Processing status of a stored receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    Processed,
    Failed,
}

/// Fields written back to a stored receipt after processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptUpdate {
    pub status: ReceiptStatus,

    /// OCR text, truncated for storage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_amount: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_date: Option<String>,

    /// False when `detected_date` is the processing-time fallback.
    pub date_detected: bool,

    /// Set once a draft transaction has been created for the receipt.
    pub has_transaction: bool,
}

impl ReceiptUpdate {
    /// Build the update for a successfully processed receipt.
    pub fn processed(receipt: &ReceiptData, ocr_text: &str, policy: &PolicyConfig) -> Self {
        Self {
            status: ReceiptStatus::Processed,
            ocr_text: Some(truncate_chars(ocr_text, policy.max_ocr_text_chars)),
            detected_amount: receipt.amount,
            detected_date: Some(receipt.date_iso()),
            date_detected: receipt.date_detected,
            has_transaction: false,
        }
    }

    /// Build the update for a receipt whose processing failed.
    pub fn failed() -> Self {
        Self {
            status: ReceiptStatus::Failed,
            ocr_text: None,
            detected_amount: None,
            detected_date: None,
            date_detected: false,
            has_transaction: false,
        }
    }

    /// Mark that a draft transaction was linked to this receipt.
    pub fn with_transaction(mut self) -> Self {
        self.has_transaction = true;
        self
    }
}

/// Truncate to at most `max` characters, respecting UTF-8 boundaries.
pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn sample() -> ReceiptData {
        ReceiptData {
            amount: Some(Decimal::from_str("12.50").unwrap()),
            amount_pattern: Some(AmountPattern::Total),
            date: NaiveDate::from_ymd_opt(2024, 3, 9)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            date_detected: true,
            merchant: Some("CAFE".to_string()),
            confidence: 0.95,
            text_length: 40,
        }
    }

    #[test]
    fn test_date_iso() {
        assert_eq!(sample().date_iso(), "2024-03-09T00:00:00");
    }

    #[test]
    fn test_processed_update_truncates_text() {
        let policy = PolicyConfig {
            max_ocr_text_chars: 5,
            ..PolicyConfig::default()
        };
        let update = ReceiptUpdate::processed(&sample(), "ñandú y más", &policy);

        assert_eq!(update.status, ReceiptStatus::Processed);
        assert_eq!(update.ocr_text.as_deref(), Some("ñandú"));
        assert_eq!(update.detected_date.as_deref(), Some("2024-03-09T00:00:00"));
        assert!(!update.has_transaction);
        assert!(update.with_transaction().has_transaction);
    }

    #[test]
    fn test_failed_update_carries_no_fields() {
        let update = ReceiptUpdate::failed();

        assert_eq!(update.status, ReceiptStatus::Failed);
        assert_eq!(update.ocr_text, None);
        assert_eq!(update.detected_amount, None);
        assert!(!update.date_detected);

        let json = serde_json::to_string(&update).unwrap();
        assert_eq!(
            json,
            r#"{"status":"failed","date_detected":false,"has_transaction":false}"#
        );
    }

    #[test]
    fn test_truncate_chars_short_input() {
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 0), "");
    }
}
