//! Rule-based receipt parser combining the field extractors.

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, info};

use crate::models::config::ExtractionConfig;
use crate::models::receipt::ReceiptData;
use crate::ocr::{OcrOutcome, OcrStage};

use super::rules::{
    score_confidence, AmountExtractor, ConfidenceSignals, DateExtractor, FieldExtractor,
    MerchantExtractor,
};

/// Result of receipt extraction.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    /// Extracted receipt data.
    pub receipt: ReceiptData,
    /// Raw extracted text.
    pub raw_text: String,
    /// OCR ladder step that produced `raw_text`, for image input.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_stage: Option<OcrStage>,
    /// Extraction warnings.
    pub warnings: Vec<String>,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Trait for receipt parsing.
///
/// Parsing never fails; missing fields are reported through the optional
/// fields of [`ReceiptData`] and the warning list.
pub trait ReceiptParser {
    /// Parse receipt fields from text.
    fn parse(&self, text: &str) -> ExtractionResult;

    /// Parse the text produced by the OCR ladder.
    fn parse_ocr(&self, outcome: &OcrOutcome) -> ExtractionResult {
        let mut result = self.parse(&outcome.text);
        result.ocr_stage = Some(outcome.stage);
        if outcome.stage != OcrStage::Primary {
            result
                .warnings
                .push(format!("OCR text came from the {} fallback", outcome.stage));
        }
        result
    }
}

/// Receipt parser built from the rule-based field extractors.
pub struct RuleReceiptParser {
    amounts: AmountExtractor,
    dates: DateExtractor,
    merchant: MerchantExtractor,
}

impl RuleReceiptParser {
    /// Create a parser with default settings.
    pub fn new() -> Self {
        Self {
            amounts: AmountExtractor::new(),
            dates: DateExtractor::new(),
            merchant: MerchantExtractor::new(),
        }
    }

    /// Create a parser from extraction configuration.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            amounts: AmountExtractor::new().with_range(config.min_amount, config.max_amount),
            dates: DateExtractor::new().with_earliest(config.earliest_date),
            merchant: MerchantExtractor::new()
                .with_min_chars(config.merchant_min_chars)
                .with_max_chars(config.merchant_max_chars),
        }
    }

    /// Pin the reference time used for date range checks and the fallback.
    pub fn at(mut self, now: NaiveDateTime) -> Self {
        self.dates = self.dates.at(now);
        self
    }
}

impl Default for RuleReceiptParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ReceiptParser for RuleReceiptParser {
    fn parse(&self, text: &str) -> ExtractionResult {
        let timer = Timer::start();
        let mut warnings = Vec::new();
        let text_length = text.chars().count();

        info!("Parsing receipt from {} characters of text", text_length);

        let amount = self.amounts.extract(text);
        if amount.is_none() {
            warnings.push("Could not extract amount".to_string());
        }

        let date = self.dates.resolve(text);
        if !date.detected {
            warnings.push("Could not extract date, using processing time".to_string());
        }

        let merchant = self.merchant.extract(text).map(|m| m.value);
        if merchant.is_none() {
            warnings.push("Could not extract merchant".to_string());
        }

        let confidence = score_confidence(&ConfidenceSignals {
            amount: amount.is_some(),
            date_detected: date.detected,
            merchant: merchant.is_some(),
            text_length,
        });

        let receipt = ReceiptData {
            amount: amount.as_ref().map(|a| a.value),
            amount_pattern: amount.as_ref().map(|a| a.pattern),
            date: date.value,
            date_detected: date.detected,
            merchant,
            confidence,
            text_length,
        };

        debug!(
            "Extracted receipt amount={:?} date={} merchant={:?} confidence={:.2}",
            receipt.amount,
            receipt.date_iso(),
            receipt.merchant,
            receipt.confidence
        );

        ExtractionResult {
            receipt,
            raw_text: text.to_string(),
            ocr_stage: None,
            warnings,
            processing_time_ms: timer.elapsed_ms(),
        }
    }
}

/// Wall-clock timer for `processing_time_ms`. `wasm32-unknown-unknown` has
/// no monotonic clock in std, so timings read 0 there.
struct Timer {
    #[cfg(not(target_arch = "wasm32"))]
    start: std::time::Instant,
}

impl Timer {
    fn start() -> Self {
        Self {
            #[cfg(not(target_arch = "wasm32"))]
            start: std::time::Instant::now(),
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    #[cfg(target_arch = "wasm32")]
    fn elapsed_ms(&self) -> u64 {
        0
    }
}
