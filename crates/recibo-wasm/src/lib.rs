//! WASM bindings for receipt field extraction.
//!
//! The browser supplies OCR text; extraction runs entirely in Rust. The
//! reference time comes from the caller or from the JavaScript clock.

use chrono::{NaiveDate, NaiveDateTime};
use wasm_bindgen::prelude::*;

use recibo_core::models::config::PolicyConfig;
use recibo_core::models::receipt::ISO_DATETIME;
use recibo_core::receipt::rules;
use recibo_core::{DraftTransaction, ExtractionResult, ReceiptParser, RuleReceiptParser};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Version information.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Extract amount, date, merchant, and confidence from receipt text.
///
/// `now_iso` (`YYYY-MM-DDTHH:MM:SS`) pins the reference time; when omitted
/// the browser's local clock is used.
#[wasm_bindgen]
pub fn extract_receipt(text: &str, now_iso: Option<String>) -> Result<JsValue, JsValue> {
    let result = parse(text, now_iso.as_deref())?;
    to_js(&result.receipt)
}

/// Same as `extract_receipt`, serialized as a JSON string.
#[wasm_bindgen]
pub fn extract_receipt_json(text: &str, now_iso: Option<String>) -> Result<String, JsValue> {
    let result = parse(text, now_iso.as_deref())?;
    serde_json::to_string(&result.receipt).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Normalize an amount with either decimal convention ("2,901.00" or
/// "2.901,00"). Returns the decimal as a string to keep it exact.
#[wasm_bindgen]
pub fn normalize_amount(raw: &str) -> Option<String> {
    rules::normalize_amount(raw).ok().map(|d| d.to_string())
}

/// Month number for a Spanish month abbreviation, with OCR repair.
#[wasm_bindgen]
pub fn spanish_month(token: &str) -> Option<u32> {
    rules::spanish_month(token).ok()
}

/// Receipt extractor class for browser use.
#[wasm_bindgen]
pub struct ReceiptExtractor {
    policy: PolicyConfig,
    now: Option<NaiveDateTime>,
}

#[wasm_bindgen]
impl ReceiptExtractor {
    /// Create a new receipt extractor.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            policy: PolicyConfig::default(),
            now: None,
        }
    }

    /// Pin the reference time (`YYYY-MM-DDTHH:MM:SS` or `YYYY-MM-DD`).
    #[wasm_bindgen]
    pub fn set_now(&mut self, now_iso: &str) -> Result<(), JsValue> {
        self.now = Some(parse_reference(now_iso)?);
        Ok(())
    }

    /// Minimum confidence required before a draft transaction is offered.
    #[wasm_bindgen]
    pub fn set_min_confidence(&mut self, min_confidence: f32) {
        self.policy.min_confidence = min_confidence;
    }

    /// Currency symbol used in draft descriptions.
    #[wasm_bindgen]
    pub fn set_currency_symbol(&mut self, symbol: &str) {
        self.policy.currency_symbol = symbol.to_string();
    }

    /// Extract receipt fields from text.
    #[wasm_bindgen]
    pub fn extract(&self, text: &str) -> Result<JsValue, JsValue> {
        to_js(&self.parser().parse(text).receipt)
    }

    /// Get extraction result with warnings and timing.
    #[wasm_bindgen]
    pub fn extract_with_metadata(&self, text: &str) -> Result<JsValue, JsValue> {
        to_js(&self.parser().parse(text))
    }

    /// Draft expense for the receipt, or `undefined` when the policy
    /// does not allow one.
    #[wasm_bindgen]
    pub fn draft_transaction(&self, text: &str) -> Result<JsValue, JsValue> {
        let receipt = self.parser().parse(text).receipt;
        match DraftTransaction::from_receipt(&receipt, &self.policy) {
            Some(draft) => to_js(&draft),
            None => Ok(JsValue::UNDEFINED),
        }
    }
}

impl ReceiptExtractor {
    fn parser(&self) -> RuleReceiptParser {
        RuleReceiptParser::new().at(self.now.unwrap_or_else(browser_now))
    }
}

impl Default for ReceiptExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn parse(text: &str, now_iso: Option<&str>) -> Result<ExtractionResult, JsValue> {
    let now = match now_iso {
        Some(iso) => parse_reference(iso)?,
        None => browser_now(),
    };
    Ok(RuleReceiptParser::new().at(now).parse(text))
}

fn parse_reference(iso: &str) -> Result<NaiveDateTime, JsValue> {
    reference_time(iso).ok_or_else(|| JsValue::from_str(&format!("invalid reference time: {}", iso)))
}

fn reference_time(iso: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(iso, ISO_DATETIME)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(iso, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Local wall-clock time from the JavaScript `Date`.
fn browser_now() -> NaiveDateTime {
    let now = js_sys::Date::new_0();
    NaiveDate::from_ymd_opt(now.get_full_year() as i32, now.get_month() + 1, now.get_date())
        .and_then(|d| d.and_hms_opt(now.get_hours(), now.get_minutes(), now.get_seconds()))
        .unwrap_or(NaiveDateTime::MAX)
}

fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_normalize_amount() {
        assert_eq!(normalize_amount("2.901,00").as_deref(), Some("2901.00"));
        assert_eq!(normalize_amount("2,901.00").as_deref(), Some("2901.00"));
        assert_eq!(normalize_amount("abc"), None);
    }

    #[wasm_bindgen_test]
    fn test_spanish_month() {
        assert_eq!(spanish_month("dic"), Some(12));
        assert_eq!(spanish_month("D1C"), Some(12));
        assert_eq!(spanish_month("XYZ"), None);
    }

    #[wasm_bindgen_test]
    fn test_reference_time() {
        assert_eq!(
            reference_time("2025-01-10").map(|d| d.to_string()),
            Some("2025-01-10 00:00:00".to_string())
        );
        assert!(reference_time("10/01/2025").is_none());
    }

    #[wasm_bindgen_test]
    fn test_extract_receipt_json() {
        let json = extract_receipt_json(
            "SUPER MERCADO\n01/12/2024\nTOTAL CONTADO: $2,901.00",
            Some("2025-01-10T00:00:00".to_string()),
        )
        .unwrap();

        assert!(json.contains(r#""amount":"2901.00""#));
        assert!(json.contains(r#""merchant":"SUPER MERCADO""#));
    }

    #[wasm_bindgen_test]
    fn test_extractor_with_browser_clock() {
        let extractor = ReceiptExtractor::new();
        let result = extractor.parser().parse("FARMACIA\n02/01/2024\nTotal 15.50");

        assert!(result.receipt.date_detected);
        assert_eq!(result.processing_time_ms, 0);
        assert!(extractor.extract_with_metadata("FARMACIA\nTotal 15.50").is_ok());
    }
}
