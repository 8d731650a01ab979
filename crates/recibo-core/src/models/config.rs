//! Configuration structures for the receipt pipeline.

use std::path::Path;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{ReciboError, Result};

/// Main configuration for the recibo pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReciboConfig {
    /// Field extraction configuration.
    pub extraction: ExtractionConfig,

    /// OCR engine configuration.
    pub ocr: OcrConfig,

    /// Image preprocessing configuration.
    pub preprocessing: PreprocessConfig,

    /// Draft transaction policy.
    pub policy: PolicyConfig,
}

/// Receipt field extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Smallest amount accepted as a receipt total.
    pub min_amount: Decimal,

    /// Largest amount accepted as a receipt total.
    pub max_amount: Decimal,

    /// Earliest date accepted as a transaction date.
    pub earliest_date: NaiveDate,

    /// A merchant line must be longer than this many characters.
    pub merchant_min_chars: usize,

    /// Merchant names are truncated to this many characters.
    pub merchant_max_chars: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_amount: Decimal::new(1, 2),
            max_amount: Decimal::new(99_999_999, 2),
            earliest_date: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or(NaiveDate::MIN),
            merchant_min_chars: 3,
            merchant_max_chars: 200,
        }
    }
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Language model tried first.
    pub primary_language: String,

    /// Wider language set used when the primary pass returns too little text.
    pub fallback_language: String,

    /// Outputs shorter than this (in characters) trigger the next fallback.
    pub min_text_length: usize,

    /// Path or name of the tesseract executable.
    pub tesseract_path: String,

    /// Tesseract OCR engine mode (`--oem`).
    pub engine_mode: u8,

    /// Tesseract page segmentation mode (`--psm`). 6 = single uniform block.
    pub page_segmentation_mode: u8,

    /// Preprocess the image before the first two passes.
    pub preprocess: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            primary_language: "spa".to_string(),
            fallback_language: "spa+eng".to_string(),
            min_text_length: 50,
            tesseract_path: "tesseract".to_string(),
            engine_mode: 3,
            page_segmentation_mode: 6,
            preprocess: true,
        }
    }
}

/// Image preprocessing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Images narrower than this are upscaled to it.
    pub min_width: u32,

    /// Contrast adjustment passed to `image::imageops::contrast`.
    pub contrast: f32,

    /// Unsharp mask blur sigma.
    pub sharpen_sigma: f32,

    /// Unsharp mask threshold.
    pub sharpen_threshold: i32,

    /// Binarize against the global mean intensity.
    pub binarize: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            min_width: 1500,
            contrast: 60.0,
            sharpen_sigma: 1.0,
            sharpen_threshold: 2,
            binarize: true,
        }
    }
}

/// Policy for turning an extraction into a draft transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Minimum confidence required to create a draft transaction.
    pub min_confidence: f32,

    /// OCR text stored with a receipt is truncated to this many characters.
    pub max_ocr_text_chars: usize,

    /// Currency symbol used in draft descriptions.
    pub currency_symbol: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.3,
            max_ocr_text_chars: 10_000,
            currency_symbol: "$".to_string(),
        }
    }
}

impl ReciboConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| ReciboError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ReciboError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
