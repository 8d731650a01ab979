//! OCR collaborators: engine seam, fallback ladder, and preprocessing.
//!
//! The extraction engine only ever sees text. This module produces that text
//! from a receipt image, widening the language set and finally retrying on
//! the unprocessed image when a pass returns too little text.

mod preprocessing;
#[cfg(feature = "native")]
mod tesseract;

pub use preprocessing::ReceiptPreprocessor;
#[cfg(feature = "native")]
pub use tesseract::TesseractEngine;

use std::borrow::Cow;
use std::fmt;

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::OcrError;
use crate::models::config::{OcrConfig, PreprocessConfig};

/// A text recognition backend.
pub trait OcrEngine {
    /// Engine name for logs.
    fn name(&self) -> &str;

    /// Recognize text in an image using the given language set
    /// (e.g. `"spa"` or `"spa+eng"`).
    fn recognize(&self, image: &DynamicImage, language: &str) -> Result<String, OcrError>;
}

/// Step of the fallback ladder that produced the final text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrStage {
    /// Primary language on the preprocessed image.
    Primary,
    /// Fallback language on the preprocessed image.
    Widened,
    /// Fallback language on the original image.
    OriginalImage,
}

impl fmt::Display for OcrStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OcrStage::Primary => f.write_str("primary"),
            OcrStage::Widened => f.write_str("widened language"),
            OcrStage::OriginalImage => f.write_str("original image"),
        }
    }
}

/// Text produced by the ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrOutcome {
    pub text: String,
    pub stage: OcrStage,
    /// Number of engine invocations.
    pub attempts: u32,
}

/// Runs an OCR engine with the documented fallback ladder.
pub struct OcrLadder<E> {
    engine: E,
    config: OcrConfig,
    preprocessor: ReceiptPreprocessor,
}

impl<E: OcrEngine> OcrLadder<E> {
    pub fn new(engine: E, config: OcrConfig) -> Self {
        Self {
            engine,
            config,
            preprocessor: ReceiptPreprocessor::new(),
        }
    }

    pub fn with_preprocessing(mut self, config: PreprocessConfig) -> Self {
        self.preprocessor = ReceiptPreprocessor::with_config(config);
        self
    }

    /// Recognize a receipt image.
    ///
    /// Engine errors abort the ladder; short output only moves it on.
    pub fn run(&self, image: &DynamicImage) -> Result<OcrOutcome, OcrError> {
        let prepared = if self.config.preprocess {
            Cow::Owned(self.preprocessor.process(image)?)
        } else {
            Cow::Borrowed(image)
        };

        let mut outcome = OcrOutcome {
            text: self.recognize(&prepared, &self.config.primary_language)?,
            stage: OcrStage::Primary,
            attempts: 1,
        };

        if self.is_short(&outcome.text) {
            warn!(
                "OCR text too short ({} chars), retrying with {}",
                outcome.text.chars().count(),
                self.config.fallback_language
            );
            outcome.text = self.recognize(&prepared, &self.config.fallback_language)?;
            outcome.stage = OcrStage::Widened;
            outcome.attempts += 1;
        }

        if self.is_short(&outcome.text) {
            warn!("OCR text still too short, retrying on the original image");
            outcome.text = self.recognize(image, &self.config.fallback_language)?;
            outcome.stage = OcrStage::OriginalImage;
            outcome.attempts += 1;
        }

        debug!(
            "OCR produced {} chars at stage {} after {} attempt(s)",
            outcome.text.chars().count(),
            outcome.stage,
            outcome.attempts
        );

        Ok(outcome)
    }

    fn recognize(&self, image: &DynamicImage, language: &str) -> Result<String, OcrError> {
        debug!("Running {} with language {}", self.engine.name(), language);
        self.engine.recognize(image, language)
    }

    fn is_short(&self, text: &str) -> bool {
        text.chars().count() < self.config.min_text_length
    }
}
