//! Core library for receipt OCR processing.
//!
//! This crate provides:
//! - Rule-based receipt field extraction (amount, date, merchant)
//! - Confidence scoring over the extracted fields
//! - Draft transaction policy for downstream bookkeeping
//! - OCR fallback ladder, image preprocessing, and a tesseract backend

pub mod error;
pub mod models;
pub mod ocr;
pub mod receipt;

pub use error::{ExtractionError, OcrError, ReciboError, Result};
pub use models::receipt::{ReceiptData, ReceiptStatus, ReceiptUpdate};
pub use models::transaction::{DraftTransaction, TransactionKind};
pub use ocr::{OcrEngine, OcrLadder, OcrOutcome, OcrStage, ReceiptPreprocessor};
#[cfg(feature = "native")]
pub use ocr::TesseractEngine;
pub use receipt::{ExtractionResult, ReceiptParser, ReceiptSource, RuleReceiptParser};
