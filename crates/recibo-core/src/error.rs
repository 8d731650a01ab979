//! Error types for the recibo-core library.

use thiserror::Error;

/// Main error type for the recibo library.
#[derive(Error, Debug)]
pub enum ReciboError {
    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The input is neither a text file nor a supported image.
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// OCR finished without producing any text.
    #[error("no text detected in image")]
    NoText,
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// The OCR engine could not be started.
    #[error("failed to launch OCR engine: {0}")]
    Launch(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Reasons a candidate field value was not accepted.
///
/// The extractors never return these to their callers. They are produced by
/// the per-candidate helpers, logged, and answered by moving on to the next
/// candidate pattern.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// A candidate substring is not a valid number or date.
    #[error("failed to parse {field}: {value}")]
    Parse { field: &'static str, value: String },

    /// A well-formed value fell outside its sanity range.
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: String },

    /// No pattern produced an accepted value.
    #[error("no {0} found")]
    NotFound(&'static str),
}

impl ExtractionError {
    pub(crate) fn parse(field: &'static str, value: impl Into<String>) -> Self {
        Self::Parse {
            field,
            value: value.into(),
        }
    }

    pub(crate) fn out_of_range(field: &'static str, value: impl ToString) -> Self {
        Self::OutOfRange {
            field,
            value: value.to_string(),
        }
    }
}

/// Result type for the recibo library.
pub type Result<T> = std::result::Result<T, ReciboError>;
