//! Receipt inputs: OCR text files and receipt photos.

use std::io::Read;
use std::path::Path;

use image::DynamicImage;
use tracing::debug;

use super::{ExtractionResult, ReceiptParser};
use crate::error::{ReciboError, Result};
use crate::ocr::{OcrEngine, OcrLadder};

/// Extensions read as already-recognized text.
pub const TEXT_EXTENSIONS: &[&str] = &["txt", "text"];

/// Extensions decoded as images and sent through OCR.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "bmp", "webp"];

/// A receipt ready for extraction.
pub enum ReceiptSource {
    Text(String),
    Image(DynamicImage),
}

impl ReceiptSource {
    /// Load a receipt by file extension. A path of `-` reads text from stdin.
    pub fn open(path: &Path) -> Result<Self> {
        if path.as_os_str() == "-" {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            return Ok(ReceiptSource::Text(text));
        }

        let extension = extension_of(path);
        if TEXT_EXTENSIONS.contains(&extension.as_str()) {
            debug!("Reading receipt text from {}", path.display());
            Ok(ReceiptSource::Text(std::fs::read_to_string(path)?))
        } else if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            debug!("Loading receipt image from {}", path.display());
            Ok(ReceiptSource::Image(image::open(path)?))
        } else {
            Err(ReciboError::UnsupportedFormat(path.display().to_string()))
        }
    }

    /// Whether `open` would accept this path's extension.
    pub fn is_supported(path: &Path) -> bool {
        let extension = extension_of(path);
        TEXT_EXTENSIONS.contains(&extension.as_str())
            || IMAGE_EXTENSIONS.contains(&extension.as_str())
    }

    /// Extract receipt fields, running the OCR ladder first for images.
    pub fn extract<P, E>(&self, parser: &P, ladder: &OcrLadder<E>) -> Result<ExtractionResult>
    where
        P: ReceiptParser,
        E: OcrEngine,
    {
        match self {
            ReceiptSource::Text(text) => Ok(parser.parse(text)),
            ReceiptSource::Image(image) => {
                let outcome = ladder.run(image)?;
                if outcome.text.trim().is_empty() {
                    return Err(ReciboError::NoText);
                }
                Ok(parser.parse_ocr(&outcome))
            }
        }
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcrError;
    use crate::models::config::OcrConfig;
    use crate::ocr::OcrStage;
    use crate::receipt::RuleReceiptParser;
    use image::{GrayImage, Luma};

    struct FixedEngine(&'static str);

    impl OcrEngine for FixedEngine {
        fn name(&self) -> &str {
            "fixed"
        }

        fn recognize(&self, _image: &DynamicImage, _language: &str) -> std::result::Result<String, OcrError> {
            Ok(self.0.to_string())
        }
    }

    fn ladder(text: &'static str) -> OcrLadder<FixedEngine> {
        let config = OcrConfig {
            preprocess: false,
            ..OcrConfig::default()
        };
        OcrLadder::new(FixedEngine(text), config)
    }

    #[test]
    fn test_open_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ticket.TXT");
        std::fs::write(&path, "TIENDA\nTotal 5.00").unwrap();

        let source = ReceiptSource::open(&path).unwrap();
        let result = source.extract(&RuleReceiptParser::new(), &ladder("")).unwrap();

        assert_eq!(result.receipt.merchant.as_deref(), Some("TIENDA"));
        assert_eq!(result.ocr_stage, None);
    }

    #[test]
    fn test_open_image_runs_ocr() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ticket.png");
        GrayImage::from_pixel(8, 8, Luma([255])).save(&path).unwrap();

        let source = ReceiptSource::open(&path).unwrap();
        assert!(matches!(source, ReceiptSource::Image(_)));

        let text = "FARMACIA DEL AHORRO SUCURSAL NORTE\nTOTAL: $120.50\nGRACIAS";
        let result = source.extract(&RuleReceiptParser::new(), &ladder(text)).unwrap();

        assert_eq!(result.ocr_stage, Some(OcrStage::Primary));
        assert_eq!(result.receipt.amount.map(|a| a.to_string()), Some("120.50".to_string()));
    }

    #[test]
    fn test_blank_ocr_output_is_error() {
        let source = ReceiptSource::Image(DynamicImage::ImageLuma8(GrayImage::new(4, 4)));
        let result = source.extract(&RuleReceiptParser::new(), &ladder("  \n "));

        assert!(matches!(result, Err(ReciboError::NoText)));
    }

    #[test]
    fn test_unsupported_extension() {
        let path = Path::new("factura.pdf");

        assert!(!ReceiptSource::is_supported(path));
        assert!(matches!(
            ReceiptSource::open(path),
            Err(ReciboError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            ReceiptSource::open(Path::new("/nonexistent/recibo/ticket.txt")),
            Err(ReciboError::Io(_))
        ));
    }
}
