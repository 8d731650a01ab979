//! OCR engine backed by the `tesseract` command line tool.

use std::process::Command;

use image::{DynamicImage, ImageFormat};
use tracing::debug;

use crate::error::OcrError;
use crate::models::config::OcrConfig;

use super::OcrEngine;

/// Runs `tesseract <image> stdout -l <lang> --oem <m> --psm <p>`.
pub struct TesseractEngine {
    binary: String,
    engine_mode: u8,
    page_segmentation_mode: u8,
}

impl TesseractEngine {
    /// Create an engine using the given executable.
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            engine_mode: 3,
            page_segmentation_mode: 6,
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            binary: config.tesseract_path.clone(),
            engine_mode: config.engine_mode,
            page_segmentation_mode: config.page_segmentation_mode,
        }
    }

    fn command(&self, image_path: &std::path::Path, language: &str) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .arg(image_path)
            .arg("stdout")
            .args(["-l", language])
            .args(["--oem", &self.engine_mode.to_string()])
            .args(["--psm", &self.page_segmentation_mode.to_string()]);
        command
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, image: &DynamicImage, language: &str) -> Result<String, OcrError> {
        // The temp file must outlive the child process.
        let input = tempfile::Builder::new()
            .prefix("recibo-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| OcrError::Launch(format!("failed to create temp file: {}", e)))?;

        image
            .save_with_format(input.path(), ImageFormat::Png)
            .map_err(|e| OcrError::InvalidImage(e.to_string()))?;

        let output = self
            .command(input.path(), language)
            .output()
            .map_err(|e| OcrError::Launch(format!("{}: {}", self.binary, e)))?;

        if !output.status.success() {
            return Err(OcrError::Recognition(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("tesseract returned {} chars", text.chars().count());

        Ok(text)
    }
}
