//! Image preprocessing for receipt OCR.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma};
use tracing::debug;

use crate::error::OcrError;
use crate::models::config::PreprocessConfig;

/// Grayscale, upscale, contrast, sharpen, and binarize a receipt photo.
pub struct ReceiptPreprocessor {
    config: PreprocessConfig,
}

impl ReceiptPreprocessor {
    /// Create a new preprocessor with default settings.
    pub fn new() -> Self {
        Self::with_config(PreprocessConfig::default())
    }

    pub fn with_config(config: PreprocessConfig) -> Self {
        Self { config }
    }

    /// Preprocess an image for text recognition.
    pub fn process(&self, image: &DynamicImage) -> Result<DynamicImage, OcrError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(OcrError::InvalidImage("image has no pixels".to_string()));
        }

        let gray = image.to_luma8();
        let (width, height) = gray.dimensions();

        let gray = if width < self.config.min_width {
            let (new_width, new_height) = upscale_dimensions(width, height, self.config.min_width);
            debug!(
                "Upscaling receipt from {}x{} to {}x{}",
                width, height, new_width, new_height
            );
            imageops::resize(&gray, new_width, new_height, FilterType::Lanczos3)
        } else {
            gray
        };

        let contrasted = imageops::contrast(&gray, self.config.contrast);
        let sharpened = imageops::unsharpen(
            &contrasted,
            self.config.sharpen_sigma,
            self.config.sharpen_threshold,
        );

        let output = if self.config.binarize {
            mean_threshold(&sharpened)
        } else {
            sharpened
        };

        Ok(DynamicImage::ImageLuma8(output))
    }
}

impl Default for ReceiptPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Scale to `target_width`, keeping the aspect ratio.
fn upscale_dimensions(width: u32, height: u32, target_width: u32) -> (u32, u32) {
    let ratio = target_width as f64 / width as f64;
    let new_height = (height as f64 * ratio) as u32;
    (target_width, new_height.max(1))
}

/// Pixels brighter than the image mean become white, the rest black.
fn mean_threshold(image: &GrayImage) -> GrayImage {
    let count = image.width() as f64 * image.height() as f64;
    let sum: u64 = image.pixels().map(|p| p[0] as u64).sum();
    let mean = sum as f64 / count;

    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        if image.get_pixel(x, y)[0] as f64 > mean {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}
