use image::GrayImage;

use crate::ocr::error::OcrError;

#[cfg(feature = "ocr")]
use tesseract::{PageSegMode, Tesseract};

/// Recognizes the text on one grayscale page.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, page: &GrayImage, language: &str) -> Result<String, OcrError>;
}

/// Tesseract with fully automatic page segmentation (`--psm 3`).
///
/// The language code goes straight to Tesseract; a code without installed
/// traineddata fails here rather than being checked against the registry.
#[derive(Debug, Clone, Default)]
pub struct TesseractRecognizer {
    #[cfg_attr(not(feature = "ocr"), allow(dead_code))]
    datapath: Option<String>,
}

impl TesseractRecognizer {
    pub fn new() -> Self {
        Self {
            datapath: std::env::var("TESSDATA_PREFIX").ok(),
        }
    }
}

impl TextRecognizer for TesseractRecognizer {
    #[cfg(feature = "ocr")]
    fn recognize(&self, page: &GrayImage, language: &str) -> Result<String, OcrError> {
        use std::io::Cursor;

        let engine_error = |details: String| OcrError::EngineFailed {
            language: language.to_string(),
            details,
        };

        let invalid_image = |e: image::ImageError| OcrError::InvalidImageFormat {
            details: e.to_string(),
        };

        let mut png = Vec::new();
        page.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .map_err(invalid_image)?;

        let mut tesseract = Tesseract::new(self.datapath.as_deref(), Some(language))
            .map_err(|e| engine_error(e.to_string()))?
            .set_image_from_mem(&png)
            .map_err(|e| engine_error(e.to_string()))?;

        tesseract.set_page_seg_mode(PageSegMode::PsmAuto);

        tesseract
            .get_text()
            .map_err(|e| engine_error(format!("Failed to extract text: {}", e)))
    }

    #[cfg(not(feature = "ocr"))]
    fn recognize(&self, _page: &GrayImage, _language: &str) -> Result<String, OcrError> {
        Err(OcrError::TesseractNotInstalled)
    }
}
