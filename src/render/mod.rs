//! Turning OCR results into what the caller asked for: a JSON body or a
//! freshly laid out PDF.

pub mod fonts;
pub mod pdf;

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::ocr::OcrBatchResult;

pub use fonts::{FontChoice, FontRegistry};
pub use pdf::{render_pdf, PdfLayout};

pub const PDF_FILENAME: &str = "ocr_result.pdf";

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to generate PDF: {details}")]
    Pdf { details: String },

    #[error("Font {family} could not be loaded: {details}")]
    Font { family: String, details: String },
}

/// Successful body of `/api/ocr`
#[derive(Debug, Serialize, ToSchema, PartialEq)]
pub struct OcrResponse {
    pub success: bool,
    pub text: String,
    /// Pages OCR'd in this batch
    pub pages: u64,
    pub batch: u32,
    pub batch_size: u32,
    pub total_pages: u64,
}

impl From<OcrBatchResult> for OcrResponse {
    fn from(result: OcrBatchResult) -> Self {
        Self {
            success: true,
            text: result.text,
            pages: result.pages,
            batch: result.batch,
            batch_size: result.batch_size,
            total_pages: result.total_pages,
        }
    }
}

/// Renders a batch result as PDF with the font registered for `language`.
pub fn render_batch_pdf(
    result: &OcrBatchResult,
    language: &str,
    fonts: &FontRegistry,
) -> Result<Vec<u8>, RenderError> {
    let font = fonts.lookup(language);
    render_pdf(&result.text, &font, &PdfLayout::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_shape() {
        let response = OcrResponse::from(OcrBatchResult {
            text: "hello".to_string(),
            pages: 2,
            batch: 3,
            batch_size: 5,
            total_pages: 12,
        });

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "success": true,
                "text": "hello",
                "pages": 2,
                "batch": 3,
                "batch_size": 5,
                "total_pages": 12
            })
        );
    }

    #[test]
    fn test_render_batch_pdf_falls_back_for_unknown_language() {
        let result = OcrBatchResult {
            text: "plain".to_string(),
            pages: 1,
            batch: 1,
            batch_size: 1,
            total_pages: 1,
        };
        let pdf = render_batch_pdf(&result, "xyz", &FontRegistry::empty()).unwrap();
        assert!(pdf.starts_with(b"%PDF-1.5"));
    }
}
