pub mod engine;
pub mod error;
pub mod format;
pub mod health;
pub mod rasterize;

use std::path::Path;
use std::sync::Arc;

use image::DynamicImage;
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

use crate::ocr::engine::{TesseractRecognizer, TextRecognizer};
use crate::ocr::error::{OcrError, ProcessingError};
use crate::ocr::format::{DdjvuConverter, DocumentConverter, DocumentKind};
use crate::ocr::rasterize::{count_pages, PdftoppmRasterizer, Rasterizer};

/// Separator placed between the text of consecutive pages
pub const PAGE_BREAK: &str = "\n\n--- Page Break ---\n\n";

/// Inclusive, 1-based range of pages covered by one batch.
///
/// `start > end` means the window is empty, which happens when the batch
/// lies past the last page or the document has no pages at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub start: u64,
    pub end: u64,
}

impl PageWindow {
    /// `batch` is 1-based; callers reject `batch == 0` and `batch_size == 0`.
    pub fn new(batch: u32, batch_size: u32, total_pages: u64) -> Self {
        let batch_size = u64::from(batch_size);
        let start = u64::from(batch.saturating_sub(1)) * batch_size + 1;
        let end = (start - 1 + batch_size).min(total_pages);
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn len(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            self.end - self.start + 1
        }
    }
}

/// Text of one batch plus the numbers a client needs to page through the rest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct OcrBatchResult {
    pub text: String,
    /// Pages recognized in this batch
    pub pages: u64,
    pub batch: u32,
    pub batch_size: u32,
    pub total_pages: u64,
}

/// Drives rasterizer, recognizer and converter for one batch of one document.
pub struct OcrService {
    rasterizer: Arc<dyn Rasterizer>,
    recognizer: Arc<dyn TextRecognizer>,
    converter: Arc<dyn DocumentConverter>,
    dpi: u32,
}

impl OcrService {
    pub fn new(
        rasterizer: Arc<dyn Rasterizer>,
        recognizer: Arc<dyn TextRecognizer>,
        converter: Arc<dyn DocumentConverter>,
        dpi: u32,
    ) -> Self {
        Self {
            rasterizer,
            recognizer,
            converter,
            dpi,
        }
    }

    /// pdftoppm, Tesseract and ddjvu from the host system
    pub fn with_system_tools(dpi: u32) -> Self {
        Self::new(
            Arc::new(PdftoppmRasterizer::new()),
            Arc::new(TesseractRecognizer::new()),
            Arc::new(DdjvuConverter::new()),
            dpi,
        )
    }

    /// Blocking; run it on a blocking thread.
    pub fn ocr_batch(
        &self,
        kind: DocumentKind,
        path: &Path,
        language: &str,
        batch: u32,
        batch_size: u32,
    ) -> Result<OcrBatchResult, ProcessingError> {
        match kind {
            DocumentKind::Image => Ok(self.ocr_image(path, language)?),
            DocumentKind::Pdf => Ok(self.ocr_pdf(path, language, batch, batch_size)?),
            DocumentKind::Djvu => self.ocr_djvu(path, language, batch, batch_size),
        }
    }

    /// A single image is always batch 1 of size 1, whatever the caller asked for.
    fn ocr_image(&self, path: &Path, language: &str) -> Result<OcrBatchResult, OcrError> {
        info!("Processing image {} with language: {}", path.display(), language);

        let image = image::open(path).map_err(|e| OcrError::InvalidImageFormat {
            details: e.to_string(),
        })?;
        let text = self.recognize_page(image, language)?;

        Ok(OcrBatchResult {
            text,
            pages: 1,
            batch: 1,
            batch_size: 1,
            total_pages: 1,
        })
    }

    fn ocr_pdf(
        &self,
        path: &Path,
        language: &str,
        batch: u32,
        batch_size: u32,
    ) -> Result<OcrBatchResult, OcrError> {
        let total_pages = count_pages(path)?;
        let window = PageWindow::new(batch, batch_size, total_pages);

        let mut texts = Vec::with_capacity(window.len() as usize);
        if !window.is_empty() {
            let images = self.rasterizer.rasterize(path, window, self.dpi)?;
            for (offset, image) in images.into_iter().enumerate() {
                info!(
                    "Processing PDF page {} with language: {}",
                    window.start + offset as u64,
                    language
                );
                texts.push(self.recognize_page(image, language)?);
            }
        } else {
            info!(
                "Batch {} (size {}) lies past the last of {} page(s); nothing to recognize",
                batch, batch_size, total_pages
            );
        }

        Ok(OcrBatchResult {
            pages: texts.len() as u64,
            text: texts.join(PAGE_BREAK),
            batch,
            batch_size,
            total_pages,
        })
    }

    fn ocr_djvu(
        &self,
        path: &Path,
        language: &str,
        batch: u32,
        batch_size: u32,
    ) -> Result<OcrBatchResult, ProcessingError> {
        // The intermediate PDF lives only as long as this directory
        let workdir = tempfile::tempdir().map_err(OcrError::from)?;
        let pdf_path = self.converter.convert(path, workdir.path())?;
        Ok(self.ocr_pdf(&pdf_path, language, batch, batch_size)?)
    }

    fn recognize_page(&self, image: DynamicImage, language: &str) -> Result<String, OcrError> {
        let gray = image.to_luma8();
        self.recognizer.recognize(&gray, language)
    }
}
