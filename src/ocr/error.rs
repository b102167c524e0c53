use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Tesseract is not installed on the system")]
    TesseractNotInstalled,

    #[error("OCR failed for language '{language}': {details}")]
    EngineFailed { language: String, details: String },

    #[error("Invalid image format or corrupted image: {details}")]
    InvalidImageFormat { details: String },

    #[error("Could not read PDF: {details}")]
    PdfUnreadable { details: String },

    #[error("pdftoppm is not installed. Please install poppler-utils")]
    RasterizerNotInstalled,

    #[error("Failed to rasterize pages {start}-{end}: {details}")]
    RasterizationFailed { start: u64, end: u64, details: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl OcrError {
    pub fn error_code(&self) -> &'static str {
        match self {
            OcrError::TesseractNotInstalled => "OCR_NOT_INSTALLED",
            OcrError::EngineFailed { .. } => "OCR_ENGINE_FAILED",
            OcrError::InvalidImageFormat { .. } => "OCR_INVALID_FORMAT",
            OcrError::PdfUnreadable { .. } => "OCR_PDF_UNREADABLE",
            OcrError::RasterizerNotInstalled => "OCR_RASTERIZER_NOT_INSTALLED",
            OcrError::RasterizationFailed { .. } => "OCR_RASTERIZATION_FAILED",
            OcrError::Io(_) => "OCR_IO_ERROR",
        }
    }
}

/// DjVu to PDF conversion failures
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("ddjvu failed to convert document: {details}")]
    Failed { details: String },

    #[error("ddjvu command not found. Please install djvulibre-bin")]
    NotInstalled,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ConversionError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ConversionError::Failed { .. } => "CONVERSION_FAILED",
            ConversionError::NotInstalled => "CONVERTER_NOT_INSTALLED",
            ConversionError::Io(_) => "CONVERSION_IO_ERROR",
        }
    }
}

/// Anything that can go wrong between a resolved document and its text
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Ocr(#[from] OcrError),
}
