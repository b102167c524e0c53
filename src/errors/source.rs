use axum::http::StatusCode;
use thiserror::Error;

use super::AppError;

/// Errors raised while turning an upload or a URL into a local document
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Both a file and a file URL were supplied")]
    ConflictingInput,

    #[error("Neither a file nor a file URL was supplied")]
    MissingInput,

    #[error("Invalid file URL '{url}': {details}")]
    InvalidUrl { url: String, details: String },

    #[error("File type not allowed: '{filename}'")]
    UnsupportedType { filename: String },

    #[error("Error downloading '{url}': {details}")]
    DownloadFailed { url: String, details: String },

    #[error("Download of '{url}' returned HTTP status {status}")]
    DownloadStatus { url: String, status: u16 },

    #[error("No direct PDF/DjVu link on '{url}'")]
    LinkExtraction { url: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AppError for SourceError {
    fn status_code(&self) -> StatusCode {
        match self {
            SourceError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn user_message(&self) -> String {
        match self {
            SourceError::ConflictingInput => {
                "Please provide either a file or a file URL, not both.".to_string()
            }
            SourceError::MissingInput => "No file or file URL provided.".to_string(),
            SourceError::InvalidUrl { details, .. } => format!("Invalid file URL: {}", details),
            SourceError::UnsupportedType { .. } => "File type not allowed.".to_string(),
            SourceError::DownloadFailed { details, .. } => {
                format!("Error downloading file: {}", details)
            }
            SourceError::DownloadStatus { status, .. } => format!(
                "Failed to download file from URL. HTTP status: {}",
                status
            ),
            SourceError::LinkExtraction { .. } => {
                "Could not extract direct file URL from Wikisource page.".to_string()
            }
            SourceError::Io(e) => e.to_string(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            SourceError::ConflictingInput => "SOURCE_CONFLICTING_INPUT",
            SourceError::MissingInput => "SOURCE_MISSING_INPUT",
            SourceError::InvalidUrl { .. } => "SOURCE_INVALID_URL",
            SourceError::UnsupportedType { .. } => "SOURCE_UNSUPPORTED_TYPE",
            SourceError::DownloadFailed { .. } => "SOURCE_DOWNLOAD_FAILED",
            SourceError::DownloadStatus { .. } => "SOURCE_DOWNLOAD_STATUS",
            SourceError::LinkExtraction { .. } => "SOURCE_LINK_EXTRACTION",
            SourceError::Io(_) => "SOURCE_IO_ERROR",
        }
    }
}

impl SourceError {
    pub fn unsupported<S: Into<String>>(filename: S) -> Self {
        Self::UnsupportedType { filename: filename.into() }
    }

    pub fn download_failed<U: Into<String>, D: std::fmt::Display>(url: U, details: D) -> Self {
        Self::DownloadFailed {
            url: url.into(),
            details: details.to_string(),
        }
    }
}
