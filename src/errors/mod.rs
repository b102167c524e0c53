use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::ocr::error::{ConversionError, OcrError, ProcessingError};
use crate::render::RenderError;

/// How loudly a failed request is reported in the server log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Processing broke on our side - log at error level
    Critical,
    /// The caller sent something we cannot work with - log at warn level
    Minor,
}

/// Common trait for all custom error types in the application
pub trait AppError: std::error::Error + Send + Sync + 'static {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> StatusCode;

    /// Get the message returned to the caller in the `error` field
    fn user_message(&self) -> String;

    /// Get the error code for frontend handling
    fn error_code(&self) -> &'static str;

    fn error_severity(&self) -> ErrorSeverity {
        if self.status_code().is_server_error() {
            ErrorSeverity::Critical
        } else {
            ErrorSeverity::Minor
        }
    }
}

/// JSON body of every failed request
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Macro to implement IntoResponse for all AppError types
/// This provides consistent HTTP response formatting
macro_rules! impl_into_response {
    ($error_type:ty) => {
        impl axum::response::IntoResponse for $error_type {
            fn into_response(self) -> axum::response::Response {
                use crate::errors::{AppError, ErrorResponse, ErrorSeverity};
                use axum::response::Json;

                let status = self.status_code();
                match self.error_severity() {
                    ErrorSeverity::Critical => tracing::error!(
                        code = self.error_code(),
                        status = status.as_u16(),
                        "Error processing request: {}",
                        self
                    ),
                    ErrorSeverity::Minor => tracing::warn!(
                        code = self.error_code(),
                        status = status.as_u16(),
                        "Rejected request: {}",
                        self
                    ),
                }

                let body = Json(ErrorResponse {
                    error: self.user_message(),
                    code: self.error_code().to_string(),
                });

                (status, body).into_response()
            }
        }
    };
}

/// Error returned by every HTTP handler
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {message}")]
    Validation { message: String },

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Ocr(#[from] OcrError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Payload too large: {message}")]
    PayloadTooLarge { message: String },

    #[error("Internal server error: {message}")]
    InternalServerError { message: String },
}

impl AppError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Source(e) => e.status_code(),
            ApiError::Conversion(_) => StatusCode::BAD_REQUEST,
            ApiError::Ocr(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::InternalServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn user_message(&self) -> String {
        match self {
            ApiError::Validation { message } => message.clone(),
            ApiError::Source(e) => e.user_message(),
            // ddjvu failing and ddjvu missing look the same to the caller
            ApiError::Conversion(_) => "Failed to convert DjVu to PDF".to_string(),
            ApiError::Ocr(e) => e.to_string(),
            ApiError::Render(e) => e.to_string(),
            ApiError::PayloadTooLarge { message } => message.clone(),
            ApiError::InternalServerError { message } => message.clone(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::Source(e) => e.error_code(),
            ApiError::Conversion(e) => e.error_code(),
            ApiError::Ocr(e) => e.error_code(),
            ApiError::Render(_) => "PDF_RENDER_FAILED",
            ApiError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            ApiError::InternalServerError { .. } => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl_into_response!(ApiError);

impl From<ProcessingError> for ApiError {
    fn from(err: ProcessingError) -> Self {
        match err {
            ProcessingError::Conversion(e) => ApiError::Conversion(e),
            ProcessingError::Ocr(e) => ApiError::Ocr(e),
        }
    }
}

/// Utility functions for common error creation patterns
impl ApiError {
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into() }
    }

    pub fn payload_too_large<S: Into<String>>(message: S) -> Self {
        Self::PayloadTooLarge { message: message.into() }
    }

    pub fn internal_server_error<S: Into<String>>(message: S) -> Self {
        Self::InternalServerError { message: message.into() }
    }
}

pub mod source;

pub use source::SourceError;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_failures_share_one_user_message() {
        let failed = ApiError::from(ConversionError::Failed {
            details: "exit status: 1".to_string(),
        });
        let missing = ApiError::from(ConversionError::NotInstalled);

        assert_eq!(failed.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(missing.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(failed.user_message(), missing.user_message());
        assert_ne!(failed.error_code(), missing.error_code());
    }

    #[test]
    fn test_ocr_failures_are_server_errors() {
        let err = ApiError::from(OcrError::EngineFailed {
            language: "xyz".to_string(),
            details: "Failed loading language 'xyz'".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_severity(), ErrorSeverity::Critical);
        assert!(err.user_message().contains("xyz"));
    }

    #[test]
    fn test_validation_is_minor() {
        let err = ApiError::validation("batch must be a positive integer");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_severity(), ErrorSeverity::Minor);
        assert_eq!(err.user_message(), "batch must be a positive integer");
    }
}
