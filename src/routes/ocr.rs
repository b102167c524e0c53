use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::post,
    Form, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::{
    errors::ApiError,
    ocr::OcrBatchResult,
    render::{self, OcrResponse, PDF_FILENAME},
    services::source_resolver::{SourceInput, UploadedFile},
    AppState,
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ocr", post(process_ocr))
        .route("/ocr/pdf", post(process_ocr_pdf))
}

/// Fields shared by both OCR endpoints, already validated
#[derive(Debug)]
pub struct OcrForm {
    pub source: SourceInput,
    pub language: String,
    pub batch: u32,
    /// `None` means the configured default
    pub batch_size: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct TextFields {
    file_url: Option<String>,
    language: Option<String>,
    batch: Option<String>,
    batch_size: Option<String>,
}

impl TextFields {
    fn set(&mut self, name: &str, value: String) {
        match name {
            "file_url" => self.file_url = Some(value),
            "language" => self.language = Some(value),
            "batch" => self.batch = Some(value),
            "batch_size" => self.batch_size = Some(value),
            _ => {}
        }
    }
}

impl<S> FromRequest<S> for OcrForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();

        let (file, fields) = if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| rejection(e.status(), e.body_text()))?;
            read_multipart(multipart).await?
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(fields) = Form::<TextFields>::from_request(req, state)
                .await
                .map_err(|e| rejection(e.status(), e.body_text()))?;
            (None, fields)
        } else {
            return Err(ApiError::validation(
                "Expected multipart/form-data or application/x-www-form-urlencoded",
            ));
        };

        let file_url = fields.file_url.filter(|url| !url.trim().is_empty());
        let source = SourceInput::from_parts(file, file_url)?;

        Ok(OcrForm {
            source,
            language: fields
                .language
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| "eng".to_string()),
            batch: positive_int("batch", fields.batch)?.unwrap_or(1),
            batch_size: positive_int("batch_size", fields.batch_size)?,
        })
    }
}

async fn read_multipart(
    mut multipart: Multipart,
) -> Result<(Option<UploadedFile>, TextFields), ApiError> {
    let mut file = None;
    let mut fields = TextFields::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| rejection(e.status(), e.body_text()))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == "file" {
            let filename = field.file_name().unwrap_or("").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| rejection(e.status(), e.body_text()))?;
            // A file input left empty still sends a part with no filename
            if !filename.is_empty() {
                info!("Received file: {}, size: {} bytes", filename, data.len());
                file = Some(UploadedFile { filename, data });
            }
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| rejection(e.status(), e.body_text()))?;
            fields.set(&name, value);
        }
    }

    Ok((file, fields))
}

fn rejection(status: StatusCode, details: String) -> ApiError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large("Uploaded file exceeds the maximum allowed size.")
    } else {
        ApiError::validation(format!("Malformed form data: {}", details))
    }
}

/// Absent or blank means "use the default".
fn positive_int(name: &str, raw: Option<String>) -> Result<Option<u32>, ApiError> {
    let Some(raw) = raw.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()) else {
        return Ok(None);
    };
    match raw.parse::<u32>() {
        Ok(value) if value >= 1 => Ok(Some(value)),
        _ => Err(ApiError::validation(format!(
            "{} must be a positive integer, got '{}'",
            name, raw
        ))),
    }
}

async fn run_ocr(state: &AppState, form: OcrForm) -> Result<OcrBatchResult, ApiError> {
    let batch_size = form.batch_size.unwrap_or(state.config.default_batch_size);
    let document = state.resolver.resolve(form.source).await?;
    info!(
        "OCR {} ({:?}) language={} batch={} batch_size={}",
        document.filename(),
        document.kind(),
        form.language,
        form.batch,
        batch_size
    );

    let ocr = Arc::clone(&state.ocr);
    let language = form.language;
    let batch = form.batch;
    let result = tokio::task::spawn_blocking(move || {
        // the local copy is removed when `document` drops with this closure
        ocr.ocr_batch(document.kind(), document.path(), &language, batch, batch_size)
    })
    .await
    .map_err(|e| ApiError::internal_server_error(format!("OCR task failed: {}", e)))??;

    Ok(result)
}

#[utoipa::path(
    post,
    path = "/api/ocr",
    tag = "ocr",
    request_body(content = String, description = "Multipart or urlencoded form: `file` or `file_url` (exactly one), `language` (default eng), `batch` (default 1), `batch_size` (default 5). Supported formats: PNG, JPG, JPEG, TIFF, PDF, DjVu.", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Text of the requested page batch", body = OcrResponse),
        (status = 400, description = "Invalid input, unsupported file, failed download or DjVu conversion", body = crate::errors::ErrorResponse),
        (status = 413, description = "Upload too large", body = crate::errors::ErrorResponse),
        (status = 500, description = "OCR failed", body = crate::errors::ErrorResponse)
    )
)]
pub async fn process_ocr(
    State(state): State<Arc<AppState>>,
    form: OcrForm,
) -> Result<Json<OcrResponse>, ApiError> {
    let result = run_ocr(&state, form).await?;
    Ok(Json(result.into()))
}

#[utoipa::path(
    post,
    path = "/api/ocr/pdf",
    tag = "ocr",
    request_body(content = String, description = "Same form fields as /api/ocr", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "OCR text laid out as an application/pdf attachment named ocr_result.pdf"),
        (status = 400, description = "Invalid input, unsupported file, failed download or DjVu conversion", body = crate::errors::ErrorResponse),
        (status = 413, description = "Upload too large", body = crate::errors::ErrorResponse),
        (status = 500, description = "OCR or PDF generation failed", body = crate::errors::ErrorResponse)
    )
)]
pub async fn process_ocr_pdf(
    State(state): State<Arc<AppState>>,
    form: OcrForm,
) -> Result<Response, ApiError> {
    let language = form.language.clone();
    let result = run_ocr(&state, form).await?;

    let fonts = Arc::clone(&state.fonts);
    let pdf =
        tokio::task::spawn_blocking(move || render::render_batch_pdf(&result, &language, &fonts))
            .await
            .map_err(|e| ApiError::internal_server_error(format!("PDF task failed: {}", e)))??;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", PDF_FILENAME),
            ),
        ],
        pdf,
    )
        .into_response())
}
