use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use axum::Router;
use std::sync::Arc;

use crate::{
    errors::ErrorResponse,
    languages::LanguageEntry,
    render::OcrResponse,
    AppState,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::health_check,
        crate::routes::languages::list_languages,
        crate::routes::ocr::process_ocr,
        crate::routes::ocr::process_ocr_pdf,
    ),
    components(
        schemas(OcrResponse, LanguageEntry, ErrorResponse)
    ),
    tags(
        (name = "health", description = "Liveness"),
        (name = "languages", description = "OCR language metadata"),
        (name = "ocr", description = "OCR of uploaded or linked images, PDFs and DjVu files"),
    ),
    info(
        title = "Wikisource OCR API",
        version = "0.1.0",
        description = "OCR for scanned book pages, returned as text or as a new PDF"
    )
)]
pub struct ApiDoc;

pub fn create_swagger_router() -> Router<Arc<AppState>> {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}
