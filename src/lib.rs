pub mod config;
pub mod errors;
pub mod languages;
pub mod ocr;
pub mod render;
pub mod routes;
pub mod services;
pub mod swagger;

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, response::Json, routing::get, Router};
use tower_http::cors::CorsLayer;

use config::Config;
use languages::LanguageRegistry;
use ocr::OcrService;
use render::FontRegistry;
use services::source_resolver::SourceResolver;

/// Read-only state shared by every request
pub struct AppState {
    pub config: Config,
    pub languages: LanguageRegistry,
    pub fonts: Arc<FontRegistry>,
    pub resolver: SourceResolver,
    pub ocr: Arc<OcrService>,
}

impl AppState {
    pub fn with_registries(
        config: Config,
        languages: LanguageRegistry,
        fonts: FontRegistry,
        ocr: OcrService,
    ) -> Result<Self, errors::SourceError> {
        let resolver = SourceResolver::new(&config)?;
        Ok(Self {
            config,
            languages,
            fonts: Arc::new(fonts),
            resolver,
            ocr: Arc::new(ocr),
        })
    }
}

/// Health check endpoint for monitoring
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is up")
    )
)]
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "healthy"}))
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/api/health", get(health_check))
        .nest("/api", routes::languages::router().merge(routes::ocr::router()))
        .merge(swagger::create_swagger_router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
