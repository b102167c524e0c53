use std::path::Path;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use wikisource_ocr::{
    build_router,
    config::Config,
    languages::LanguageRegistry,
    ocr::{health::ToolHealthChecker, OcrService},
    render::FontRegistry,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    info!("Upload directory: {}", config.upload_path);

    let languages = LanguageRegistry::load(Path::new(&config.languages_config));
    let fonts = FontRegistry::load(&config.fonts_dir);
    info!("{} script font(s) registered", fonts.len());

    // Missing tools are reported, not fatal: requests that need them fail individually
    ToolHealthChecker::new().report(&languages);

    let ocr = OcrService::with_system_tools(config.ocr_dpi);
    let server_address = config.server_address.clone();
    let state = Arc::new(AppState::with_registries(config, languages, fonts, ocr)?);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    info!("Server starting on {}", server_address);

    axum::serve(listener, app).await?;

    Ok(())
}
