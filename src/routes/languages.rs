use axum::{extract::State, response::Json, routing::get, Router};
use std::sync::Arc;

use crate::{languages::LanguageEntry, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/languages", get(list_languages))
}

#[utoipa::path(
    get,
    path = "/api/languages",
    tag = "languages",
    responses(
        (status = 200, description = "Languages offered for OCR", body = [LanguageEntry])
    )
)]
pub async fn list_languages(State(state): State<Arc<AppState>>) -> Json<Vec<LanguageEntry>> {
    Json(state.languages.list().to_vec())
}
