//! Serving stored uploads and generated charts.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::super::AppState;

/// `GET /media/*path`. Anything outside the media root is a 404.
pub async fn serve_media(State(state): State<AppState>, Path(path): Path<String>) -> Response {
    let Some(file) = state.artifacts.store().resolve(&path) else {
        return (StatusCode::NOT_FOUND, "File not found").into_response();
    };

    let content = match tokio::fs::read(&file).await {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to read {}: {}", file.display(), e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read file").into_response();
        }
    };

    let mime = mime_guess::from_path(&file)
        .first_or_octet_stream()
        .to_string();

    (
        [
            (header::CONTENT_TYPE, mime),
            (header::CACHE_CONTROL, "no-cache".to_string()),
        ],
        content,
    )
        .into_response()
}

pub async fn health(State(state): State<AppState>) -> Response {
    axum::Json(json!({
        "status": "ok",
        "indexed_documents": state.index.len(),
    }))
    .into_response()
}
