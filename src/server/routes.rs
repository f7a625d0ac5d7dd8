//! Router configuration for the web server.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::auth::require_auth;
use super::handlers;
use super::AppState;

/// Multipart overhead allowed on top of the per-file limit.
const BODY_SLACK_BYTES: usize = 1024 * 1024;
/// Files accepted in one batch upload request at the full per-file size.
const MAX_BATCH_FILES: usize = 8;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        // Images
        .route("/upload_image", post(handlers::upload_image))
        .route("/batch_upload", post(handlers::batch_upload))
        .route("/get_image", get(handlers::get_image))
        .route("/update_image", put(handlers::update_image))
        .route("/delete_image", delete(handlers::delete_image))
        .route("/color_histogram", get(handlers::color_histogram))
        .route("/resize_image", post(handlers::resize_image))
        .route("/crop_image", post(handlers::crop_image))
        .route("/convert_image", post(handlers::convert_image))
        // Tabular datasets
        .route("/upload_file", post(handlers::upload_file))
        .route("/get_file", get(handlers::get_file))
        .route("/update_file", put(handlers::update_file))
        .route("/delete_file", delete(handlers::delete_file))
        .route("/statistics", get(handlers::statistics))
        .route("/chart", get(handlers::chart))
        // Text analysis
        .route("/summarize/", post(handlers::summarize))
        .route("/keywords/", post(handlers::keywords))
        .route("/sentiment/", post(handlers::sentiment))
        .route("/visualize/", post(handlers::visualize))
        .route("/mds/", post(handlers::visualize))
        .route("/search/", post(handlers::search))
        .route("/categorize/", post(handlers::categorize))
        .route("/custom_query/", post(handlers::custom_query))
        .route("/index/", post(handlers::index_documents))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let public = Router::new()
        .route("/signup", post(handlers::signup))
        .route("/login", post(handlers::login))
        .route("/token/refresh", post(handlers::refresh))
        .route("/health", get(handlers::health));

    let body_limit = state
        .max_upload_bytes
        .saturating_mul(MAX_BATCH_FILES)
        .saturating_add(BODY_SLACK_BYTES);

    Router::new()
        .nest("/api", protected.merge(public))
        .route("/media/*path", get(handlers::serve_media))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
