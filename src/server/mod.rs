//! HTTP API for image, tabular and text analysis.
//!
//! All domain endpoints live under `/api/` and require a bearer access
//! token. Uploaded files are served back under `/media/`.

pub mod auth;
mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::Settings;
use crate::services::{AccountService, ArtifactService, SearchIndex};
use crate::storage::ContentStore;

use auth::TokenIssuer;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub artifacts: ArtifactService,
    pub index: Arc<SearchIndex>,
    pub tokens: Arc<TokenIssuer>,
    /// Base for artifact URLs; the request Host is used when unset.
    pub public_url: Option<String>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(settings: &Settings, index: Arc<SearchIndex>) -> Self {
        let db = settings.create_db_context();
        let store = ContentStore::new(settings.media_dir.clone());

        Self {
            accounts: AccountService::new(db.clone()),
            artifacts: ArtifactService::new(db, store, settings.max_upload_bytes),
            index,
            tokens: Arc::new(TokenIssuer::new(&settings.auth)),
            public_url: settings
                .public_url
                .as_ref()
                .map(|url| url.trim_end_matches('/').to_string()),
            max_upload_bytes: settings.max_upload_bytes,
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

/// Start the web server.
///
/// Migrations are applied and the search index opened before binding. The
/// index is flushed once the server has drained.
pub async fn serve(settings: &Settings, host: &str, port: u16) -> anyhow::Result<()> {
    settings.ensure_directories()?;
    let db = settings.create_db_context();
    db.migrate().await?;

    let index = Arc::new(SearchIndex::open(&settings.index_dir)?);
    tracing::info!(
        "Search index at {} holds {} documents",
        settings.index_dir.display(),
        index.len()
    );

    let state = AppState::new(settings, index.clone());
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    index.shutdown()?;
    Ok(())
}
