//! pyshare-server: LAN file sharing over HTTP
//!
//! - Serves a shared folder while the sharing session is active
//! - Accepts uploads and bulk zip downloads
//! - Keeps a short log of recent API and file requests
//! - Browses other peers through the remote listing resolver

pub mod error;
pub mod handlers;
pub mod index;
pub mod middleware;
pub mod net;
pub mod state;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use state::{AppContext, SharedState};

/// Build the full HTTP router
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(handlers::index_handler))
        .route("/health", get(handlers::health_handler))
        .route("/api/info", get(handlers::info_handler))
        .route("/api/logs", get(handlers::logs_handler))
        .route("/api/toggle-server", post(handlers::toggle_handler))
        .route("/api/files", get(handlers::list_handler))
        .route("/api/files/{name}", delete(handlers::delete_handler))
        .route(
            "/api/upload",
            post(handlers::upload_handler).layer(DefaultBodyLimit::max(state.max_upload_bytes)),
        )
        .route("/api/download-all", get(handlers::download_all_handler))
        .route("/api/fetch", post(handlers::fetch_handler))
        .route("/api/scan", post(handlers::scan_handler))
        .route("/files/{name}", get(handlers::serve_file_handler))
        .layer(axum::middleware::from_fn_with_state(state.clone(), middleware::log_requests))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
