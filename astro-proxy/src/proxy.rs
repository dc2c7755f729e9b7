pub use crate::catalog::cmd_handler;
pub use crate::finder_chart::finder_chart_handler;
pub use crate::isochrone::isochrone_handler;

use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get_service, MethodRouter},
    Json,
};
use serde_json::json;
use std::path::Path;
use tower_http::services::{ServeDir, ServeFile};
use tracing::error;

/// Value of the first `key` in a query string. Later repeats are ignored, so
/// `?ra=1&ra=2` reads as `ra=1`.
pub fn first_value(pairs: &[(String, String)], key: &str) -> Option<String> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.clone())
}

pub async fn health_handler() -> impl IntoResponse {
    // Simple readiness/health endpoint. Keep it lightweight.
    Json(json!({ "status": "ok" }))
}

/// Landing page served at `/`.
pub fn index_page(file: &Path) -> MethodRouter {
    get_service(ServeFile::new(file)).handle_error(file_service_error)
}

/// Browser assets (client script, stylesheets) served under `/static`.
pub fn static_files(dir: &Path) -> MethodRouter {
    get_service(ServeDir::new(dir)).handle_error(file_service_error)
}

async fn file_service_error(err: std::io::Error) -> impl IntoResponse {
    error!("Failed to serve static file: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error" })),
    )
}
