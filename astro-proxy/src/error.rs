use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors a handler can return. Each one renders as `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing RA or Dec")]
    MissingCoordinates,

    #[error("Invalid JSON body")]
    InvalidJson,

    #[error("Invalid isochrone parameters")]
    InvalidIsochroneKey,

    #[error("Isochrone file '{filename}' not found")]
    IsochroneNotFound { filename: String },

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Catalog service timed out")]
    UpstreamTimeout,

    #[error("Catalog service unavailable")]
    UpstreamUnavailable,

    #[error("Internal server error")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingCoordinates
            | ApiError::InvalidJson
            | ApiError::InvalidIsochroneKey => StatusCode::BAD_REQUEST,
            ApiError::IsochroneNotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            ApiError::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
            ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            error!("Catalog request timed out: {}", e);
            ApiError::UpstreamTimeout
        } else {
            error!("Catalog request failed: {}", e);
            ApiError::UpstreamUnavailable
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Io(e) = &self {
            // Don't leak filesystem details to the client
            error!("I/O error while handling request: {}", e);
        }
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
