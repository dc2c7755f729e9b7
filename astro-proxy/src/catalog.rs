use crate::{error::ApiError, state::AppState};
use axum::{
    body::{Body, StreamBody},
    extract::State,
    http::{header::CONTENT_TYPE, HeaderValue, Request},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures::StreamExt;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_RADIUS: &str = "0.2";

/// A cone search around a sky position, with every field already rendered as
/// it will appear in the catalog query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConeSearch {
    pub ra: String,
    pub dec: String,
    pub radius: String,
}

impl ConeSearch {
    /// Pulls `ra`, `dec` and the optional `radius` out of a JSON request body.
    /// Coordinates that are absent or falsy (`null`, `0`, `""`, ...) are rejected.
    pub fn from_json(body: &Value) -> Result<Self, ApiError> {
        let field = |name: &str| body.get(name).filter(|v| is_truthy(v));
        let (ra, dec) = match (field("ra"), field("dec")) {
            (Some(ra), Some(dec)) => (ra, dec),
            _ => return Err(ApiError::MissingCoordinates),
        };
        let radius = match body.get("radius") {
            None | Some(Value::Null) => DEFAULT_RADIUS.to_string(),
            Some(v) => render(v),
        };
        Ok(ConeSearch {
            ra: render(ra),
            dec: render(dec),
            radius,
        })
    }

    /// Builds the catalog query URL. The coordinate pair is space separated and
    /// left unescaped; the HTTP client percent-encodes it when sending.
    pub fn url(&self, base: &str, source: &str, columns: &str) -> String {
        format!(
            "{}?-source={}&-c={} {}&-c.r={}&-out={}",
            base, source, self.ra, self.dec, self.radius, columns
        )
    }
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn render(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        // Catalog queries have always spelled booleans `True`/`False`
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        other => other.to_string(),
    }
}

pub async fn cmd_handler(
    State(state): State<Arc<AppState>>,
    mut req: Request<Body>,
) -> Result<Response, ApiError> {
    debug!("Received catalog request");

    let body_bytes = to_bytes(req.body_mut(), state.max_request_body_bytes).await?;
    let json: Value = serde_json::from_slice(&body_bytes).map_err(|e| {
        warn!("Failed to parse JSON body: {}", e);
        ApiError::InvalidJson
    })?;
    let search = ConeSearch::from_json(&json)?;

    let url = search.url(
        &state.catalog_url,
        &state.catalog_source,
        &state.catalog_columns,
    );
    info!(
        ra = %search.ra,
        dec = %search.dec,
        radius = %search.radius,
        "Forwarding cone search to catalog service"
    );

    // Held until the relayed body is finished or dropped, not just until the
    // headers arrive. A closed semaphore means we are shutting down.
    let permit = state
        .semaphore
        .clone()
        .acquire_owned()
        .await
        .map_err(|_| ApiError::UpstreamUnavailable)?;
    let resp = state.client.get(&url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        warn!("Catalog service answered {} for {}", status, url);
    }

    // Stream the catalog body straight through; VOTables for wide cones get large
    let stream = resp.bytes_stream().map(move |res| {
        let _permit = &permit;
        res.map_err(|e| std::io::Error::other(format!("upstream error: {}", e)))
    });
    let mut response = StreamBody::new(stream).into_response();
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/xml"));
    Ok(response)
}

// Helper to read the full body with size limit
async fn to_bytes(body: &mut Body, max_size: usize) -> Result<Bytes, ApiError> {
    use axum::body::HttpBody;
    use bytes::BytesMut;

    let mut buf = BytesMut::new();
    let mut total_size: usize = 0;

    while let Some(chunk_res) = body.data().await {
        let chunk = match chunk_res {
            Ok(chunk) => chunk,
            Err(_) => return Err(ApiError::InvalidJson),
        };

        total_size = match total_size.checked_add(chunk.len()) {
            Some(new_size) if new_size <= max_size => new_size,
            _ => return Err(ApiError::PayloadTooLarge),
        };

        buf.extend_from_slice(&chunk);
    }

    Ok(buf.freeze())
}
