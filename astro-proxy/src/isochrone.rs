use crate::{error::ApiError, proxy::first_value, state::AppState};
use axum::{
    extract::{Query, State},
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
};
use regex::Regex;
use std::io::ErrorKind;
use std::sync::Arc;
use tracing::{debug, warn};

pub const DEFAULT_AGE: &str = "parsec_9.0";
pub const DEFAULT_Z: &str = "0.019";

#[derive(Debug, Default)]
pub struct IsochroneParams {
    pub age: Option<String>,
    pub z: Option<String>,
}

/// Age/metallicity pair identifying one precomputed isochrone table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsochroneKey {
    pub age: String,
    pub z: String,
}

impl IsochroneParams {
    pub fn from_query(pairs: &[(String, String)]) -> Self {
        IsochroneParams {
            age: first_value(pairs, "age"),
            z: first_value(pairs, "z"),
        }
    }
}

impl IsochroneKey {
    pub fn new(params: IsochroneParams) -> Self {
        IsochroneKey {
            age: params.age.unwrap_or_else(|| DEFAULT_AGE.into()),
            z: params.z.unwrap_or_else(|| DEFAULT_Z.into()),
        }
    }

    /// `{age}_z{z without dots}.json`, e.g. `parsec_9.0_z0019.json`.
    pub fn filename(&self) -> String {
        format!("{}_z{}.json", self.age, self.z.replace('.', ""))
    }

    /// Rejects anything that could escape the isochrone directory once joined
    /// onto it: separators, parent references and other unexpected characters.
    pub fn validate(&self, safe: &Regex) -> Result<(), ApiError> {
        for part in [&self.age, &self.z] {
            if !safe.is_match(part) || part.contains("..") {
                warn!("Rejected isochrone key component {:?}", part);
                return Err(ApiError::InvalidIsochroneKey);
            }
        }
        Ok(())
    }
}

pub async fn isochrone_handler(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let key = IsochroneKey::new(IsochroneParams::from_query(&pairs));
    key.validate(&state.isochrone_key_pattern)?;
    let filename = key.filename();
    let path = state.isochrone_dir.join(&filename);
    debug!("Serving isochrone from {:?}", path);

    let contents = match tokio::fs::read(&path).await {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("Isochrone file {} not found", filename);
            return Err(ApiError::IsochroneNotFound { filename });
        }
        Err(e) => return Err(e.into()),
    };

    Ok(([(CONTENT_TYPE, "application/json")], contents).into_response())
}
