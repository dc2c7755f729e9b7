use crate::{error::ApiError, proxy::first_value, state::AppState};
use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default)]
pub struct FinderChartParams {
    pub ra: Option<String>,
    pub dec: Option<String>,
    pub scale: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FinderChart {
    pub finder_chart_url: String,
}

impl FinderChartParams {
    pub fn from_query(pairs: &[(String, String)]) -> Self {
        FinderChartParams {
            ra: first_value(pairs, "ra"),
            dec: first_value(pairs, "dec"),
            scale: first_value(pairs, "scale"),
            width: first_value(pairs, "width"),
            height: first_value(pairs, "height"),
        }
    }

    /// Cutout URL for these parameters; scale defaults to 0.2"/px and the
    /// image to 120x120 pixels. Values are passed through as given.
    pub fn url(&self, base: &str) -> Result<String, ApiError> {
        let (ra, dec) = match (present(&self.ra), present(&self.dec)) {
            (Some(ra), Some(dec)) => (ra, dec),
            _ => return Err(ApiError::MissingCoordinates),
        };
        Ok(format!(
            "{}?ra={}&dec={}&scale={}&width={}&height={}",
            base,
            ra,
            dec,
            self.scale.as_deref().unwrap_or("0.2"),
            self.width.as_deref().unwrap_or("120"),
            self.height.as_deref().unwrap_or("120"),
        ))
    }
}

fn present(v: &Option<String>) -> Option<&str> {
    v.as_deref().filter(|s| !s.is_empty())
}

pub async fn finder_chart_handler(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<FinderChart>, ApiError> {
    let params = FinderChartParams::from_query(&pairs);
    let finder_chart_url = params.url(&state.finder_chart_url)?;
    debug!("Built finder chart url {}", finder_chart_url);
    Ok(Json(FinderChart { finder_chart_url }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    const SDSS: &str = "https://skyserver.sdss.org/dr16/SkyServerWS/ImgCutout/getjpeg";

    fn query(pairs: &[(&str, &str)]) -> Query<Vec<(String, String)>> {
        Query(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn coords(ra: &str, dec: &str) -> FinderChartParams {
        FinderChartParams {
            ra: Some(ra.into()),
            dec: Some(dec.into()),
            ..FinderChartParams::default()
        }
    }

    #[test]
    fn defaults_fill_in_image_parameters() {
        let url = coords("250.423", "36.460").url(SDSS).expect("url");
        assert_eq!(
            url,
            format!("{}?ra=250.423&dec=36.460&scale=0.2&width=120&height=120", SDSS)
        );
    }

    #[test]
    fn explicit_parameters_are_used_verbatim() {
        let params = FinderChartParams {
            scale: Some("0.4".into()),
            width: Some("512".into()),
            height: Some("256".into()),
            ..coords("10.5", "-5.2")
        };
        assert_eq!(
            params.url(SDSS).expect("url"),
            format!("{}?ra=10.5&dec=-5.2&scale=0.4&width=512&height=256", SDSS)
        );
    }

    #[test]
    fn absent_or_empty_coordinates_are_rejected() {
        let cases = [
            FinderChartParams::default(),
            FinderChartParams {
                ra: Some("10".into()),
                ..FinderChartParams::default()
            },
            coords("", "5"),
            coords("5", ""),
        ];
        for params in cases {
            assert!(matches!(params.url(SDSS), Err(ApiError::MissingCoordinates)));
        }
    }

    #[tokio::test]
    async fn handler_returns_url_object() {
        let state = Arc::new(AppState::from_config(&Config::default()).expect("state"));
        let Json(chart) = finder_chart_handler(State(state), query(&[("ra", "1"), ("dec", "2")]))
            .await
            .expect("chart");
        assert_eq!(
            chart,
            FinderChart {
                finder_chart_url: format!("{}?ra=1&dec=2&scale=0.2&width=120&height=120", SDSS),
            }
        );
    }

    #[tokio::test]
    async fn handler_rejects_missing_dec() {
        let state = Arc::new(AppState::from_config(&Config::default()).expect("state"));
        let resp = finder_chart_handler(State(state), query(&[("ra", "1")]))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let bytes = hyper::body::to_bytes(resp.into_body())
            .await
            .expect("bytes");
        assert_eq!(&bytes[..], br#"{"error":"Missing RA or Dec"}"#);
    }

    #[test]
    fn repeated_keys_keep_first_value() {
        let Query(pairs) = query(&[("ra", "1"), ("ra", "2"), ("dec", "3"), ("width", "64")]);
        let params = FinderChartParams::from_query(&pairs);
        assert_eq!(params.ra.as_deref(), Some("1"));
        assert_eq!(params.dec.as_deref(), Some("3"));
        assert_eq!(params.width.as_deref(), Some("64"));
        assert!(params.scale.is_none());
    }
}
