use crate::config::Config;
use regex::Regex;
use reqwest::{Client, Url};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

pub const DEFAULT_CATALOG_URL: &str = "https://vizier.cds.unistra.fr/viz-bin/votable";
// Gaia DR2, full sky coverage
pub const DEFAULT_CATALOG_SOURCE: &str = "I/345/gaia2";
pub const DEFAULT_CATALOG_COLUMNS: &str = "RA_ICRS,DE_ICRS,Gmag,BPmag,RPmag";
pub const DEFAULT_FINDER_CHART_URL: &str =
    "https://skyserver.sdss.org/dr16/SkyServerWS/ImgCutout/getjpeg";
// Characters allowed in isochrone `age`/`z` values; `..` is rejected separately
pub const ISOCHRONE_KEY_PATTERN: &str = r"^[A-Za-z0-9._+-]*$";

pub struct AppState {
    pub client: Client,
    pub semaphore: Arc<Semaphore>,
    pub max_request_body_bytes: usize,
    pub catalog_url: String,
    pub catalog_source: String,
    pub catalog_columns: String,
    pub finder_chart_url: String,
    pub isochrone_dir: PathBuf,
    pub isochrone_key_pattern: Regex,
    pub static_dir: PathBuf,
    pub index_file: PathBuf,
    pub allow_any_origin: bool,
}

impl AppState {
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let timeout = std::time::Duration::from_secs(cfg.timeout_secs.unwrap_or(30));
        let mut builder = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")));
        if let Some(secs) = cfg.connect_timeout_secs {
            builder = builder.connect_timeout(std::time::Duration::from_secs(secs));
        }
        let client = builder.build()?;
        debug!("HTTP client created with timeout: {:?}", timeout);

        // Parse and validate service URLs at startup
        let catalog_url = validated_url(cfg.catalog_url.as_deref(), DEFAULT_CATALOG_URL, "catalog")?;
        let finder_chart_url = validated_url(
            cfg.finder_chart_url.as_deref(),
            DEFAULT_FINDER_CHART_URL,
            "finder chart",
        )?;

        let catalog_source = cfg
            .catalog_source
            .clone()
            .unwrap_or_else(|| DEFAULT_CATALOG_SOURCE.into());
        let catalog_columns = cfg
            .catalog_columns
            .clone()
            .unwrap_or_else(|| DEFAULT_CATALOG_COLUMNS.into());
        info!(
            "Catalog service: url='{}' source='{}'",
            catalog_url, catalog_source
        );

        let max_outbound = cfg.max_outbound_concurrency.unwrap_or(32);
        let semaphore = Arc::new(Semaphore::new(max_outbound));
        debug!("Created semaphore with {} permits", max_outbound);

        // Default to 5 MB if not specified
        const DEFAULT_MAX_BODY_BYTES: usize = 5_242_880; // 5 MB
        let max_request_body_bytes = cfg.max_request_body_bytes.unwrap_or(DEFAULT_MAX_BODY_BYTES);
        debug!("Maximum request body size: {} bytes", max_request_body_bytes);

        let isochrone_dir = PathBuf::from(
            cfg.isochrone_dir
                .as_deref()
                .unwrap_or("static/isochrones"),
        );
        if !isochrone_dir.is_dir() {
            // Not fatal: every isochrone request will simply 404
            warn!("Isochrone directory {:?} does not exist", isochrone_dir);
        }

        let isochrone_key_pattern =
            Regex::new(ISOCHRONE_KEY_PATTERN).map_err(|e| anyhow::anyhow!(e))?;

        Ok(AppState {
            client,
            semaphore,
            max_request_body_bytes,
            catalog_url,
            catalog_source,
            catalog_columns,
            finder_chart_url,
            isochrone_dir,
            isochrone_key_pattern,
            static_dir: PathBuf::from(cfg.static_dir.as_deref().unwrap_or("static")),
            index_file: PathBuf::from(cfg.index_file.as_deref().unwrap_or("templates/index.html")),
            allow_any_origin: cfg.allow_any_origin.unwrap_or(false),
        })
    }
}

/// Checks that a configured base URL parses, keeping the configured text so that
/// query strings are appended to exactly what the operator wrote.
fn validated_url(configured: Option<&str>, default: &str, what: &str) -> anyhow::Result<String> {
    let raw = configured.unwrap_or(default);
    Url::parse(raw).map_err(|e| anyhow::anyhow!("Invalid {} URL '{}': {}", what, raw, e))?;
    Ok(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appstate_defaults() {
        let st = AppState::from_config(&Config::default()).expect("build state");
        assert_eq!(st.catalog_url, DEFAULT_CATALOG_URL);
        assert_eq!(st.catalog_source, "I/345/gaia2");
        assert_eq!(st.catalog_columns, "RA_ICRS,DE_ICRS,Gmag,BPmag,RPmag");
        assert_eq!(st.finder_chart_url, DEFAULT_FINDER_CHART_URL);
        assert_eq!(st.isochrone_dir, PathBuf::from("static/isochrones"));
        assert_eq!(st.max_request_body_bytes, 5_242_880);
        assert_eq!(st.semaphore.available_permits(), 32);
        assert!(!st.allow_any_origin);
    }

    #[test]
    fn appstate_uses_configured_values() {
        let cfg = Config {
            catalog_url: Some("http://127.0.0.1:9000/votable".to_string()),
            catalog_source: Some("I/355/gaiadr3".to_string()),
            max_outbound_concurrency: Some(4),
            isochrone_dir: Some("/srv/iso".to_string()),
            ..Config::default()
        };
        let st = AppState::from_config(&cfg).expect("build state");
        assert_eq!(st.catalog_url, "http://127.0.0.1:9000/votable");
        assert_eq!(st.catalog_source, "I/355/gaiadr3");
        assert_eq!(st.semaphore.available_permits(), 4);
        assert_eq!(st.isochrone_dir, PathBuf::from("/srv/iso"));
    }

    #[test]
    fn appstate_rejects_invalid_catalog_url() {
        let cfg = Config {
            catalog_url: Some("not-a-valid-url".to_string()),
            ..Config::default()
        };
        let result = AppState::from_config(&cfg);
        assert!(result.is_err(), "should fail with invalid URL");
        if let Err(e) = result {
            let err_msg = e.to_string();
            assert!(
                err_msg.contains("Invalid catalog URL"),
                "error message should mention invalid URL: {}",
                err_msg
            );
        }
    }
}
