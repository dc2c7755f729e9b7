use anyhow::Context;
use serde::Deserialize;
use std::{fs, path::Path};
use tracing::info;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    pub listen: Option<String>,
    // Total timeout in seconds for a single catalog request.
    // If not set, defaults to 30 seconds; VizieR cone searches can be slow.
    pub timeout_secs: Option<u64>,
    // Connection timeout in seconds for reaching the catalog service.
    // If not set, uses reqwest's default behavior (no specific connect timeout).
    pub connect_timeout_secs: Option<u64>,
    // Maximum number of concurrent outbound catalog requests.
    // If not set, a sensible default will be used in `AppState`.
    pub max_outbound_concurrency: Option<usize>,
    // Maximum request body size in bytes. Requests exceeding this will return 413 Payload Too Large.
    // If not set, defaults to 5 MB (5_242_880 bytes).
    pub max_request_body_bytes: Option<usize>,
    pub catalog_url: Option<String>,
    pub catalog_source: Option<String>,
    // Comma separated list passed as `-out=` to the catalog service.
    pub catalog_columns: Option<String>,
    pub finder_chart_url: Option<String>,
    pub isochrone_dir: Option<String>,
    pub static_dir: Option<String>,
    pub index_file: Option<String>,
    // Emit permissive CORS headers so the API can be called from another origin.
    pub allow_any_origin: Option<bool>,
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let cfg_str = fs::read_to_string(path)?;
        Ok(toml::from_str(&cfg_str)?)
    }

    /// Loads the file named by `explicit`, or `config.toml` when it exists.
    /// Without either, every setting takes its built-in default.
    pub fn load(explicit: Option<String>) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => Self::from_file(&path)
                .with_context(|| format!("failed to load config '{}'", path)),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::from_file(DEFAULT_CONFIG_PATH)
                .with_context(|| format!("failed to load config '{}'", DEFAULT_CONFIG_PATH)),
            None => {
                info!("No {} found, using built-in defaults", DEFAULT_CONFIG_PATH);
                Ok(Self::default())
            }
        }
    }
}
