mod catalog;
mod config;
mod error;
mod finder_chart;
mod isochrone;
mod proxy;
mod routes;
mod state;

use anyhow::Context;
use config::Config;
use state::AppState;
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tracing::info;

const CONFIG_ENV: &str = "ASTRO_PROXY_CONFIG";
const DEFAULT_LISTEN: &str = "0.0.0.0:8080";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cfg = Config::load(std::env::var(CONFIG_ENV).ok())?;
    let addr = listen_addr(cfg.listen.as_deref())?;

    let state = AppState::from_config(&cfg).context("failed to initialise astro-proxy")?;
    let app = routes::router(Arc::new(state));

    info!(%addr, "Starting astro-proxy");
    axum::Server::try_bind(&addr)
        .with_context(|| format!("failed to bind {}", addr))?
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn listen_addr(listen: Option<&str>) -> anyhow::Result<SocketAddr> {
    let listen = listen.unwrap_or(DEFAULT_LISTEN);
    listen
        .parse()
        .with_context(|| format!("invalid listen address '{}'", listen))
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    info!("Shutdown signal received, draining connections");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listen_defaults_to_all_interfaces() {
        let addr = listen_addr(None).expect("default addr");
        assert_eq!(addr.port(), 8080);
        assert!(addr.ip().is_unspecified());
    }

    #[test]
    fn bad_listen_address_names_the_value() {
        let err = listen_addr(Some("localhost:eighty")).expect_err("should fail");
        assert!(err.to_string().contains("localhost:eighty"), "{}", err);
    }
}
