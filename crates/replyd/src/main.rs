//! replyd - reply suggestion daemon
//!
//! Serves ranked short reply suggestions: external-model primary with a
//! deterministic rules fallback, plus sampled shadow comparison logging for
//! offline calibration.

use anyhow::Result;
use replyd::config::Config;
use replyd::server;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load();
    info!(
        "replyd v{} starting (primary_mode={}, shadow_enabled={}, shadow_sample_rate={}, model={}, api_key_present={})",
        env!("CARGO_PKG_VERSION"),
        config.primary_mode,
        config.shadow_enabled,
        config.shadow_sample_rate,
        config.model,
        config.api_key_present()
    );

    server::run(config).await
}
