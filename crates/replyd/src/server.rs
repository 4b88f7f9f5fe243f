//! HTTP server for replyd.

use crate::completion::{CompletionApi, HttpCompletionClient};
use crate::config::Config;
use crate::routes;
use crate::selector::SuggestionSelector;
use crate::shadow::ShadowEvaluator;
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across handlers
pub struct AppState {
    pub config: Config,
    pub selector: SuggestionSelector,
    pub shadow: ShadowEvaluator,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let client: Arc<dyn CompletionApi> = Arc::new(HttpCompletionClient::new(&config));
        Self::with_client(config, client)
    }

    /// Build state around an injected completion client (tests use a fake).
    pub fn with_client(config: Config, client: Arc<dyn CompletionApi>) -> Result<Self> {
        let selector = SuggestionSelector::new(&config, Arc::clone(&client));
        let shadow = ShadowEvaluator::new(&config, client)?;
        Ok(Self {
            config,
            selector,
            shadow,
        })
    }
}

/// Build the router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::suggestion_routes())
        .merge(routes::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until the process is stopped.
pub async fn run(config: Config) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::new(config)?);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
