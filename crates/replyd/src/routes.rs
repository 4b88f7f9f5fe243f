//! API routes for replyd.

use crate::request::ReplyRequest;
use crate::selector::Source;
use crate::server::AppState;
use crate::suggestion::Suggestion;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

type AppStateArc = Arc<AppState>;

pub fn suggestion_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/reply-suggestions", post(reply_suggestions))
}

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/health", get(health))
}

#[derive(Debug, Serialize)]
struct SuggestionsResponse {
    source: Source,
    suggestions: Vec<Suggestion>,
}

/// One request, one ranked suggestion set.
///
/// The body is parsed leniently (see [`ReplyRequest`]); a body that is not a
/// JSON object is a client error and no generation work happens. Model-layer
/// failures never surface here: they convert the request to the rules
/// fallback and the response still succeeds.
async fn reply_suggestions(
    State(state): State<AppStateArc>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SuggestionsResponse>, (StatusCode, Json<serde_json::Value>)> {
    let request = ReplyRequest::from_slice(&body)
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))))?;

    let request_id = Uuid::new_v4().to_string();
    let caller_id = headers
        .get("x-install-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .trim()
        .to_string();

    let (outcome, baseline) = state.selector.select(&request).await;
    info!(
        "Request {} served ({} suggestions, source {:?})",
        request_id,
        outcome.suggestions.len(),
        outcome.source
    );

    state
        .shadow
        .maybe_evaluate(&request, &request_id, &caller_id, &outcome, &baseline);

    Ok(Json(SuggestionsResponse {
        source: outcome.source,
        suggestions: outcome.suggestions,
    }))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    ok: bool,
    primary_mode: String,
    shadow_enabled: bool,
    shadow_sample_rate: f64,
    model: String,
    api_key_present: bool,
}

/// Configuration snapshot; no side effects.
async fn health(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        primary_mode: state.config.primary_mode.clone(),
        shadow_enabled: state.config.shadow_enabled,
        shadow_sample_rate: state.config.shadow_sample_rate,
        model: state.config.model.clone(),
        api_key_present: state.config.api_key_present(),
    })
}
