//! Primary/fallback selection between the external model and the rules
//! engine.
//!
//! The rules baseline is computed unconditionally: it is both a possible
//! serve path and the comparison target for shadow evaluation.

use crate::completion::CompletionApi;
use crate::config::{Config, PrimaryMode};
use crate::request::ReplyRequest;
use crate::rules;
use crate::suggestion::Suggestion;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Which source ultimately served the live response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    ExternalModel,
    RulesBaseline,
    /// The external model was attempted and failed.
    RulesFallback,
}

/// The served suggestions plus provenance for one request.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub source: Source,
    pub suggestions: Vec<Suggestion>,
    /// Failure reason on fallback, or a non-fatal configuration warning.
    pub error: Option<String>,
}

pub struct SuggestionSelector {
    primary_mode: PrimaryMode,
    primary_timeout: Duration,
    client: Arc<dyn CompletionApi>,
}

impl SuggestionSelector {
    pub fn new(config: &Config, client: Arc<dyn CompletionApi>) -> Self {
        Self {
            primary_mode: config.primary_mode(),
            primary_timeout: config.primary_timeout(),
            client,
        }
    }

    /// Resolve one request. Returns the outcome that serves the live
    /// response together with the rules baseline for shadow comparison.
    pub async fn select(&self, request: &ReplyRequest) -> (GenerationOutcome, Vec<Suggestion>) {
        let baseline = rules::generate(&request.context, &request.controls, request.desired_count);

        let outcome = match &self.primary_mode {
            PrimaryMode::ExternalModel => {
                match self.client.generate(request, self.primary_timeout).await {
                    Ok(mut suggestions) => {
                        suggestions.truncate(request.desired_count);
                        GenerationOutcome {
                            source: Source::ExternalModel,
                            suggestions,
                            error: None,
                        }
                    }
                    Err(e) => {
                        warn!("External model failed, serving rules fallback: {}", e);
                        GenerationOutcome {
                            source: Source::RulesFallback,
                            suggestions: baseline.clone(),
                            error: Some(e.to_string()),
                        }
                    }
                }
            }
            PrimaryMode::RulesOnly => GenerationOutcome {
                source: Source::RulesBaseline,
                suggestions: baseline.clone(),
                error: None,
            },
            PrimaryMode::Unknown(raw) => {
                warn!("Unknown primary_mode '{}', using rules", raw);
                GenerationOutcome {
                    source: Source::RulesBaseline,
                    suggestions: baseline.clone(),
                    error: Some(format!("unknown primary_mode '{raw}', using rules")),
                }
            }
        };

        (outcome, baseline)
    }
}
