//! Shadow evaluation: sampled offline comparison of the two suggestion
//! sources.
//!
//! Records are appended as newline-delimited JSON for offline calibration.
//! When the external model served the response, the comparison against the
//! already-computed baseline costs nothing and is written synchronously. When
//! rules served it, the external model is queried from a detached background
//! task so the live response is never delayed; that task's failures surface
//! only in the log.

use crate::completion::CompletionApi;
use crate::config::Config;
use crate::request::ReplyRequest;
use crate::selector::{GenerationOutcome, Source};
use crate::suggestion::{overlap_count, Suggestion};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::error;

/// What a shadow record compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShadowMode {
    /// External model served; compared against the free baseline.
    BaselineVsExternal,
    /// External model failed; the failure itself is the signal.
    FallbackTriggered,
    /// Rules served; the external model was queried purely for comparison.
    ExternalVsRulesShadow,
}

/// Small context echo so records can be segmented offline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSummary {
    pub reply_type: String,
    pub intent: String,
    pub conversation_tone: Option<String>,
    pub confidence: Option<f64>,
}

/// One persisted comparison record (one JSON line).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShadowRecord {
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
    pub caller_id: String,
    pub mode: ShadowMode,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    pub source: Source,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub served_texts: Vec<String>,
    pub comparison_texts: Vec<String>,
    pub overlap_count: usize,
    pub context_summary: ContextSummary,
}

/// Append-only JSONL file. The lock serializes concurrent writers; records
/// are never rewritten or deleted here.
struct ShadowLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ShadowLog {
    /// Failures are logged and swallowed; shadow evaluation never affects
    /// the request path.
    fn append(&self, record: &ShadowRecord) {
        let line = match serde_json::to_string(record) {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to serialize shadow record: {}", e);
                return;
            }
        };

        let _guard = match self.lock.lock() {
            Ok(guard) => guard,
            Err(e) => {
                error!("Shadow log lock poisoned: {}", e);
                return;
            }
        };
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{line}"));
        if let Err(e) = result {
            error!("Failed to append shadow record: {}", e);
        }
    }
}

pub struct ShadowEvaluator {
    enabled: bool,
    sample_rate: f64,
    shadow_timeout: Duration,
    model: String,
    log: Arc<ShadowLog>,
    client: Arc<dyn CompletionApi>,
}

impl ShadowEvaluator {
    /// Creates the log directory if absent; the file itself is created on
    /// first append.
    pub fn new(config: &Config, client: Arc<dyn CompletionApi>) -> std::io::Result<Self> {
        if let Some(parent) = config.shadow_log_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(Self {
            enabled: config.shadow_enabled,
            sample_rate: config.shadow_sample_rate,
            shadow_timeout: config.shadow_timeout(),
            model: config.model.clone(),
            log: Arc::new(ShadowLog {
                path: config.shadow_log_path.clone(),
                lock: Mutex::new(()),
            }),
            client,
        })
    }

    /// Sample this request and, if selected, emit its comparison record.
    ///
    /// Must be called after the response content is finalized; only the
    /// rules-primary branch does further network work, and that happens on a
    /// detached task.
    pub fn maybe_evaluate(
        &self,
        request: &ReplyRequest,
        request_id: &str,
        caller_id: &str,
        outcome: &GenerationOutcome,
        baseline: &[Suggestion],
    ) {
        if !self.enabled || self.sample_rate <= 0.0 {
            return;
        }
        if self.sample_rate < 1.0 && rand::random::<f64>() > self.sample_rate {
            return;
        }

        match outcome.source {
            Source::ExternalModel => {
                let record = build_record(
                    request,
                    request_id,
                    caller_id,
                    ShadowMode::BaselineVsExternal,
                    &self.model,
                    None,
                    outcome.source,
                    outcome.error.clone(),
                    &outcome.suggestions,
                    baseline,
                );
                self.log.append(&record);
            }
            Source::RulesFallback => {
                let record = build_record(
                    request,
                    request_id,
                    caller_id,
                    ShadowMode::FallbackTriggered,
                    &self.model,
                    None,
                    outcome.source,
                    outcome.error.clone(),
                    &outcome.suggestions,
                    &[],
                );
                self.log.append(&record);
            }
            Source::RulesBaseline => {
                // Fire-and-forget: no handle is kept, nothing joins it.
                let client = Arc::clone(&self.client);
                let log = Arc::clone(&self.log);
                let model = self.model.clone();
                let timeout = self.shadow_timeout;
                let request = request.clone();
                let request_id = request_id.to_string();
                let caller_id = caller_id.to_string();
                let served = outcome.suggestions.clone();
                tokio::spawn(async move {
                    let started = Instant::now();
                    let (comparison, error) = match client.generate(&request, timeout).await {
                        Ok(suggestions) => (suggestions, None),
                        Err(e) => (Vec::new(), Some(e.to_string())),
                    };
                    let latency_ms = started.elapsed().as_millis() as u64;

                    let record = build_record(
                        &request,
                        &request_id,
                        &caller_id,
                        ShadowMode::ExternalVsRulesShadow,
                        &model,
                        Some(latency_ms),
                        Source::RulesBaseline,
                        error,
                        &served,
                        &comparison,
                    );
                    log.append(&record);
                });
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn build_record(
    request: &ReplyRequest,
    request_id: &str,
    caller_id: &str,
    mode: ShadowMode,
    model: &str,
    latency_ms: Option<u64>,
    source: Source,
    error: Option<String>,
    served: &[Suggestion],
    comparison: &[Suggestion],
) -> ShadowRecord {
    ShadowRecord {
        timestamp: Utc::now(),
        request_id: request_id.to_string(),
        caller_id: caller_id.to_string(),
        mode,
        model: model.to_string(),
        latency_ms,
        source,
        error,
        served_texts: served.iter().map(|s| s.text.clone()).collect(),
        comparison_texts: comparison.iter().map(|s| s.text.clone()).collect(),
        overlap_count: overlap_count(served, comparison),
        context_summary: ContextSummary {
            reply_type: request.context.reply_type.clone(),
            intent: request.context.intent.clone(),
            conversation_tone: request.context.conversation_tone.clone(),
            confidence: request.context.confidence,
        },
    }
}
