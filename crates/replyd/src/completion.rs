//! Client for the external structured-completion service.
//!
//! Builds one chat-completion request per call, then parses and validates the
//! structured reply into suggestions. Validation is strict: after dedup the
//! model must return exactly the requested count, otherwise the call is a
//! hard error and the caller falls back to the rules path. A shorter or
//! longer list indicates prompt/model drift, not a usable partial result.

use crate::config::Config;
use crate::error::CompletionError;
use crate::request::ReplyRequest;
use crate::suggestion::{dedupe, Archetype, Suggestion, Tone};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Mutex;
use std::time::Duration;

/// Generic completion backend. The HTTP implementation talks to the real
/// endpoint; tests inject [`FakeCompletionClient`].
#[async_trait]
pub trait CompletionApi: Send + Sync {
    async fn generate(
        &self,
        request: &ReplyRequest,
        timeout: Duration,
    ) -> Result<Vec<Suggestion>, CompletionError>;
}

/// Real client for an OpenAI-compatible chat-completions endpoint.
pub struct HttpCompletionClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl HttpCompletionClient {
    pub fn new(config: &Config) -> Self {
        Self {
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl CompletionApi for HttpCompletionClient {
    async fn generate(
        &self,
        request: &ReplyRequest,
        timeout: Duration,
    ) -> Result<Vec<Suggestion>, CompletionError> {
        if self.api_key.is_empty() {
            return Err(CompletionError::Configuration(
                "completion API key is not configured".to_string(),
            ));
        }

        let prompt = build_prompt(request);
        let body = json!({
            "model": self.model,
            "temperature": prompt.temperature,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.user_payload.to_string()},
            ],
            "response_format": {"type": "json_object"},
        });

        let url = format!("{}/v1/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionError::Transport(format!(
                        "request timed out after {}s",
                        timeout.as_secs()
                    ))
                } else {
                    CompletionError::Transport(format!("request failed: {e}"))
                }
            })?;

        if !response.status().is_success() {
            return Err(CompletionError::Transport(format!(
                "HTTP {} from completion endpoint",
                response.status()
            )));
        }

        let envelope: Value = response
            .json()
            .await
            .map_err(|e| CompletionError::Protocol(format!("invalid response envelope: {e}")))?;

        let content = envelope
            .get("choices")
            .and_then(|v| v.get(0))
            .and_then(|v| v.get("message"))
            .and_then(|v| v.get("content"))
            .and_then(|v| v.as_str())
            .unwrap_or("");
        if content.trim().is_empty() {
            return Err(CompletionError::Protocol(
                "response missing message content".to_string(),
            ));
        }

        parse_suggestions(content, request.desired_count)
    }
}

pub(crate) struct Prompt {
    pub system: String,
    pub user_payload: Value,
    pub temperature: f64,
}

/// Build the per-request prompt.
///
/// "chat" asks for rewrites of the primary text and favors determinism;
/// anything else ("comment" default) asks for replies to it and favors
/// variety.
pub(crate) fn build_prompt(request: &ReplyRequest) -> Prompt {
    let desired = request.desired_count;
    let context = &request.context;

    if context.reply_type == "chat" {
        Prompt {
            system: format!(
                "You generate direct, in-context reply suggestions for social/chat inputs. \
                 Output strict JSON with key 'suggestions' containing exactly {desired} objects. \
                 Each object keys: text, archetype, tone. \
                 Archetype one of: witty, supportive, short, curious, direct. \
                 Tone one of: playful, friendly, neutral, serious. \
                 No markdown. No code fences. No preamble. \
                 Rewrite ONLY the provided primary_text into improved alternatives. \
                 Do not add new facts, names, requests, or side topics. \
                 Preserve the original meaning, topic, entities, and language."
            ),
            user_payload: json!({
                "task": format!("Return exactly {desired} polished rewrites of primary_text."),
                "focus_rules": [
                    "use only primary_text",
                    "no side-topic additions",
                    "no context shift",
                ],
                "reply_type": context.reply_type,
                "primary_text": context.primary_text,
                "secondary_texts": context.secondary_texts,
                "user_draft": request.user_draft,
                "controls": request.controls,
            }),
            temperature: 0.2,
        }
    } else {
        Prompt {
            system: format!(
                "You generate direct, in-context reply suggestions for social feed comments. \
                 Output strict JSON with key 'suggestions' containing exactly {desired} objects. \
                 Each object keys: text, archetype, tone. \
                 Archetype one of: witty, supportive, short, curious, direct. \
                 Tone one of: playful, friendly, neutral, serious. \
                 No markdown. No code fences. No preamble. \
                 Write replies TO the primary_text, not rewrites OF primary_text. \
                 Do not copy or paraphrase the full primary_text. \
                 Use secondary_texts only as supporting context when provided."
            ),
            user_payload: json!({
                "task": format!("Return exactly {desired} short, sendable replies to the target content."),
                "focus_rules": [
                    "reply to primary_text as another person",
                    "do not rewrite primary_text",
                    "stay on-topic",
                ],
                "reply_type": context.reply_type,
                "primary_text": context.primary_text,
                "secondary_texts": context.secondary_texts,
                "user_draft": request.user_draft,
                "controls": request.controls,
            }),
            temperature: 0.45,
        }
    }
}

/// Parse and validate the model's textual payload into suggestions.
pub(crate) fn parse_suggestions(
    content: &str,
    desired_count: usize,
) -> Result<Vec<Suggestion>, CompletionError> {
    let payload = parse_model_json(content)?;
    let raw = payload
        .get("suggestions")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            CompletionError::Protocol("model payload has no 'suggestions' array".to_string())
        })?;

    let mut out = Vec::with_capacity(raw.len());
    for item in raw {
        // Non-object elements are skipped silently.
        let Some(map) = item.as_object() else {
            continue;
        };
        let text = map
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or("")
            .trim()
            .to_string();
        let archetype = Archetype::normalize(map.get("archetype").and_then(Value::as_str).unwrap_or(""));
        let tone = Tone::normalize(map.get("tone").and_then(Value::as_str).unwrap_or(""));
        out.push(Suggestion::new(text, archetype, tone));
    }

    let out = dedupe(out);
    if out.len() != desired_count {
        return Err(CompletionError::Protocol(format!(
            "model returned {} valid suggestions, expected {}",
            out.len(),
            desired_count
        )));
    }
    Ok(out)
}

/// Two-stage parse: strict attempt first, then recovery on the first balanced
/// brace-delimited region. Code fences are stripped before either stage.
fn parse_model_json(content: &str) -> Result<Value, CompletionError> {
    let text = strip_code_fence(content);
    let parsed = match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(_) => {
            let candidate = extract_balanced_object(text).ok_or_else(|| {
                CompletionError::Protocol("no JSON object found in model output".to_string())
            })?;
            serde_json::from_str(candidate).map_err(|e| {
                CompletionError::Protocol(format!("failed to parse model JSON: {e}"))
            })?
        }
    };
    if !parsed.is_object() {
        return Err(CompletionError::Protocol(
            "model JSON payload is not an object".to_string(),
        ));
    }
    Ok(parsed)
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest
        .strip_prefix("json")
        .or_else(|| rest.strip_prefix("JSON"))
        .unwrap_or(rest);
    let rest = rest.trim();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// First balanced `{...}` region, tracking strings and escapes so braces
/// inside text don't confuse the depth count.
fn extract_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth: usize = 0;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, byte) in text.as_bytes().iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if *byte == b'\\' {
                escaped = true;
            } else if *byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Canned-response client for tests: returns queued results in order and
/// keeps repeating the last one, with an optional artificial delay.
pub struct FakeCompletionClient {
    responses: Mutex<Vec<Result<Vec<Suggestion>, CompletionError>>>,
    call_count: Mutex<usize>,
    delay: Option<Duration>,
}

impl FakeCompletionClient {
    pub fn new(responses: Vec<Result<Vec<Suggestion>, CompletionError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            call_count: Mutex::new(0),
            delay: None,
        }
    }

    pub fn always_valid(suggestions: Vec<Suggestion>) -> Self {
        Self::new(vec![Ok(suggestions)])
    }

    pub fn always_error(error: CompletionError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait]
impl CompletionApi for FakeCompletionClient {
    async fn generate(
        &self,
        _request: &ReplyRequest,
        _timeout: Duration,
    ) -> Result<Vec<Suggestion>, CompletionError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        *self.call_count.lock().unwrap() += 1;

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(CompletionError::Protocol("no canned response".to_string()));
        }
        if responses.len() == 1 {
            responses[0].clone()
        } else {
            responses.remove(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Controls, ReplyRequest, RequestContext};

    fn request(reply_type: &str, desired_count: usize) -> ReplyRequest {
        ReplyRequest {
            desired_count,
            user_draft: String::new(),
            context: RequestContext {
                reply_type: reply_type.to_string(),
                primary_text: "Rust makes systems work fun.".to_string(),
                ..RequestContext::default()
            },
            controls: Controls::default(),
        }
    }

    fn payload(texts: &[&str]) -> String {
        let items: Vec<Value> = texts
            .iter()
            .map(|t| json!({"text": t, "archetype": "direct", "tone": "neutral"}))
            .collect();
        json!({ "suggestions": items }).to_string()
    }

    #[test]
    fn test_build_prompt_chat_is_rewrite_low_temperature() {
        let prompt = build_prompt(&request("chat", 4));
        assert_eq!(prompt.temperature, 0.2);
        assert!(prompt.system.contains("Rewrite ONLY"));
        assert!(prompt.system.contains("exactly 4 objects"));
        assert_eq!(prompt.user_payload["reply_type"], "chat");
    }

    #[test]
    fn test_build_prompt_comment_is_reply_high_temperature() {
        let prompt = build_prompt(&request("comment", 5));
        assert_eq!(prompt.temperature, 0.45);
        assert!(prompt.system.contains("replies TO the primary_text"));
        assert!(prompt.system.contains("exactly 5 objects"));
        assert_eq!(prompt.user_payload["primary_text"], "Rust makes systems work fun.");
    }

    #[test]
    fn test_parse_exact_count() {
        let out = parse_suggestions(&payload(&["a", "b", "c"]), 3).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].text, "a");
    }

    #[test]
    fn test_parse_count_mismatch_is_protocol_error() {
        let short = parse_suggestions(&payload(&["a", "b"]), 3);
        assert!(matches!(short, Err(CompletionError::Protocol(_))));

        let long = parse_suggestions(&payload(&["a", "b", "c", "d"]), 3);
        assert!(matches!(long, Err(CompletionError::Protocol(_))));
    }

    #[test]
    fn test_parse_duplicates_collapse_then_fail_count() {
        // Three items, two of which dedupe together: counts as 2, not 3.
        let content = payload(&["Nice!", "nice", "other"]);
        assert!(parse_suggestions(&content, 3).is_err());
        assert!(parse_suggestions(&content, 2).is_ok());
    }

    #[test]
    fn test_parse_strips_code_fence() {
        let fenced = format!("```json\n{}\n```", payload(&["a", "b"]));
        let out = parse_suggestions(&fenced, 2).unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_parse_recovers_object_from_prose() {
        let noisy = format!("Here you go:\n{}\nHope that helps!", payload(&["a", "b"]));
        let out = parse_suggestions(&noisy, 2).unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_balanced_extraction_ignores_braces_in_strings() {
        let content = r#"note {"suggestions": [{"text": "curly } brace", "archetype": "direct", "tone": "neutral"}]} tail"#;
        let out = parse_suggestions(content, 1).unwrap();
        assert_eq!(out[0].text, "curly } brace");
    }

    #[test]
    fn test_parse_skips_non_object_elements() {
        let content = r#"{"suggestions": ["stray", {"text": "kept", "archetype": "direct", "tone": "neutral"}, 7]}"#;
        let out = parse_suggestions(content, 1).unwrap();
        assert_eq!(out[0].text, "kept");
    }

    #[test]
    fn test_parse_normalizes_unknown_enums() {
        let content = r#"{"suggestions": [{"text": "hi", "archetype": "sassy", "tone": "moody"}]}"#;
        let out = parse_suggestions(content, 1).unwrap();
        assert_eq!(out[0].archetype, Archetype::Direct);
        assert_eq!(out[0].tone, Tone::Neutral);
    }

    #[test]
    fn test_parse_rejects_missing_suggestions_key() {
        assert!(matches!(
            parse_suggestions(r#"{"items": []}"#, 1),
            Err(CompletionError::Protocol(_))
        ));
    }

    #[test]
    fn test_parse_rejects_non_object_payload() {
        assert!(parse_suggestions("[1, 2]", 1).is_err());
        assert!(parse_suggestions("no json here", 1).is_err());
    }

    #[tokio::test]
    async fn test_fake_client_queues_responses() {
        let client = FakeCompletionClient::new(vec![
            Ok(vec![Suggestion::new("one", Archetype::Direct, Tone::Neutral)]),
            Err(CompletionError::Transport("boom".to_string())),
        ]);
        let req = request("comment", 1);

        let first = client.generate(&req, Duration::from_secs(3)).await;
        assert_eq!(first.unwrap()[0].text, "one");

        let second = client.generate(&req, Duration::from_secs(3)).await;
        assert!(matches!(second, Err(CompletionError::Transport(_))));
        // The last response repeats.
        let third = client.generate(&req, Duration::from_secs(3)).await;
        assert!(third.is_err());
        assert_eq!(client.call_count(), 3);
    }

    #[tokio::test]
    async fn test_http_client_requires_api_key() {
        let client = HttpCompletionClient::new(&Config::default());
        let result = client.generate(&request("comment", 5), Duration::from_secs(3)).await;
        assert!(matches!(result, Err(CompletionError::Configuration(_))));
    }
}
