//! Inbound request parsing.
//!
//! The transport hands us raw JSON. A body that is not a JSON object is
//! rejected outright; inside a valid object, field extraction is deliberately
//! lenient so a missing or mistyped section falls back to defaults instead of
//! failing the request.

use crate::error::RequestError;
use crate::suggestion::resolve_desired_count;
use serde::Serialize;
use serde_json::{Map, Value};

/// Ordered context snippets are capped to keep prompts bounded.
pub const MAX_SECONDARY_TEXTS: usize = 6;

/// Immutable per-request context describing what the user is replying to.
#[derive(Debug, Clone, Serialize)]
pub struct RequestContext {
    /// "comment" (reply to content) or "chat" (rewrite the draft).
    pub reply_type: String,
    /// Canonicalized to lowercase; empty becomes "neutral".
    pub intent: String,
    /// Free-form style label, e.g. "English" or "Hinglish".
    pub user_style: String,
    pub primary_text: String,
    pub secondary_texts: Vec<String>,
    pub conversation_tone: Option<String>,
    pub confidence: Option<f64>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            reply_type: "comment".to_string(),
            intent: "neutral".to_string(),
            user_style: "English".to_string(),
            primary_text: String::new(),
            secondary_texts: Vec::new(),
            conversation_tone: None,
            confidence: None,
        }
    }
}

/// Immutable per-request styling controls.
#[derive(Debug, Clone, Serialize)]
pub struct Controls {
    pub length: String,
    pub emoji_level: u32,
    pub slang_level: u32,
    pub tone_bias: String,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            length: "medium".to_string(),
            emoji_level: 0,
            slang_level: 0,
            tone_bias: "neutral".to_string(),
        }
    }
}

/// One parsed "produce suggestions" request.
#[derive(Debug, Clone)]
pub struct ReplyRequest {
    pub desired_count: usize,
    pub user_draft: String,
    pub context: RequestContext,
    pub controls: Controls,
}

impl ReplyRequest {
    pub fn from_slice(body: &[u8]) -> Result<Self, RequestError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| RequestError::Validation(format!("invalid JSON: {e}")))?;
        let object = value
            .as_object()
            .ok_or_else(|| RequestError::Validation("request body must be a JSON object".into()))?;
        Ok(Self::from_object(object))
    }

    fn from_object(object: &Map<String, Value>) -> Self {
        let desired_count = resolve_desired_count(object.get("desired_count"));
        let user_draft = string_field(object, "user_draft").unwrap_or_default();

        let context = object
            .get("context")
            .and_then(Value::as_object)
            .map(parse_context)
            .unwrap_or_default();
        let controls = object
            .get("controls")
            .and_then(Value::as_object)
            .map(parse_controls)
            .unwrap_or_default();

        Self {
            desired_count,
            user_draft,
            context,
            controls,
        }
    }
}

fn parse_context(object: &Map<String, Value>) -> RequestContext {
    let defaults = RequestContext::default();

    let secondary_texts = object
        .get("secondary_texts")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(scalar_to_string)
                .filter(|s| !s.is_empty())
                .take(MAX_SECONDARY_TEXTS)
                .collect()
        })
        .unwrap_or_default();

    RequestContext {
        reply_type: lower_field(object, "reply_type").unwrap_or(defaults.reply_type),
        intent: lower_field(object, "intent").unwrap_or(defaults.intent),
        user_style: string_field(object, "user_style").unwrap_or(defaults.user_style),
        primary_text: string_field(object, "primary_text").unwrap_or_default(),
        secondary_texts,
        conversation_tone: string_field(object, "conversation_tone"),
        confidence: object.get("confidence").and_then(Value::as_f64),
    }
}

fn parse_controls(object: &Map<String, Value>) -> Controls {
    let defaults = Controls::default();
    Controls {
        length: lower_field(object, "length").unwrap_or(defaults.length),
        emoji_level: level_field(object, "emoji_level"),
        slang_level: level_field(object, "slang_level"),
        tone_bias: lower_field(object, "tone_bias").unwrap_or(defaults.tone_bias),
    }
}

/// Context snippets accept scalars: numbers and bools are kept as their
/// textual form, nulls and containers are dropped.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Trimmed string field; absent, mistyped, or empty yields None.
fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn lower_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    string_field(object, key).map(|s| s.to_lowercase())
}

/// Non-negative integer level; numbers and numeric strings accepted,
/// anything else is 0.
fn level_field(object: &Map<String, Value>, key: &str) -> u32 {
    let parsed = match object.get(key) {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.unwrap_or(0).max(0) as u32
}
