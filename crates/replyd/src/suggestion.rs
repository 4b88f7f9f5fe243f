//! Core suggestion types and canonical-form helpers.
//!
//! Two suggestions are duplicates iff their canonical forms match: lower-cased
//! text with everything except ASCII alphanumerics and whitespace removed.
//! Dedup, overlap counting, and the desired-count clamp all live here because
//! both the rules engine and the completion client apply them at their
//! ingestion boundaries.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Inclusive bounds for how many suggestions a request may ask for.
pub const MIN_SUGGESTIONS: usize = 1;
pub const MAX_SUGGESTIONS: usize = 5;

/// Used when the request omits `desired_count` or sends something unusable.
pub const DEFAULT_SUGGESTIONS: usize = 5;

/// Reply archetype. Unknown values from the model normalize to `Direct`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Archetype {
    Witty,
    Supportive,
    Short,
    Curious,
    Direct,
}

impl Archetype {
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "witty" => Self::Witty,
            "supportive" => Self::Supportive,
            "short" => Self::Short,
            "curious" => Self::Curious,
            "direct" => Self::Direct,
            _ => Self::Direct,
        }
    }
}

/// Reply tone. Unknown values from the model normalize to `Neutral`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Playful,
    Friendly,
    Neutral,
    Serious,
}

impl Tone {
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "playful" => Self::Playful,
            "friendly" => Self::Friendly,
            "neutral" => Self::Neutral,
            "serious" => Self::Serious,
            _ => Self::Neutral,
        }
    }
}

/// One ranked reply candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub text: String,
    pub archetype: Archetype,
    pub tone: Tone,
}

impl Suggestion {
    pub fn new(text: impl Into<String>, archetype: Archetype, tone: Tone) -> Self {
        Self {
            text: text.into(),
            archetype,
            tone,
        }
    }
}

/// Canonical form used for duplicate detection and overlap counting.
pub fn canonical_text(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Collapse runs of whitespace (newlines included) into single spaces.
fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Clean each text, drop entries that are empty after canonicalization, and
/// keep the first occurrence of each canonical form.
pub fn dedupe(suggestions: Vec<Suggestion>) -> Vec<Suggestion> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(suggestions.len());
    for mut suggestion in suggestions {
        suggestion.text = clean_text(&suggestion.text);
        if suggestion.text.is_empty() {
            continue;
        }
        let key = canonical_text(&suggestion.text);
        if key.is_empty() || !seen.insert(key) {
            continue;
        }
        out.push(suggestion);
    }
    out
}

/// Size of the intersection of the two canonical-form sets.
pub fn overlap_count(a: &[Suggestion], b: &[Suggestion]) -> usize {
    let sa: HashSet<String> = a.iter().map(|s| canonical_text(&s.text)).collect();
    let sb: HashSet<String> = b.iter().map(|s| canonical_text(&s.text)).collect();
    sa.intersection(&sb).count()
}

/// Resolve `desired_count` from the raw request value.
///
/// Integers and numeric strings are accepted and clamped to
/// [`MIN_SUGGESTIONS`, `MAX_SUGGESTIONS`]; anything else falls back to
/// [`DEFAULT_SUGGESTIONS`].
pub fn resolve_desired_count(raw: Option<&Value>) -> usize {
    let parsed = match raw {
        None => Some(DEFAULT_SUGGESTIONS as i64),
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };
    parsed
        .unwrap_or(DEFAULT_SUGGESTIONS as i64)
        .clamp(MIN_SUGGESTIONS as i64, MAX_SUGGESTIONS as i64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_archetype_normalize() {
        assert_eq!(Archetype::normalize("Witty"), Archetype::Witty);
        assert_eq!(Archetype::normalize("  curious "), Archetype::Curious);
        assert_eq!(Archetype::normalize("sarcastic"), Archetype::Direct);
        assert_eq!(Archetype::normalize(""), Archetype::Direct);
    }

    #[test]
    fn test_tone_normalize() {
        assert_eq!(Tone::normalize("PLAYFUL"), Tone::Playful);
        assert_eq!(Tone::normalize("grumpy"), Tone::Neutral);
        assert_eq!(Tone::normalize(""), Tone::Neutral);
    }

    #[test]
    fn test_canonical_text_strips_case_and_punctuation() {
        assert_eq!(canonical_text("Nice!"), "nice");
        assert_eq!(canonical_text("nice"), "nice");
        assert_eq!(canonical_text("Good point."), "good point");
        assert_eq!(canonical_text("!!!"), "");
    }

    #[test]
    fn test_dedupe_case_and_punctuation_insensitive() {
        let out = dedupe(vec![
            Suggestion::new("Nice!", Archetype::Short, Tone::Neutral),
            Suggestion::new("nice", Archetype::Direct, Tone::Friendly),
            Suggestion::new("Good point.", Archetype::Direct, Tone::Neutral),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].text, "Nice!");
        assert_eq!(out[1].text, "Good point.");
    }

    #[test]
    fn test_dedupe_drops_empty_canonical_forms() {
        let out = dedupe(vec![
            Suggestion::new("!!!", Archetype::Short, Tone::Neutral),
            Suggestion::new("   ", Archetype::Short, Tone::Neutral),
            Suggestion::new("ok", Archetype::Short, Tone::Neutral),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "ok");
    }

    #[test]
    fn test_dedupe_collapses_whitespace() {
        let out = dedupe(vec![Suggestion::new(
            "line one\nline  two",
            Archetype::Direct,
            Tone::Neutral,
        )]);
        assert_eq!(out[0].text, "line one line two");
    }

    #[test]
    fn test_resolve_desired_count_clamps_and_defaults() {
        assert_eq!(resolve_desired_count(None), 5);
        assert_eq!(resolve_desired_count(Some(&json!("banana"))), 5);
        assert_eq!(resolve_desired_count(Some(&json!(0))), 1);
        assert_eq!(resolve_desired_count(Some(&json!(-3))), 1);
        assert_eq!(resolve_desired_count(Some(&json!(7))), 5);
        assert_eq!(resolve_desired_count(Some(&json!("4"))), 4);
        assert_eq!(resolve_desired_count(Some(&json!(3))), 3);
        assert_eq!(resolve_desired_count(Some(&json!([1, 2]))), 5);
    }

    #[test]
    fn test_overlap_count_symmetric() {
        let a = vec![
            Suggestion::new("Nice!", Archetype::Short, Tone::Neutral),
            Suggestion::new("Good point.", Archetype::Direct, Tone::Neutral),
        ];
        let b = vec![
            Suggestion::new("good point", Archetype::Direct, Tone::Neutral),
            Suggestion::new("Interesting.", Archetype::Short, Tone::Neutral),
        ];
        assert_eq!(overlap_count(&a, &b), 1);
        assert_eq!(overlap_count(&b, &a), 1);
    }

    #[test]
    fn test_overlap_count_self() {
        let a = vec![
            Suggestion::new("Nice!", Archetype::Short, Tone::Neutral),
            Suggestion::new("Good point.", Archetype::Direct, Tone::Neutral),
        ];
        assert_eq!(overlap_count(&a, &a), 2);
    }
}
