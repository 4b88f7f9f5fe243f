//! Pure text transforms: length clamping, slang and emoji injection.
//!
//! Everything here is deterministic over its inputs so concurrent requests
//! can share it without coordination.

use crate::suggestion::Tone;

/// Style label for the bilingual Hinglish slang variant (case-insensitive).
pub const HINGLISH_STYLE: &str = "hinglish";

/// In "short" mode, texts over 8 words are cut to the first 8, trailing
/// punctuation stripped, and a period appended. Shorter texts are only
/// trimmed.
pub fn clamp_for_length(text: &str, length_mode: &str) -> String {
    if length_mode != "short" {
        return text.trim().to_string();
    }
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= 8 {
        return text.trim().to_string();
    }
    let mut clipped = words[..8].join(" ");
    while clipped.ends_with(['.', ',', ';', ':', '!', '?']) {
        clipped.pop();
    }
    clipped.push('.');
    clipped
}

/// Apply slang substitutions and emoji injection per the control levels.
pub fn apply_style(
    text: &str,
    style: &str,
    slang_level: u32,
    emoji_level: u32,
    tone: Tone,
) -> String {
    let mut out = text.trim().to_string();

    if slang_level >= 1 {
        if style.eq_ignore_ascii_case(HINGLISH_STYLE) {
            // Chained in this order; "you" fires before "your" on purpose.
            out = out
                .replace("this", "ye")
                .replace("that", "wo")
                .replace("you", "tum")
                .replace("your", "tumhara");
            if slang_level >= 2 && !out.to_lowercase().starts_with("bhai") {
                out = format!("bhai, {}", lowercase_first(&out));
            }
        } else {
            let lower = out.to_lowercase();
            if !lower.starts_with("ngl") && !lower.starts_with("tbh") && !lower.starts_with("honestly")
            {
                out = format!("ngl, {}", lowercase_first(&out));
            }
            if slang_level >= 2 {
                out = out
                    .replace("I am", "I'm kinda")
                    .replace("I think", "I kinda think");
            }
        }
    }

    if emoji_level >= 1 {
        let pool = emoji_pool(tone);
        let index = ((emoji_level - 1) as usize).min(pool.len() - 1);
        let chosen = pool[index];
        if !out.contains(chosen) {
            out = format!("{out} {chosen}");
        }
    }

    out.trim().to_string()
}

fn emoji_pool(tone: Tone) -> [&'static str; 2] {
    match tone {
        Tone::Playful => ["😂", "😄"],
        Tone::Friendly => ["🙂", "🙏"],
        Tone::Serious => ["🧠", "📌"],
        Tone::Neutral => ["🙂", "✨"],
    }
}

fn lowercase_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_short_truncates_to_eight_words() {
        let text = "one two three four five six seven eight nine ten eleven twelve";
        let out = clamp_for_length(text, "short");
        assert_eq!(out.split_whitespace().count(), 8);
        assert!(out.ends_with('.'));
        assert!(!out.ends_with(".."));
        assert_eq!(out, "one two three four five six seven eight.");
    }

    #[test]
    fn test_clamp_short_strips_trailing_punctuation_before_period() {
        let text = "a b c d e f g h?! extra words here";
        let out = clamp_for_length(text, "short");
        assert_eq!(out, "a b c d e f g h.");
    }

    #[test]
    fn test_clamp_short_leaves_short_text_alone() {
        let text = "  just six little words right here  ";
        assert_eq!(clamp_for_length(text, "short"), "just six little words right here");
    }

    #[test]
    fn test_clamp_non_short_only_trims() {
        let text = " one two three four five six seven eight nine ten ";
        assert_eq!(
            clamp_for_length(text, "medium"),
            "one two three four five six seven eight nine ten"
        );
    }

    #[test]
    fn test_slang_prefix_added_once() {
        let out = apply_style("Good point.", "English", 1, 0, Tone::Neutral);
        assert_eq!(out, "ngl, good point.");

        let already = apply_style("tbh, good point.", "English", 1, 0, Tone::Neutral);
        assert_eq!(already, "tbh, good point.");
    }

    #[test]
    fn test_slang_level_two_phrase_swaps() {
        let out = apply_style("Honestly I think we should wait.", "English", 2, 0, Tone::Neutral);
        assert_eq!(out, "Honestly I kinda think we should wait.");
    }

    #[test]
    fn test_slang_prefix_lowercases_sentence_initial_i() {
        // The prefix runs first, so a leading "I think" becomes "i think" and
        // the level-2 swap no longer matches it.
        let out = apply_style("I think we should wait.", "English", 2, 0, Tone::Neutral);
        assert_eq!(out, "ngl, i think we should wait.");
    }

    #[test]
    fn test_hinglish_substitutions() {
        let out = apply_style("I like this a lot", "Hinglish", 1, 0, Tone::Neutral);
        assert_eq!(out, "I like ye a lot");
    }

    #[test]
    fn test_hinglish_greeting_added_at_most_once() {
        let out = apply_style("Great take", "hinglish", 2, 0, Tone::Neutral);
        assert_eq!(out, "bhai, great take");

        let again = apply_style(&out, "hinglish", 2, 0, Tone::Neutral);
        assert_eq!(again, out);
    }

    #[test]
    fn test_emoji_appended_by_level_and_tone() {
        assert_eq!(apply_style("Fun!", "English", 0, 1, Tone::Playful), "Fun! 😂");
        assert_eq!(apply_style("Fun!", "English", 0, 2, Tone::Playful), "Fun! 😄");
        // Levels past the pool size stick to the last option.
        assert_eq!(apply_style("Fun!", "English", 0, 9, Tone::Playful), "Fun! 😄");
        assert_eq!(apply_style("Hm.", "English", 0, 2, Tone::Neutral), "Hm. ✨");
    }

    #[test]
    fn test_emoji_not_duplicated() {
        let out = apply_style("Fun! 😂", "English", 0, 1, Tone::Playful);
        assert_eq!(out, "Fun! 😂");
    }

    #[test]
    fn test_no_levels_is_identity_modulo_trim() {
        assert_eq!(apply_style("  Fine.  ", "English", 0, 0, Tone::Neutral), "Fine.");
    }
}
