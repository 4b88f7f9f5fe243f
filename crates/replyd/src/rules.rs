//! Deterministic rules-based suggestion generation.
//!
//! No I/O, no randomness: the same context and controls always produce the
//! same suggestion set. This output is both the rules-only serve path and the
//! baseline the shadow evaluator compares the external model against.

use crate::request::{Controls, RequestContext};
use crate::styler;
use crate::suggestion::{dedupe, Archetype, Suggestion, Tone};

/// (default text, Hinglish text, archetype, tone)
type TemplateRow = (&'static str, &'static str, Archetype, Tone);

const ASKING: [TemplateRow; 5] = [
    (
        "Good question, I was thinking the same.",
        "Sahi question hai, main bhi yahi soch raha tha.",
        Archetype::Supportive,
        Tone::Friendly,
    ),
    (
        "Can you explain this part a bit more?",
        "Ye part thoda aur explain kar sakte ho?",
        Archetype::Curious,
        Tone::Neutral,
    ),
    (
        "Interesting angle, what made you think that?",
        "Interesting angle hai, aisa kyun laga?",
        Archetype::Curious,
        Tone::Playful,
    ),
    (
        "I'd like to hear more context.",
        "Thoda aur context sunna chahta hu.",
        Archetype::Direct,
        Tone::Neutral,
    ),
    (
        "Fair point, thanks for asking.",
        "Fair point, puchne ke liye thanks.",
        Archetype::Supportive,
        Tone::Friendly,
    ),
];

const PRAISING: [TemplateRow; 5] = [
    (
        "Great point, this is solid.",
        "Sahi point, kaafi solid hai.",
        Archetype::Supportive,
        Tone::Friendly,
    ),
    (
        "Well said, this lands well.",
        "Badiya bola, bilkul land kiya.",
        Archetype::Direct,
        Tone::Neutral,
    ),
    (
        "Love this perspective.",
        "Ye perspective mast laga.",
        Archetype::Short,
        Tone::Playful,
    ),
    (
        "That's a really clean take.",
        "Ye kaafi clean take hai.",
        Archetype::Direct,
        Tone::Neutral,
    ),
    ("Nice one.", "Nice hai.", Archetype::Short, Tone::Friendly),
];

const CRITICIZING: [TemplateRow; 5] = [
    (
        "I see it differently, but fair take.",
        "Mera take alag hai, but fair point.",
        Archetype::Direct,
        Tone::Serious,
    ),
    (
        "Not sure I agree. What's your source?",
        "Pura agree nahi hu. Source kya hai?",
        Archetype::Curious,
        Tone::Serious,
    ),
    (
        "Valid concern, context matters here.",
        "Concern valid hai, context bhi matter karta hai.",
        Archetype::Supportive,
        Tone::Neutral,
    ),
    (
        "Could you clarify what you mean exactly?",
        "Exactly kya mean kar rahe ho, clarify karoge?",
        Archetype::Curious,
        Tone::Neutral,
    ),
    (
        "I get your point, but I disagree.",
        "Point samjha, but disagree karta hu.",
        Archetype::Direct,
        Tone::Serious,
    ),
];

const JOKING: [TemplateRow; 5] = [
    (
        "That caught me off guard.",
        "Ye toh unexpected tha.",
        Archetype::Witty,
        Tone::Playful,
    ),
    (
        "Okay, that was actually funny.",
        "Haha, ye genuinely funny tha.",
        Archetype::Short,
        Tone::Playful,
    ),
    (
        "Now I can't unsee this.",
        "Ab ye unsee nahi hoga.",
        Archetype::Witty,
        Tone::Playful,
    ),
    (
        "Did not expect that ending.",
        "Ye ending expect nahi ki thi.",
        Archetype::Direct,
        Tone::Playful,
    ),
    ("That was wild.", "Ye toh wild tha.", Archetype::Short, Tone::Playful),
];

// The generic fallback has no bilingual variant.
const GENERIC: [TemplateRow; 5] = [
    ("Interesting take.", "Interesting take.", Archetype::Short, Tone::Neutral),
    (
        "Fair point, that makes sense.",
        "Fair point, that makes sense.",
        Archetype::Supportive,
        Tone::Friendly,
    ),
    (
        "Could you share more context?",
        "Could you share more context?",
        Archetype::Curious,
        Tone::Neutral,
    ),
    (
        "I can see where you're coming from.",
        "I can see where you're coming from.",
        Archetype::Supportive,
        Tone::Friendly,
    ),
    ("Good point.", "Good point.", Archetype::Direct, Tone::Neutral),
];

/// Fixed ordered template list for an intent/style pair.
pub fn templates_for(intent: &str, style: &str) -> Vec<Suggestion> {
    let rows: &[TemplateRow; 5] = match intent {
        "asking" => &ASKING,
        "praising" => &PRAISING,
        "criticizing" | "disagreeing" => &CRITICIZING,
        "joking" => &JOKING,
        _ => &GENERIC,
    };
    let hinglish = style.eq_ignore_ascii_case(styler::HINGLISH_STYLE);
    rows.iter()
        .map(|&(default_text, hinglish_text, archetype, tone)| {
            Suggestion::new(if hinglish { hinglish_text } else { default_text }, archetype, tone)
        })
        .collect()
}

/// Short acknowledgements used to pad a deduplicated set up to the desired
/// count.
fn filler_pool(style: &str) -> Vec<Suggestion> {
    if style.eq_ignore_ascii_case(styler::HINGLISH_STYLE) {
        vec![
            Suggestion::new("Nice!", Archetype::Short, Tone::Neutral),
            Suggestion::new("Sahi point.", Archetype::Direct, Tone::Neutral),
            Suggestion::new("Interesting.", Archetype::Short, Tone::Neutral),
            Suggestion::new("Good question.", Archetype::Curious, Tone::Neutral),
            Suggestion::new("Haan, makes sense.", Archetype::Supportive, Tone::Friendly),
        ]
    } else {
        vec![
            Suggestion::new("Nice!", Archetype::Short, Tone::Neutral),
            Suggestion::new("Good point.", Archetype::Direct, Tone::Neutral),
            Suggestion::new("Interesting.", Archetype::Short, Tone::Neutral),
            Suggestion::new("Good question.", Archetype::Curious, Tone::Neutral),
            Suggestion::new("That makes sense.", Archetype::Supportive, Tone::Friendly),
        ]
    }
}

fn tone_from_bias(tone_bias: &str, fallback: Tone) -> Tone {
    match tone_bias {
        "funny" => Tone::Playful,
        "polite" => Tone::Friendly,
        "serious" => Tone::Serious,
        _ => fallback,
    }
}

/// Build up to `desired_count` suggestions from intent templates, styled per
/// the controls and deduplicated by canonical form.
///
/// When templates plus fillers plus the constant filler cannot produce enough
/// distinct texts, the result is shorter than `desired_count`; nothing is
/// synthesized beyond the fixed pools.
pub fn generate(context: &RequestContext, controls: &Controls, desired_count: usize) -> Vec<Suggestion> {
    let templates = templates_for(&context.intent, &context.user_style);

    let mut out = Vec::with_capacity(templates.len());
    for template in templates {
        let tone = tone_from_bias(&controls.tone_bias, template.tone);
        let text = styler::clamp_for_length(&template.text, &controls.length);
        let text = styler::apply_style(
            &text,
            &context.user_style,
            controls.slang_level,
            controls.emoji_level,
            tone,
        );
        out.push(Suggestion::new(text, template.archetype, tone));
    }
    let mut out = dedupe(out);

    for filler in filler_pool(&context.user_style) {
        if out.len() >= desired_count {
            break;
        }
        out.push(filler);
        out = dedupe(out);
    }

    while out.len() < desired_count {
        let before = out.len();
        out.push(Suggestion::new("Nice!", Archetype::Short, Tone::Neutral));
        out = dedupe(out);
        if out.len() == before {
            // No distinct candidate left; return the shorter set.
            break;
        }
    }

    out.truncate(desired_count);
    out
}
