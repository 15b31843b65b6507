//! Shaping generated text for speech synthesis
//!
//! Model output is written for screens: emphasis markers, bullet lists,
//! links. Read aloud these come out as noise, so they are removed and
//! abbreviations are spelled out. Answers are cut to a few sentences so a
//! caller is not kept listening.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```.*?```").expect("valid code fence pattern"));
static HTML_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?[A-Za-z][^>]*>").expect("valid html pattern"));
static LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("valid link pattern"));
static BARE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://\S+").expect("valid url pattern"));
static LINE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?:#{1,6}\s+|[-*+•]\s+|\d+[.)]\s+|>\s*)").expect("valid line marker pattern")
});
static EMPHASIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[*_`~]{1,3}").expect("valid emphasis pattern"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// Agricultural abbreviations spelled out so the synthesizer does not
/// attempt to pronounce them as words
static ABBREVIATIONS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        ("NPK", "N P K"),
        ("DAP", "D A P"),
        ("MSP", "M S P"),
        ("KVK", "K V K"),
        ("FPO", "F P O"),
        ("PM-KISAN", "P M Kisan"),
        ("IPM", "I P M"),
        ("kg/ha", "kilograms per hectare"),
        ("ml/l", "millilitres per litre"),
    ]
    .into_iter()
    .map(|(abbr, spoken)| {
        let pattern = format!(r"(^|[^\w/-]){}($|[^\w/-])", regex::escape(abbr));
        (
            Regex::new(&pattern).expect("valid abbreviation pattern"),
            spoken,
        )
    })
    .collect()
});

/// Remove markdown and HTML structure, keeping the words
pub fn strip_markup(text: &str) -> String {
    let text = CODE_FENCE.replace_all(text, " ");
    let text = HTML_TAG.replace_all(&text, " ");
    let text = LINK.replace_all(&text, "$1");
    let text = BARE_URL.replace_all(&text, " ");
    let text = LINE_MARKER.replace_all(&text, "");
    let text = EMPHASIS.replace_all(&text, "");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

/// Keep the first `max` sentences.
///
/// Sentence boundaries follow Unicode rules, so the Devanagari danda ends a
/// sentence just like a full stop.
pub fn clamp_sentences(text: &str, max: usize) -> String {
    text.unicode_sentences()
        .take(max)
        .collect::<String>()
        .trim()
        .to_string()
}

/// Spell out abbreviations for the synthesizer
pub fn expand_abbreviations(text: &str) -> String {
    ABBREVIATIONS
        .iter()
        .fold(text.to_string(), |acc, (pattern, spoken)| {
            pattern
                .replace_all(&acc, |caps: &regex::Captures<'_>| {
                    format!("{}{}{}", &caps[1], spoken, &caps[2])
                })
                .into_owned()
        })
}

/// Plain, bounded text ready to be spoken
pub fn prepare_for_speech(text: &str, max_sentences: usize) -> String {
    let plain = expand_abbreviations(&strip_markup(text));
    clamp_sentences(&plain, max_sentences)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_markdown() {
        let raw = "## Advice\n- **Spray** neem oil\n- Water _early_ morning\n1. Check leaves";
        assert_eq!(
            strip_markup(raw),
            "Advice Spray neem oil Water early morning Check leaves"
        );
    }

    #[test]
    fn test_strip_links_and_html() {
        let raw = "See [the KVK guide](https://kvk.example/guide) or <b>call</b> https://x.y/z today.";
        assert_eq!(strip_markup(raw), "See the KVK guide or call today.");
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_markup("Mix ```rate = 2``` well."), "Mix well.");
    }

    #[test]
    fn test_clamp_sentences() {
        let text = "Sow in November. Irrigate at crown root stage. Apply urea twice. Harvest in April.";
        assert_eq!(
            clamp_sentences(text, 3),
            "Sow in November. Irrigate at crown root stage. Apply urea twice."
        );
        assert_eq!(clamp_sentences(text, 10), text);
    }

    #[test]
    fn test_clamp_devanagari() {
        let text = "नवंबर में बुवाई करें। हल्की सिंचाई करें। यूरिया डालें।";
        assert_eq!(clamp_sentences(text, 2), "नवंबर में बुवाई करें। हल्की सिंचाई करें।");
    }

    #[test]
    fn test_expand_abbreviations() {
        assert_eq!(
            expand_abbreviations("Use DAP and NPK at 50 kg/ha."),
            "Use D A P and N P K at 50 kilograms per hectare."
        );
        // Inside a word, left alone
        assert_eq!(expand_abbreviations("DAPPER"), "DAPPER");
    }

    #[test]
    fn test_prepare_for_speech() {
        let raw = "**Yes.** Spray *twice*. Then wait. Then check. Then repeat.";
        assert_eq!(prepare_for_speech(raw, 3), "Yes. Spray twice. Then wait.");
    }

    #[test]
    fn test_prepare_for_speech_spells_out_abbreviations() {
        let raw = "Apply **DAP** at 50 kg/ha. Ask your KVK. Then irrigate. Then wait.";
        assert_eq!(
            prepare_for_speech(raw, 2),
            "Apply D A P at 50 kilograms per hectare. Ask your K V K."
        );
    }
}
