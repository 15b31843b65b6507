//! Language resolution
//!
//! Picks the working language of a call: first from the caller's number,
//! then from what the caller is heard speaking. The result is always a
//! concrete supported [`Language`]; there is no "auto" value.

use agrow_config::constants::{language_prefixes, policy};
use agrow_core::{Language, Transcription};
use agrow_text_processing::ScriptDetector;

/// A language hint with the confidence it was reported at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LanguageDetection {
    pub language: Language,
    pub confidence: f32,
}

#[derive(Debug, Clone)]
pub struct LanguageResolver {
    default_language: Language,
    switch_confidence: f32,
    script_confidence: f32,
    script_detector: ScriptDetector,
}

impl Default for LanguageResolver {
    fn default() -> Self {
        Self {
            default_language: Language::from_str_loose(policy::DEFAULT_LANGUAGE)
                .unwrap_or(Language::Hindi),
            switch_confidence: policy::LANGUAGE_SWITCH_CONFIDENCE,
            script_confidence: policy::SCRIPT_DETECTION_CONFIDENCE,
            script_detector: ScriptDetector::default(),
        }
    }
}

impl LanguageResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_language(&self) -> Language {
        self.default_language
    }

    /// Language suggested by the caller's number, or the default.
    ///
    /// Longest matching prefix wins. Spaces, dashes and a leading `00` are
    /// normalized before matching.
    pub fn from_caller(&self, caller: &str) -> Language {
        let normalized = normalize_number(caller);
        language_prefixes::PREFIXES
            .iter()
            .filter(|(prefix, _)| normalized.starts_with(prefix))
            .max_by_key(|(prefix, _)| prefix.len())
            .and_then(|(_, code)| Language::from_str_loose(code))
            .unwrap_or(self.default_language)
    }

    /// Language hint for a transcription.
    ///
    /// A tag from the transcriber is used when it names a supported
    /// language. Without a tag, the script of the text is consulted.
    pub fn detect(&self, transcription: &Transcription) -> Option<LanguageDetection> {
        match transcription.detected_language.as_deref() {
            Some(tag) => Language::from_str_loose(tag).map(|language| LanguageDetection {
                language,
                confidence: transcription.confidence,
            }),
            None => self
                .script_detector
                .detect(&transcription.text)
                .map(|language| LanguageDetection {
                    language,
                    confidence: self.script_confidence,
                }),
        }
    }

    /// Resolve the working language.
    ///
    /// With no current language (turn one) the caller's number decides.
    /// Afterwards a detection replaces the current language only when it is
    /// confident enough and differs from it.
    pub fn resolve(
        &self,
        caller: &str,
        current: Option<Language>,
        detection: Option<LanguageDetection>,
    ) -> Language {
        let current = current.unwrap_or_else(|| self.from_caller(caller));
        match detection {
            Some(d) if d.language != current && d.confidence >= self.switch_confidence => {
                tracing::info!(
                    from = %current,
                    to = %d.language,
                    confidence = d.confidence,
                    "Switching call language"
                );
                d.language
            }
            _ => current,
        }
    }
}

fn normalize_number(caller: &str) -> String {
    let digits: String = caller
        .trim()
        .trim_start_matches("whatsapp:")
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();
    match digits.strip_prefix("00") {
        Some(rest) => format!("+{}", rest),
        None => digits,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcription(text: &str, tag: Option<&str>, confidence: f32) -> Transcription {
        Transcription::new(text, tag.map(str::to_string), confidence)
    }

    #[test]
    fn test_caller_prefix_longest_match() {
        let resolver = LanguageResolver::new();
        assert_eq!(resolver.from_caller("+91 44 2345 6789"), Language::Tamil);
        assert_eq!(resolver.from_caller("+911612345678"), Language::Punjabi);
        assert_eq!(resolver.from_caller("00914423456789"), Language::Tamil);
        assert_eq!(resolver.from_caller("+14155550100"), Language::English);
    }

    #[test]
    fn test_unknown_caller_gets_default() {
        let resolver = LanguageResolver::new();
        assert_eq!(resolver.from_caller("+919876543210"), Language::Hindi);
        assert_eq!(resolver.from_caller("anonymous"), Language::Hindi);
        assert_eq!(resolver.from_caller(""), Language::Hindi);
    }

    #[test]
    fn test_confident_detection_switches() {
        let resolver = LanguageResolver::new();
        let detection = Some(LanguageDetection {
            language: Language::Tamil,
            confidence: 0.92,
        });
        assert_eq!(
            resolver.resolve("+919876543210", Some(Language::Hindi), detection),
            Language::Tamil
        );
    }

    #[test]
    fn test_low_confidence_detection_is_ignored() {
        let resolver = LanguageResolver::new();
        let detection = Some(LanguageDetection {
            language: Language::Tamil,
            confidence: 0.5,
        });
        assert_eq!(
            resolver.resolve("+919876543210", Some(Language::Hindi), detection),
            Language::Hindi
        );
    }

    #[test]
    fn test_first_turn_uses_caller_then_detection() {
        let resolver = LanguageResolver::new();
        assert_eq!(resolver.resolve("+9144123", None, None), Language::Tamil);
        let detection = Some(LanguageDetection {
            language: Language::English,
            confidence: 0.99,
        });
        assert_eq!(resolver.resolve("+9144123", None, detection), Language::English);
    }

    #[test]
    fn test_unsupported_tag_gives_no_detection() {
        let resolver = LanguageResolver::new();
        assert_eq!(resolver.detect(&transcription("bonjour", Some("fr"), 0.99)), None);
    }

    #[test]
    fn test_script_fallback_when_untagged() {
        let resolver = LanguageResolver::new();
        let detection = resolver
            .detect(&transcription("நெல் பயிரில் பூச்சி", None, 0.4))
            .unwrap();
        assert_eq!(detection.language, Language::Tamil);
        assert!((detection.confidence - policy::SCRIPT_DETECTION_CONFIDENCE).abs() < f32::EPSILON);
    }

    #[test]
    fn test_tag_with_region_subtag() {
        let resolver = LanguageResolver::new();
        let detection = resolver.detect(&transcription("x", Some("hi-IN"), 0.9)).unwrap();
        assert_eq!(detection.language, Language::Hindi);
    }
}
