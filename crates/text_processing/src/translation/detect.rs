//! Script-based language hints

use agrow_config::constants::policy;
use agrow_core::{Language, Script};

/// Infers a language from the characters of a transcript.
///
/// Used when the recognizer returns no language tag. Only Indic scripts are
/// considered: Latin text is as likely to be romanized Hindi as English.
#[derive(Debug, Clone, Copy)]
pub struct ScriptDetector {
    min_chars: usize,
}

impl Default for ScriptDetector {
    fn default() -> Self {
        Self {
            min_chars: policy::SCRIPT_DETECTION_MIN_CHARS,
        }
    }
}

impl ScriptDetector {
    pub fn new(min_chars: usize) -> Self {
        Self { min_chars }
    }

    pub fn detect(&self, text: &str) -> Option<Language> {
        Script::detect_indic(text, self.min_chars).map(|script| script.primary_language())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_scripts() {
        let detector = ScriptDetector::default();
        assert_eq!(detector.detect("धान की फसल में कीड़े"), Some(Language::Hindi));
        assert_eq!(detector.detect("ਕਣਕ ਦੀ ਫ਼ਸਲ ਬਾਰੇ"), Some(Language::Punjabi));
        assert_eq!(detector.detect("ವಾತಾವರಣ ಹೇಗಿದೆ"), Some(Language::Kannada));
    }

    #[test]
    fn test_latin_gives_no_hint() {
        assert_eq!(ScriptDetector::default().detect("mera dhaan sookh raha hai"), None);
    }

    #[test]
    fn test_mixed_text_takes_majority() {
        let detector = ScriptDetector::default();
        assert_eq!(
            detector.detect("urea कितना डालना चाहिए"),
            Some(Language::Hindi)
        );
    }
}
