//! Languages served by the helpline
//!
//! English is the pivot language: regional questions are translated into it
//! before generation and answers are translated back out of it.

use serde::{Deserialize, Serialize};

/// Supported languages (ten Indian languages plus English)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    Hindi,
    Tamil,
    Telugu,
    Kannada,
    Malayalam,
    Bengali,
    Marathi,
    Gujarati,
    Punjabi,
    Odia,
}

impl Language {
    /// The language every question is generated in
    pub const PIVOT: Language = Language::English;

    /// ISO 639-1 code
    pub fn code(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Hindi => "hi",
            Self::Tamil => "ta",
            Self::Telugu => "te",
            Self::Kannada => "kn",
            Self::Malayalam => "ml",
            Self::Bengali => "bn",
            Self::Marathi => "mr",
            Self::Gujarati => "gu",
            Self::Punjabi => "pa",
            Self::Odia => "or",
        }
    }

    /// BCP-47 tag with the Indian region, e.g. `hi-IN`
    pub fn locale(&self) -> String {
        format!("{}-IN", self.code())
    }

    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Hindi => "Hindi",
            Self::Tamil => "Tamil",
            Self::Telugu => "Telugu",
            Self::Kannada => "Kannada",
            Self::Malayalam => "Malayalam",
            Self::Bengali => "Bengali",
            Self::Marathi => "Marathi",
            Self::Gujarati => "Gujarati",
            Self::Punjabi => "Punjabi",
            Self::Odia => "Odia",
        }
    }

    /// Get script used by this language
    pub fn script(&self) -> Script {
        match self {
            Self::Hindi | Self::Marathi => Script::Devanagari,
            Self::Tamil => Script::Tamil,
            Self::Telugu => Script::Telugu,
            Self::Kannada => Script::Kannada,
            Self::Malayalam => Script::Malayalam,
            Self::Bengali => Script::Bengali,
            Self::Gujarati => Script::Gujarati,
            Self::Punjabi => Script::Gurmukhi,
            Self::Odia => Script::Odia,
            Self::English => Script::Latin,
        }
    }

    pub fn is_pivot(&self) -> bool {
        *self == Self::PIVOT
    }

    /// Parse a language tag leniently.
    ///
    /// Accepts bare codes, names and regional tags (`hi-IN`, `ta_IN`,
    /// `en-US`); only the base subtag is considered.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        let lowered = s.trim().to_lowercase();
        let base = lowered
            .split(|c| c == '-' || c == '_')
            .next()
            .unwrap_or_default();
        match base {
            "en" | "eng" | "english" => Some(Self::English),
            "hi" | "hin" | "hindi" => Some(Self::Hindi),
            "ta" | "tam" | "tamil" => Some(Self::Tamil),
            "te" | "tel" | "telugu" => Some(Self::Telugu),
            "kn" | "kan" | "kannada" => Some(Self::Kannada),
            "ml" | "mal" | "malayalam" => Some(Self::Malayalam),
            "bn" | "ben" | "bengali" | "bangla" => Some(Self::Bengali),
            "mr" | "mar" | "marathi" => Some(Self::Marathi),
            "gu" | "guj" | "gujarati" => Some(Self::Gujarati),
            "pa" | "pan" | "punjabi" | "panjabi" => Some(Self::Punjabi),
            "or" | "ori" | "od" | "odia" | "oriya" => Some(Self::Odia),
            _ => None,
        }
    }

    /// Get all supported languages
    pub fn all() -> &'static [Language] {
        &[
            Self::English,
            Self::Hindi,
            Self::Tamil,
            Self::Telugu,
            Self::Kannada,
            Self::Malayalam,
            Self::Bengali,
            Self::Marathi,
            Self::Gujarati,
            Self::Punjabi,
            Self::Odia,
        ]
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Writing systems of the supported languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Script {
    Latin,
    Devanagari,
    Bengali,
    Tamil,
    Telugu,
    Kannada,
    Malayalam,
    Gujarati,
    Gurmukhi,
    Odia,
}

impl Script {
    const INDIC: [Script; 9] = [
        Script::Devanagari,
        Script::Bengali,
        Script::Gurmukhi,
        Script::Gujarati,
        Script::Odia,
        Script::Tamil,
        Script::Telugu,
        Script::Kannada,
        Script::Malayalam,
    ];

    /// Unicode block for this script
    pub fn unicode_range(&self) -> (u32, u32) {
        match self {
            Self::Latin => (0x0041, 0x007A),
            Self::Devanagari => (0x0900, 0x097F),
            Self::Bengali => (0x0980, 0x09FF),
            Self::Gurmukhi => (0x0A00, 0x0A7F),
            Self::Gujarati => (0x0A80, 0x0AFF),
            Self::Odia => (0x0B00, 0x0B7F),
            Self::Tamil => (0x0B80, 0x0BFF),
            Self::Telugu => (0x0C00, 0x0C7F),
            Self::Kannada => (0x0C80, 0x0CFF),
            Self::Malayalam => (0x0D00, 0x0D7F),
        }
    }

    pub fn contains_char(&self, c: char) -> bool {
        let code = c as u32;
        let (start, end) = self.unicode_range();
        (start..=end).contains(&code)
    }

    /// Language a transcript in this script is most likely spoken in.
    ///
    /// Devanagari is shared by Hindi and Marathi; Hindi is chosen.
    pub fn primary_language(&self) -> Language {
        match self {
            Self::Latin => Language::English,
            Self::Devanagari => Language::Hindi,
            Self::Bengali => Language::Bengali,
            Self::Gurmukhi => Language::Punjabi,
            Self::Gujarati => Language::Gujarati,
            Self::Odia => Language::Odia,
            Self::Tamil => Language::Tamil,
            Self::Telugu => Language::Telugu,
            Self::Kannada => Language::Kannada,
            Self::Malayalam => Language::Malayalam,
        }
    }

    /// Most frequent Indic script in `text`, if it has more than
    /// `min_chars` characters.
    ///
    /// Latin is ignored because romanized regional speech is common in
    /// transcripts and says nothing reliable about the spoken language.
    pub fn detect_indic(text: &str, min_chars: usize) -> Option<Self> {
        let mut counts = [0usize; 9];
        for c in text.chars() {
            if let Some(idx) = Self::INDIC.iter().position(|s| s.contains_char(c)) {
                counts[idx] += 1;
            }
        }

        // First maximum wins so ties resolve the same way every time
        let (idx, count) = counts
            .iter()
            .enumerate()
            .fold((0, 0), |best, (i, &n)| if n > best.1 { (i, n) } else { best });

        (count > min_chars).then(|| Self::INDIC[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_code() {
        assert_eq!(Language::Hindi.code(), "hi");
        assert_eq!(Language::Odia.code(), "or");
        assert_eq!(Language::English.code(), "en");
        assert_eq!(Language::Tamil.locale(), "ta-IN");
    }

    #[test]
    fn test_language_from_str() {
        assert_eq!(Language::from_str_loose("hi"), Some(Language::Hindi));
        assert_eq!(Language::from_str_loose("Hindi"), Some(Language::Hindi));
        assert_eq!(Language::from_str_loose("ta-IN"), Some(Language::Tamil));
        assert_eq!(Language::from_str_loose("en_US"), Some(Language::English));
        assert_eq!(Language::from_str_loose("bangla"), Some(Language::Bengali));
        assert_eq!(Language::from_str_loose("fr"), None);
        assert_eq!(Language::from_str_loose(""), None);
    }

    #[test]
    fn test_pivot() {
        assert!(Language::English.is_pivot());
        assert!(!Language::Hindi.is_pivot());
    }

    #[test]
    fn test_script_detect() {
        assert_eq!(
            Script::detect_indic("मेरी गेहूं की फसल", 5),
            Some(Script::Devanagari)
        );
        assert_eq!(Script::detect_indic("வணக்கம் நண்பரே", 5), Some(Script::Tamil));
        assert_eq!(Script::detect_indic("my wheat crop", 5), None);
        // Too few characters to trust
        assert_eq!(Script::detect_indic("नमस", 5), None);
    }

    #[test]
    fn test_devanagari_maps_to_hindi() {
        assert_eq!(Script::Devanagari.primary_language(), Language::Hindi);
        assert_eq!(Language::Marathi.script(), Script::Devanagari);
    }

    #[test]
    fn test_all_languages() {
        assert_eq!(Language::all().len(), 11);
        for lang in Language::all() {
            assert_eq!(Language::from_str_loose(lang.code()), Some(*lang));
        }
    }
}
