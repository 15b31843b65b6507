//! TwiML responses
//!
//! Twilio drives the call from the XML returned by each webhook. Only the
//! verbs the helpline uses are modelled.

use agrow_core::Language;

/// Twilio voice for `<Say>` in `language`.
///
/// The configured voice covers Hindi and English; other languages use
/// Google's standard Indian voices.
pub fn say_voice(language: Language, configured: &str) -> String {
    match language {
        Language::Hindi | Language::English => configured.to_string(),
        other => format!("Google.{}-Standard-A", other.locale()),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Verb {
    Say {
        text: String,
        voice: String,
        locale: String,
    },
    Play(String),
    Record {
        action: String,
        max_length_secs: u32,
        timeout_secs: u32,
    },
    Hangup,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Twiml {
    verbs: Vec<Verb>,
}

impl Twiml {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn say(mut self, text: &str, language: Language, voice: &str) -> Self {
        self.verbs.push(Verb::Say {
            text: text.to_string(),
            voice: voice.to_string(),
            locale: language.locale(),
        });
        self
    }

    pub fn play(mut self, url: &str) -> Self {
        self.verbs.push(Verb::Play(url.to_string()));
        self
    }

    /// Record the caller's next question and post it to `action`
    pub fn record(mut self, action: &str, max_length_secs: u32, timeout_secs: u32) -> Self {
        self.verbs.push(Verb::Record {
            action: action.to_string(),
            max_length_secs,
            timeout_secs,
        });
        self
    }

    pub fn hangup(mut self) -> Self {
        self.verbs.push(Verb::Hangup);
        self
    }

    pub fn render(&self) -> String {
        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><Response>"#);
        for verb in &self.verbs {
            match verb {
                Verb::Say { text, voice, locale } => xml.push_str(&format!(
                    r#"<Say voice="{}" language="{}">{}</Say>"#,
                    escape(voice),
                    escape(locale),
                    escape(text)
                )),
                Verb::Play(url) => xml.push_str(&format!("<Play>{}</Play>", escape(url))),
                Verb::Record {
                    action,
                    max_length_secs,
                    timeout_secs,
                } => xml.push_str(&format!(
                    r#"<Record action="{}" method="POST" maxLength="{}" timeout="{}" playBeep="true" trim="trim-silence"/>"#,
                    escape(action),
                    max_length_secs,
                    timeout_secs
                )),
                Verb::Hangup => xml.push_str("<Hangup/>"),
            }
        }
        xml.push_str("</Response>");
        xml
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_turn_response() {
        let xml = Twiml::new()
            .play("https://agrow.example/audio/abc")
            .record("https://agrow.example/voice/recording", 30, 3)
            .render();
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?><Response><Play>"#));
        assert!(xml.contains(r#"maxLength="30" timeout="3""#));
        assert!(xml.ends_with("</Response>"));
    }

    #[test]
    fn test_say_escapes_text() {
        let xml = Twiml::new()
            .say("Use N & P <50kg>", Language::English, "Polly.Aditi")
            .hangup()
            .render();
        assert!(xml.contains("Use N &amp; P &lt;50kg&gt;"));
        assert!(xml.contains(r#"language="en-IN""#));
        assert!(xml.contains("<Hangup/>"));
    }

    #[test]
    fn test_say_voice_per_language() {
        assert_eq!(say_voice(Language::Hindi, "Polly.Aditi"), "Polly.Aditi");
        assert_eq!(say_voice(Language::Tamil, "Polly.Aditi"), "Google.ta-IN-Standard-A");
    }
}
