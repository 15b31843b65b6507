//! Fixed spoken prompts
//!
//! Greeting, apology, "unable to speak" and goodbye lines per language.
//! They are synthesized once at startup where the synthesizer allows; a
//! built-in tone stands in when no rendered audio exists.

use std::io::Cursor;
use std::time::Duration;

use agrow_core::{AudioClip, AudioFormat, Language, SpeechSynthesizer};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CueKind {
    Greeting,
    Apology,
    UnableToSpeak,
    Goodbye,
}

impl CueKind {
    pub const ALL: [CueKind; 4] = [
        CueKind::Greeting,
        CueKind::Apology,
        CueKind::UnableToSpeak,
        CueKind::Goodbye,
    ];
}

/// A prompt's text plus its rendered audio when available
#[derive(Debug, Clone)]
pub struct Cue {
    pub kind: CueKind,
    pub language: Language,
    pub text: &'static str,
    pub audio: Option<AudioClip>,
}

pub fn cue_text(kind: CueKind, language: Language) -> &'static str {
    use CueKind::*;
    use Language::*;
    match (language, kind) {
        (English, Greeting) => "Welcome to Agrow, the agricultural helpline for farmers. Please ask your question after the beep.",
        (English, Apology) => "Sorry, I could not answer that. Please ask your question again after the beep.",
        (English, UnableToSpeak) => "Sorry, I cannot speak the answer right now. You will receive it as a message after the call.",
        (English, Goodbye) => "Thank you for calling Agrow. A summary will be sent to you. Goodbye.",

        (Hindi, Greeting) => "एग्रो कृषि हेल्पलाइन में आपका स्वागत है। बीप के बाद अपना सवाल पूछें।",
        (Hindi, Apology) => "माफ़ कीजिए, मैं इसका जवाब नहीं दे सका। कृपया बीप के बाद अपना सवाल फिर से पूछें।",
        (Hindi, UnableToSpeak) => "माफ़ कीजिए, अभी मैं जवाब बोल नहीं पा रहा हूँ। कॉल के बाद आपको जवाब संदेश में मिलेगा।",
        (Hindi, Goodbye) => "एग्रो को कॉल करने के लिए धन्यवाद। आपको सारांश भेजा जाएगा। नमस्ते।",

        (Tamil, Greeting) => "அக்ரோ வேளாண் உதவி மையத்திற்கு வரவேற்கிறோம். பீப் ஒலிக்குப் பிறகு உங்கள் கேள்வியைக் கேளுங்கள்.",
        (Tamil, Apology) => "மன்னிக்கவும், என்னால் பதில் சொல்ல முடியவில்லை. பீப் ஒலிக்குப் பிறகு மீண்டும் கேளுங்கள்.",
        (Tamil, UnableToSpeak) => "மன்னிக்கவும், இப்போது பதிலைப் பேச முடியவில்லை. அழைப்புக்குப் பிறகு பதில் செய்தியாக அனுப்பப்படும்.",
        (Tamil, Goodbye) => "அக்ரோவை அழைத்ததற்கு நன்றி. சுருக்கம் உங்களுக்கு அனுப்பப்படும். வணக்கம்.",

        (Telugu, Greeting) => "అగ్రో వ్యవసాయ హెల్ప్‌లైన్‌కు స్వాగతం. బీప్ తర్వాత మీ ప్రశ్న అడగండి.",
        (Telugu, Apology) => "క్షమించండి, నేను సమాధానం ఇవ్వలేకపోయాను. బీప్ తర్వాత మళ్ళీ అడగండి.",
        (Telugu, UnableToSpeak) => "క్షమించండి, ఇప్పుడు సమాధానం చెప్పలేకపోతున్నాను. కాల్ తర్వాత సమాధానం సందేశంగా వస్తుంది.",
        (Telugu, Goodbye) => "అగ్రోకు కాల్ చేసినందుకు ధన్యవాదాలు. సారాంశం మీకు పంపబడుతుంది. నమస్కారం.",

        (Kannada, Greeting) => "ಅಗ್ರೋ ಕೃಷಿ ಸಹಾಯವಾಣಿಗೆ ಸ್ವಾಗತ. ಬೀಪ್ ನಂತರ ನಿಮ್ಮ ಪ್ರಶ್ನೆ ಕೇಳಿ.",
        (Kannada, Apology) => "ಕ್ಷಮಿಸಿ, ನನಗೆ ಉತ್ತರಿಸಲು ಆಗಲಿಲ್ಲ. ಬೀಪ್ ನಂತರ ಮತ್ತೆ ಕೇಳಿ.",
        (Kannada, UnableToSpeak) => "ಕ್ಷಮಿಸಿ, ಈಗ ಉತ್ತರವನ್ನು ಹೇಳಲು ಆಗುತ್ತಿಲ್ಲ. ಕರೆಯ ನಂತರ ಉತ್ತರ ಸಂದೇಶವಾಗಿ ಬರುತ್ತದೆ.",
        (Kannada, Goodbye) => "ಅಗ್ರೋಗೆ ಕರೆ ಮಾಡಿದ್ದಕ್ಕೆ ಧನ್ಯವಾದಗಳು. ಸಾರಾಂಶವನ್ನು ನಿಮಗೆ ಕಳುಹಿಸಲಾಗುವುದು. ನಮಸ್ಕಾರ.",

        (Malayalam, Greeting) => "അഗ്രോ കാർഷിക ഹെൽപ്‌ലൈനിലേക്ക് സ്വാഗതം. ബീപ്പിന് ശേഷം നിങ്ങളുടെ ചോദ്യം ചോദിക്കുക.",
        (Malayalam, Apology) => "ക്ഷമിക്കണം, എനിക്ക് ഉത്തരം നൽകാൻ കഴിഞ്ഞില്ല. ബീപ്പിന് ശേഷം വീണ്ടും ചോദിക്കുക.",
        (Malayalam, UnableToSpeak) => "ക്ഷമിക്കണം, ഇപ്പോൾ ഉത്തരം പറയാൻ കഴിയുന്നില്ല. കോളിന് ശേഷം ഉത്തരം സന്ദേശമായി ലഭിക്കും.",
        (Malayalam, Goodbye) => "അഗ്രോയെ വിളിച്ചതിന് നന്ദി. സംഗ്രഹം നിങ്ങൾക്ക് അയയ്ക്കും. നമസ്കാരം.",

        (Bengali, Greeting) => "অ্যাগ্রো কৃষি হেল্পলাইনে স্বাগতম। বিপের পরে আপনার প্রশ্ন করুন।",
        (Bengali, Apology) => "দুঃখিত, আমি উত্তর দিতে পারিনি। বিপের পরে আবার প্রশ্ন করুন।",
        (Bengali, UnableToSpeak) => "দুঃখিত, এখন উত্তরটি বলতে পারছি না। কলের পরে উত্তরটি বার্তায় পাঠানো হবে।",
        (Bengali, Goodbye) => "অ্যাগ্রোতে কল করার জন্য ধন্যবাদ। আপনাকে একটি সারাংশ পাঠানো হবে। নমস্কার।",

        (Marathi, Greeting) => "अ‍ॅग्रो कृषी हेल्पलाइनमध्ये आपले स्वागत आहे. बीपनंतर आपला प्रश्न विचारा.",
        (Marathi, Apology) => "माफ करा, मला उत्तर देता आले नाही. बीपनंतर पुन्हा प्रश्न विचारा.",
        (Marathi, UnableToSpeak) => "माफ करा, आत्ता उत्तर बोलता येत नाही. कॉलनंतर उत्तर संदेशाद्वारे मिळेल.",
        (Marathi, Goodbye) => "अ‍ॅग्रोला कॉल केल्याबद्दल धन्यवाद. आपल्याला सारांश पाठवला जाईल. नमस्कार.",

        (Gujarati, Greeting) => "એગ્રો કૃષિ હેલ્પલાઇનમાં આપનું સ્વાગત છે. બીપ પછી તમારો પ્રશ્ન પૂછો.",
        (Gujarati, Apology) => "માફ કરશો, હું જવાબ આપી શક્યો નહીં. બીપ પછી ફરીથી પૂછો.",
        (Gujarati, UnableToSpeak) => "માફ કરશો, હમણાં જવાબ બોલી શકાતો નથી. કૉલ પછી જવાબ સંદેશ દ્વારા મળશે.",
        (Gujarati, Goodbye) => "એગ્રોને કૉલ કરવા બદલ આભાર. તમને સારાંશ મોકલવામાં આવશે. નમસ્તે.",

        (Punjabi, Greeting) => "ਐਗਰੋ ਖੇਤੀ ਹੈਲਪਲਾਈਨ ਵਿੱਚ ਤੁਹਾਡਾ ਸੁਆਗਤ ਹੈ। ਬੀਪ ਤੋਂ ਬਾਅਦ ਆਪਣਾ ਸਵਾਲ ਪੁੱਛੋ।",
        (Punjabi, Apology) => "ਮਾਫ਼ ਕਰਨਾ, ਮੈਂ ਜਵਾਬ ਨਹੀਂ ਦੇ ਸਕਿਆ। ਬੀਪ ਤੋਂ ਬਾਅਦ ਦੁਬਾਰਾ ਪੁੱਛੋ।",
        (Punjabi, UnableToSpeak) => "ਮਾਫ਼ ਕਰਨਾ, ਹੁਣ ਜਵਾਬ ਬੋਲ ਨਹੀਂ ਸਕਦਾ। ਕਾਲ ਤੋਂ ਬਾਅਦ ਜਵਾਬ ਸੁਨੇਹੇ ਵਿੱਚ ਮਿਲੇਗਾ।",
        (Punjabi, Goodbye) => "ਐਗਰੋ ਨੂੰ ਕਾਲ ਕਰਨ ਲਈ ਧੰਨਵਾਦ। ਤੁਹਾਨੂੰ ਸਾਰ ਭੇਜਿਆ ਜਾਵੇਗਾ। ਸਤ ਸ੍ਰੀ ਅਕਾਲ।",

        (Odia, Greeting) => "ଆଗ୍ରୋ କୃଷି ହେଲ୍ପଲାଇନକୁ ସ୍ୱାଗତ। ବିପ୍ ପରେ ଆପଣଙ୍କ ପ୍ରଶ୍ନ ପଚାରନ୍ତୁ।",
        (Odia, Apology) => "କ୍ଷମା କରିବେ, ମୁଁ ଉତ୍ତର ଦେଇପାରିଲି ନାହିଁ। ବିପ୍ ପରେ ପୁଣି ପଚାରନ୍ତୁ।",
        (Odia, UnableToSpeak) => "କ୍ଷମା କରିବେ, ଏବେ ଉତ୍ତର କହିପାରୁନାହିଁ। କଲ୍ ପରେ ଉତ୍ତର ବାର୍ତ୍ତା ଭାବେ ମିଳିବ।",
        (Odia, Goodbye) => "ଆଗ୍ରୋକୁ କଲ୍ କରିଥିବାରୁ ଧନ୍ୟବାଦ। ଆପଣଙ୍କୁ ସାରାଂଶ ପଠାଯିବ। ନମସ୍କାର।",
    }
}

/// Pre-rendered prompt audio
pub struct ResponseCues {
    rendered: DashMap<(Language, CueKind), AudioClip>,
    tone: AudioClip,
}

impl Default for ResponseCues {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseCues {
    pub fn new() -> Self {
        let tone = match render_tone() {
            Ok(bytes) => AudioClip::new(bytes, AudioFormat::Wav),
            Err(e) => {
                tracing::error!(error = %e, "Failed to render built-in tone");
                AudioClip::new(Vec::new(), AudioFormat::Wav)
            }
        };
        Self {
            rendered: DashMap::new(),
            tone,
        }
    }

    /// Synthesize every cue for `languages`. Failures are logged and the
    /// cue keeps no audio. Returns how many cues were rendered.
    pub async fn prerender(
        &self,
        synthesizer: &dyn SpeechSynthesizer,
        languages: &[Language],
        limit: Duration,
    ) -> usize {
        let mut rendered = 0;
        for &language in languages {
            for kind in CueKind::ALL {
                let text = cue_text(kind, language);
                match tokio::time::timeout(limit, synthesizer.synthesize(text, language)).await {
                    Ok(Ok(clip)) if !clip.is_empty() => {
                        self.rendered.insert((language, kind), clip);
                        rendered += 1;
                    }
                    Ok(Ok(_)) => {
                        tracing::warn!(language = %language, cue = ?kind, "Synthesizer returned empty cue audio");
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(language = %language, cue = ?kind, error = %e, "Cue synthesis failed");
                    }
                    Err(_) => {
                        tracing::warn!(language = %language, cue = ?kind, "Cue synthesis timed out");
                    }
                }
            }
        }
        tracing::info!(rendered, "Pre-rendered spoken cues");
        rendered
    }

    pub fn cue(&self, kind: CueKind, language: Language) -> Cue {
        Cue {
            kind,
            language,
            text: cue_text(kind, language),
            audio: self.rendered.get(&(language, kind)).map(|c| c.value().clone()),
        }
    }

    /// Rendered cue audio, or the built-in tone
    pub fn audio_or_tone(&self, kind: CueKind, language: Language) -> AudioClip {
        self.rendered
            .get(&(language, kind))
            .map(|c| c.value().clone())
            .unwrap_or_else(|| self.tone.clone())
    }

    pub fn tone(&self) -> &AudioClip {
        &self.tone
    }
}

/// Two short 660 Hz beeps, 8 kHz mono PCM
fn render_tone() -> Result<Vec<u8>, hound::Error> {
    const RATE: u32 = 8_000;
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        let beep = RATE as usize / 5;
        let gap = RATE as usize / 10;
        for segment in [beep, gap, beep] {
            let silent = segment == gap;
            for n in 0..segment {
                let sample = if silent {
                    0
                } else {
                    let t = n as f32 / RATE as f32;
                    ((t * 660.0 * std::f32::consts::TAU).sin() * i16::MAX as f32 * 0.4) as i16
                };
                writer.write_sample(sample)?;
            }
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use agrow_core::{Error, Result};
    use async_trait::async_trait;

    struct HindiOnly;

    #[async_trait]
    impl SpeechSynthesizer for HindiOnly {
        async fn synthesize(&self, text: &str, language: Language) -> Result<AudioClip> {
            if language == Language::Hindi {
                Ok(AudioClip::new(text.as_bytes().to_vec(), AudioFormat::Mp3))
            } else {
                Err(Error::SynthesisUnavailable("no voice".into()))
            }
        }

        fn model_name(&self) -> &str {
            "hindi-only"
        }
    }

    #[test]
    fn test_every_language_has_every_cue() {
        for &language in Language::all() {
            for kind in CueKind::ALL {
                assert!(!cue_text(kind, language).is_empty());
            }
        }
    }

    #[test]
    fn test_builtin_tone_is_wav() {
        let cues = ResponseCues::new();
        assert!(!cues.tone().is_empty());
        assert_eq!(AudioFormat::sniff(&cues.tone().bytes), Some(AudioFormat::Wav));
    }

    #[tokio::test]
    async fn test_prerender_keeps_failures_silent() {
        let cues = ResponseCues::new();
        let rendered = cues
            .prerender(&HindiOnly, &[Language::Hindi, Language::Tamil], Duration::from_secs(1))
            .await;
        assert_eq!(rendered, CueKind::ALL.len());
        assert!(cues.cue(CueKind::Apology, Language::Hindi).audio.is_some());
        assert!(cues.cue(CueKind::Apology, Language::Tamil).audio.is_none());
        assert_eq!(
            cues.audio_or_tone(CueKind::Apology, Language::Tamil),
            cues.tone().clone()
        );
    }
}
