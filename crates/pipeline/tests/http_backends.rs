//! Speech adapters against mocked provider APIs

use std::io::Cursor;
use std::time::Duration;

use agrow_core::{AudioClip, AudioFormat, Language, SpeechSynthesizer, Transcriber};
use agrow_pipeline::{DeepgramConfig, DeepgramTranscriber, GoogleTts, GoogleTtsConfig};
use base64::Engine;
use wiremock::{
    matchers::{body_partial_json, header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

fn speech_wav() -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..4000 {
            let v = ((i as f32 / 8000.0) * 300.0 * std::f32::consts::TAU).sin() * 0.4;
            writer.write_sample((v * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

fn deepgram(server: &MockServer) -> DeepgramTranscriber {
    DeepgramTranscriber::new(DeepgramConfig {
        endpoint: server.uri(),
        api_key: Some("dg_test".to_string()),
        timeout: Duration::from_millis(500),
        ..Default::default()
    })
    .unwrap()
}

fn listen_body(transcript: &str, language: &str) -> serde_json::Value {
    serde_json::json!({
        "results": {
            "channels": [{
                "detected_language": language,
                "language_confidence": 0.97,
                "alternatives": [{ "transcript": transcript, "confidence": 0.91 }]
            }]
        }
    })
}

#[tokio::test]
async fn test_deepgram_transcribes_and_detects_language() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/listen"))
        .and(query_param("detect_language", "true"))
        .and(header("authorization", "Token dg_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listen_body("गेहूं में पीला रतुआ", "hi")))
        .expect(1)
        .mount(&server)
        .await;

    let stt = deepgram(&server);
    let result = stt
        .transcribe(&AudioClip::new(speech_wav(), AudioFormat::Wav))
        .await
        .unwrap();

    assert_eq!(result.text, "गेहूं में पीला रतुआ");
    assert_eq!(result.detected_language.as_deref(), Some("hi"));
    assert!((result.confidence - 0.91).abs() < 1e-6);
}

#[tokio::test]
async fn test_deepgram_blank_transcript_is_empty_audio() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/listen"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listen_body("  ", "en")))
        .mount(&server)
        .await;

    let err = deepgram(&server)
        .transcribe(&AudioClip::new(speech_wav(), AudioFormat::Wav))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "EmptyAudio");
}

#[tokio::test]
async fn test_deepgram_silence_never_reaches_service() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listen_body("x", "en")))
        .expect(0)
        .mount(&server)
        .await;

    let err = deepgram(&server)
        .transcribe(&AudioClip::new(Vec::new(), AudioFormat::Wav))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "EmptyAudio");
}

#[tokio::test]
async fn test_deepgram_server_error_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let err = deepgram(&server)
        .transcribe(&AudioClip::new(speech_wav(), AudioFormat::Wav))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "TranscriptionUnavailable");
}

#[tokio::test]
async fn test_deepgram_slow_service_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(listen_body("late", "en"))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = deepgram(&server)
        .transcribe(&AudioClip::new(speech_wav(), AudioFormat::Wav))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "TranscriptionUnavailable");
}

#[tokio::test]
async fn test_google_tts_decodes_audio() {
    let server = MockServer::start().await;
    let mp3 = b"ID3\x03fake-mp3-frames".to_vec();
    let encoded = base64::engine::general_purpose::STANDARD.encode(&mp3);

    Mock::given(method("POST"))
        .and(path("/v1/text:synthesize"))
        .and(query_param("key", "g_test"))
        .and(body_partial_json(serde_json::json!({
            "voice": { "languageCode": "ta-IN", "name": "ta-IN-Wavenet-A" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "audioContent": encoded
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tts = GoogleTts::new(GoogleTtsConfig {
        endpoint: server.uri(),
        api_key: Some("g_test".to_string()),
        ..Default::default()
    })
    .unwrap();

    let clip = tts.synthesize("வணக்கம்", Language::Tamil).await.unwrap();
    assert_eq!(clip.bytes, mp3);
    assert_eq!(clip.format, AudioFormat::Mp3);
}

#[tokio::test]
async fn test_google_tts_missing_audio_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let tts = GoogleTts::new(GoogleTtsConfig {
        endpoint: server.uri(),
        ..Default::default()
    })
    .unwrap();

    let err = tts.synthesize("hello", Language::English).await.unwrap_err();
    assert_eq!(err.kind(), "SynthesisUnavailable");
}
