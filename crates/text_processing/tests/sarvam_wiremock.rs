//! Sarvam translator against a mocked API

use std::time::Duration;

use agrow_core::{Language, Translator};
use agrow_text_processing::{SarvamConfig, SarvamTranslator};
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn translator(server: &MockServer) -> SarvamTranslator {
    SarvamTranslator::new(SarvamConfig {
        endpoint: server.uri(),
        api_key: Some("sv_test".to_string()),
        timeout: Duration::from_millis(500),
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_translates_with_locale_codes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/translate"))
        .and(header("api-subscription-key", "sv_test"))
        .and(body_partial_json(serde_json::json!({
            "source_language_code": "hi-IN",
            "target_language_code": "en-IN"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "translated_text": "Yellow rust in wheat"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let out = translator(&server)
        .translate("गेहूं में पीला रतुआ", Language::Hindi, Language::English)
        .await
        .unwrap();
    assert_eq!(out, "Yellow rust in wheat");
}

#[tokio::test]
async fn test_same_language_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let out = translator(&server)
        .translate("வணக்கம்", Language::Tamil, Language::Tamil)
        .await
        .unwrap();
    assert_eq!(out, "வணக்கம்");
}

#[tokio::test]
async fn test_service_error_is_translation_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let err = translator(&server)
        .translate("hello", Language::English, Language::Hindi)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "TranslationUnavailable");
}

#[tokio::test]
async fn test_timeout_is_translation_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "translated_text": "late" }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = translator(&server)
        .translate("hello", Language::English, Language::Hindi)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "TranslationUnavailable");
}
