//! WhatsApp delivery against a mock Twilio API

use std::time::Duration;

use agrow_core::MessageChannel;
use agrow_messaging::{TwilioWhatsApp, WhatsAppConfig};
use wiremock::{
    matchers::{body_string_contains, header_exists, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn channel(server: &MockServer) -> TwilioWhatsApp {
    TwilioWhatsApp::new(WhatsAppConfig {
        endpoint: server.uri(),
        account_sid: "AC123".to_string(),
        auth_token: "secret".to_string(),
        from_number: "+14155238886".to_string(),
        timeout: Duration::from_millis(500),
    })
    .unwrap()
}

#[tokio::test]
async fn delivers_with_whatsapp_addressing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
        .and(header_exists("authorization"))
        .and(body_string_contains("To=whatsapp%3A%2B919812345678"))
        .and(body_string_contains("From=whatsapp%3A%2B14155238886"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "sid": "SM42", "status": "queued"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let receipt = channel(&server)
        .deliver("+919812345678", "Your Agrow call summary")
        .await
        .unwrap();
    assert_eq!(receipt.message_id.as_deref(), Some("SM42"));
}

#[tokio::test]
async fn api_rejection_is_delivery_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "code": 63007, "message": "Channel not found"
        })))
        .mount(&server)
        .await;

    let err = channel(&server).deliver("+919812345678", "x").await.unwrap_err();
    assert_eq!(err.kind(), "SummaryDeliveryFailed");
}

#[tokio::test]
async fn invalid_recipient_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let err = channel(&server).deliver("unknown", "x").await.unwrap_err();
    assert_eq!(err.kind(), "SummaryDeliveryFailed");
}
