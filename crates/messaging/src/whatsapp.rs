//! Twilio WhatsApp channel
//!
//! Sends through the Twilio Messages API with both parties addressed as
//! `whatsapp:+<number>`.

use std::time::Duration;

use agrow_config::{MessagingConfig, TelephonyConfig};
use agrow_core::{DeliveryReceipt, MessageChannel, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

use crate::MessagingError;

const WHATSAPP_PREFIX: &str = "whatsapp:";

#[derive(Debug, Clone)]
pub struct WhatsAppConfig {
    pub endpoint: String,
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub timeout: Duration,
}

impl WhatsAppConfig {
    pub fn from_settings(
        messaging: &MessagingConfig,
        telephony: &TelephonyConfig,
    ) -> std::result::Result<Self, MessagingError> {
        let missing = |field: &str| MessagingError::Configuration(format!("{} is required", field));
        Ok(Self {
            endpoint: messaging.endpoint.clone(),
            account_sid: telephony
                .account_sid
                .clone()
                .ok_or_else(|| missing("telephony.account_sid"))?,
            auth_token: telephony
                .auth_token
                .clone()
                .ok_or_else(|| missing("telephony.auth_token"))?,
            from_number: messaging
                .from_number
                .clone()
                .ok_or_else(|| missing("messaging.from_number"))?,
            timeout: Duration::from_millis(messaging.timeout_ms),
        })
    }
}

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    message: String,
}

/// Add the `whatsapp:` scheme unless already present
pub fn whatsapp_address(number: &str) -> std::result::Result<String, MessagingError> {
    let bare = number.trim().trim_start_matches(WHATSAPP_PREFIX);
    let digits = bare.trim_start_matches('+');
    if digits.len() < 8 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(MessagingError::InvalidPhoneNumber(number.to_string()));
    }
    Ok(format!("{}+{}", WHATSAPP_PREFIX, digits))
}

pub struct TwilioWhatsApp {
    client: Client,
    config: WhatsAppConfig,
    from: String,
}

impl TwilioWhatsApp {
    pub fn new(config: WhatsAppConfig) -> std::result::Result<Self, MessagingError> {
        let from = whatsapp_address(&config.from_number)?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MessagingError::Configuration(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            config,
            from,
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.endpoint.trim_end_matches('/'),
            self.config.account_sid
        )
    }

    #[instrument(skip(self, text), fields(to = %to))]
    async fn send(&self, to: &str, text: &str) -> std::result::Result<String, MessagingError> {
        let to = whatsapp_address(to)?;
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[("From", self.from.as_str()), ("To", to.as_str()), ("Body", text)])
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let resource: MessageResource = response
                .json()
                .await
                .map_err(|e| MessagingError::Http(format!("Invalid response: {}", e)))?;
            tracing::debug!(sid = %resource.sid, "WhatsApp message accepted");
            Ok(resource.sid)
        } else {
            let message = response
                .json::<ApiErrorResponse>()
                .await
                .map(|e| e.message)
                .unwrap_or_default();
            Err(MessagingError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl MessageChannel for TwilioWhatsApp {
    async fn deliver(&self, recipient: &str, text: &str) -> Result<DeliveryReceipt> {
        let sid = self.send(recipient, text).await?;
        Ok(DeliveryReceipt {
            message_id: Some(sid),
        })
    }

    fn channel_name(&self) -> &str {
        "whatsapp"
    }
}
