//! Summary delivery
//!
//! Text channels used to send the post-call summary to the caller:
//! - Twilio WhatsApp (`whatsapp:` addressed Messages API)
//! - Log channel that only records the message, for local runs

pub mod log_channel;
pub mod whatsapp;

pub use log_channel::LogChannel;
pub use whatsapp::{TwilioWhatsApp, WhatsAppConfig};

use std::sync::Arc;

use agrow_config::{MessagingConfig, TelephonyConfig};
use agrow_core::MessageChannel;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MessagingError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid phone number: {0}")]
    InvalidPhoneNumber(String),

    #[error("Missing configuration: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for MessagingError {
    fn from(err: reqwest::Error) -> Self {
        MessagingError::Http(err.to_string())
    }
}

impl From<MessagingError> for agrow_core::Error {
    fn from(err: MessagingError) -> Self {
        match err {
            MessagingError::Configuration(msg) => agrow_core::Error::Config(msg),
            other => agrow_core::Error::SummaryDeliveryFailed(other.to_string()),
        }
    }
}

/// Build the configured summary channel.
///
/// WhatsApp needs messaging enabled plus Twilio credentials and a sender;
/// anything less falls back to the log channel.
pub fn create_channel(
    messaging: &MessagingConfig,
    telephony: &TelephonyConfig,
) -> Result<Arc<dyn MessageChannel>, MessagingError> {
    if !messaging.enabled {
        tracing::info!("Summary messaging disabled; summaries go to the log");
        return Ok(Arc::new(LogChannel::new()));
    }

    let config = WhatsAppConfig::from_settings(messaging, telephony)?;
    tracing::info!(from = %config.from_number, "WhatsApp summary channel ready");
    Ok(Arc::new(TwilioWhatsApp::new(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_uses_log_channel() {
        let channel =
            create_channel(&MessagingConfig::default(), &TelephonyConfig::default()).unwrap();
        assert_eq!(channel.channel_name(), "log");
    }

    #[test]
    fn test_enabled_without_credentials_is_config_error() {
        let messaging = MessagingConfig {
            enabled: true,
            from_number: None,
            ..Default::default()
        };
        let telephony = TelephonyConfig {
            account_sid: None,
            auth_token: None,
            ..Default::default()
        };
        assert!(matches!(
            create_channel(&messaging, &telephony),
            Err(MessagingError::Configuration(_))
        ));
    }
}
