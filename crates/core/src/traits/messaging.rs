//! Outbound text messaging trait

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Acknowledgement returned by a channel for an accepted message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    /// Provider message id, when the provider returns one
    pub message_id: Option<String>,
}

/// A text channel to a caller (WhatsApp, SMS, ...)
#[async_trait]
pub trait MessageChannel: Send + Sync + 'static {
    /// Send `text` to the caller identified by `recipient`
    ///
    /// # Errors
    /// `SummaryDeliveryFailed` when the provider rejects or cannot be reached
    async fn deliver(&self, recipient: &str, text: &str) -> Result<DeliveryReceipt>;

    /// Get channel name
    fn channel_name(&self) -> &str;
}
