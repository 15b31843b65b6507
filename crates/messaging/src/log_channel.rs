//! Log-only channel

use agrow_core::{DeliveryReceipt, MessageChannel, Result};
use async_trait::async_trait;
use uuid::Uuid;

/// Writes summaries to the log instead of sending them
#[derive(Debug, Default)]
pub struct LogChannel;

impl LogChannel {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MessageChannel for LogChannel {
    async fn deliver(&self, recipient: &str, text: &str) -> Result<DeliveryReceipt> {
        let message_id = Uuid::new_v4().to_string();
        tracing::info!(
            recipient = %recipient,
            message_id = %message_id,
            chars = text.chars().count(),
            summary = %text,
            "Summary recorded (log channel)"
        );
        Ok(DeliveryReceipt {
            message_id: Some(message_id),
        })
    }

    fn channel_name(&self) -> &str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_channel_always_delivers() {
        let receipt = LogChannel::new().deliver("+919812345678", "hello").await.unwrap();
        assert!(receipt.message_id.is_some());
    }
}
