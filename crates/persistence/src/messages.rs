//! Simulated message delivery
//!
//! Messages are NOT actually sent. They are kept in memory with a generated
//! id so callers and tests can inspect what would have gone out.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use practice_growth_core::{Error, MessageReceipt, MessageSender, OutboundMessage, Result};

/// Message record kept by the simulated sender
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentMessage {
    pub message_id: Uuid,
    pub message: OutboundMessage,
    pub accepted_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct SimulatedMessageSender {
    sent: RwLock<Vec<SentMessage>>,
}

impl SimulatedMessageSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.read().clone()
    }

    /// Messages addressed to an entity (lead or patient)
    pub fn sent_for(&self, entity_id: Uuid) -> Vec<SentMessage> {
        self.sent
            .read()
            .iter()
            .filter(|m| m.message.entity_id == entity_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl MessageSender for SimulatedMessageSender {
    async fn send(&self, message: &OutboundMessage) -> Result<MessageReceipt> {
        if message.recipient.trim().is_empty() {
            return Err(Error::Delivery(format!(
                "no {} address for {}",
                message.channel.as_str(),
                message.entity_id
            )));
        }

        let message_id = Uuid::new_v4();
        let now = Utc::now();
        self.sent.write().push(SentMessage {
            message_id,
            message: message.clone(),
            accepted_at: now,
        });

        tracing::info!(
            recipient = %message.recipient,
            message_id = %message_id,
            channel = message.channel.as_str(),
            kind = ?message.kind,
            scheduled_at = %message.scheduled_at,
            "Message simulated and recorded"
        );

        tracing::debug!(
            recipient = %message.recipient,
            body = %message.body,
            "Message content (simulated)"
        );

        Ok(MessageReceipt {
            message_id,
            scheduled_at: message.scheduled_at,
            simulated: true,
        })
    }
}
