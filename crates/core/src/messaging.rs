//! Outbound message envelope handed to the delivery collaborator

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Delivery channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Sms,
    Video,
    Phone,
    Mail,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
            Self::Video => "video",
            Self::Phone => "phone",
            Self::Mail => "mail",
        }
    }
}

/// Why a message is being sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Nurture,
    ReferralRequest,
    ReviewRequest,
    Reactivation,
}

/// Rendered message ready for delivery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub kind: MessageKind,
    pub channel: Channel,
    pub recipient: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub body: String,
    pub scheduled_at: DateTime<Utc>,
    /// Lead or patient the message concerns
    pub entity_id: Uuid,
}

/// Acknowledgement from the sender
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageReceipt {
    pub message_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub simulated: bool,
}
