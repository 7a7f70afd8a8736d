//! Side-effect collaborators: audit, delivery, staff statistics

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::messaging::{MessageReceipt, OutboundMessage};
use crate::staff::StaffMember;

/// Append-only audit trail
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(
        &self,
        action: &str,
        entity_type: &str,
        payload: serde_json::Value,
    ) -> Result<()>;
}

/// Outbound delivery (email, SMS, video, mail). Delivery itself is external;
/// the sender only has to accept or reject the message.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<MessageReceipt>;
}

#[async_trait]
pub trait StaffDirectory: Send + Sync {
    async fn list_staff(&self, practice_id: Uuid) -> Result<Vec<StaffMember>>;

    /// Report a change in a member's open lead load; the count never drops
    /// below zero
    async fn adjust_open_leads(
        &self,
        practice_id: Uuid,
        staff_id: Uuid,
        delta: i64,
    ) -> Result<()>;
}
