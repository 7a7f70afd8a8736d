//! Append-only audit log

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use practice_growth_core::{AuditSink, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub action: String,
    pub entity_type: String,
    pub payload: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct InMemoryAuditLog {
    entries: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().clone()
    }

    pub fn entries_for_action(&self, action: &str) -> Vec<AuditEntry> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.action == action)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditLog {
    async fn record(
        &self,
        action: &str,
        entity_type: &str,
        payload: serde_json::Value,
    ) -> Result<()> {
        let entry = AuditEntry {
            id: Uuid::new_v4(),
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            payload,
            recorded_at: Utc::now(),
        };

        tracing::info!(
            audit_id = %entry.id,
            action = %entry.action,
            entity_type = %entry.entity_type,
            "Audit event recorded"
        );

        self.entries.write().push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_record_and_filter() {
        let log = InMemoryAuditLog::new();
        log.record("lead_captured", "lead", json!({"id": 1}))
            .await
            .unwrap();
        log.record("lead_scored", "lead", json!({"id": 1}))
            .await
            .unwrap();

        assert_eq!(log.entries().len(), 2);
        let scored = log.entries_for_action("lead_scored");
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].payload["id"], 1);
    }
}
