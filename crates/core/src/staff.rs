//! Staff statistics provided by the staff directory

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: Uuid,
    pub practice_id: Uuid,
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Leads currently assigned and not yet terminal
    #[serde(default)]
    pub open_leads: u32,
    /// Historical share of assigned leads that converted, 0.0-1.0
    #[serde(default)]
    pub conversion_rate: f64,
}

fn default_active() -> bool {
    true
}
