//! Staff matcher coefficients

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StaffMatchConfig {
    pub base: f64,
    /// Subtracted per open lead already assigned
    pub per_open_lead: f64,
    /// Multiplied by the historical conversion rate
    pub conversion_weight: f64,
    /// Added when a high-quality lead meets a high-converting staff member
    pub pairing_bonus: f64,
    pub high_quality_min: u32,
    pub high_converting_min: f64,
}

impl Default for StaffMatchConfig {
    fn default() -> Self {
        Self {
            base: 100.0,
            per_open_lead: 5.0,
            conversion_weight: 50.0,
            pairing_bonus: 20.0,
            high_quality_min: 70,
            high_converting_min: 0.3,
        }
    }
}
