//! Staff Assignment Matcher

use practice_growth_config::GrowthConfig;
use practice_growth_core::StaffMember;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffMatch {
    pub staff_id: Uuid,
    pub name: String,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct StaffMatcher {
    config: Arc<GrowthConfig>,
}

impl StaffMatcher {
    pub fn new(config: Arc<GrowthConfig>) -> Self {
        Self { config }
    }

    pub fn match_score(&self, staff: &StaffMember, lead_quality: u32) -> f64 {
        let c = &self.config.staff;
        let mut score = c.base - c.per_open_lead * staff.open_leads as f64
            + c.conversion_weight * staff.conversion_rate;
        if lead_quality >= c.high_quality_min && staff.conversion_rate >= c.high_converting_min {
            score += c.pairing_bonus;
        }
        score
    }

    /// Active staff, best match first. Equal scores keep input order.
    pub fn rank(&self, staff: &[StaffMember], lead_quality: u32) -> Vec<StaffMatch> {
        let mut matches: Vec<StaffMatch> = staff
            .iter()
            .filter(|member| member.active)
            .map(|member| StaffMatch {
                staff_id: member.id,
                name: member.name.clone(),
                score: self.match_score(member, lead_quality),
            })
            .collect();
        // sort_by is stable
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches
    }

    pub fn best(&self, staff: &[StaffMember], lead_quality: u32) -> Option<StaffMatch> {
        self.rank(staff, lead_quality).into_iter().next()
    }
}
