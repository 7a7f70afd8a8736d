//! Existing-patient history consumed by the referral and reactivation engines

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::lead::ContactInfo;
use crate::reputation::ReviewPlatform;

/// A review the patient left for the practice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientReview {
    pub platform: ReviewPlatform,
    /// Star rating, 1.0-5.0
    pub rating: f64,
    pub left_at: DateTime<Utc>,
}

/// Visit and loyalty history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisitHistory {
    #[serde(default)]
    pub total_visits: u32,
    #[serde(default)]
    pub visits_last_12_months: u32,
    /// Current streak of kept appointments without a miss
    #[serde(default)]
    pub consecutive_visits: u32,
    #[serde(default)]
    pub first_visit_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_visit_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub appointments_scheduled: u32,
    #[serde(default)]
    pub appointments_completed: u32,
    #[serde(default)]
    pub lifetime_value: f64,
    /// Clinician-recorded outcome of the most recent treatment plan
    #[serde(default)]
    pub treatment_outcome_positive: Option<bool>,
    #[serde(default)]
    pub review: Option<PatientReview>,
    #[serde(default)]
    pub prior_referrals: u32,
    /// Survey answer when the patient actually responded (0-10)
    #[serde(default)]
    pub survey_nps: Option<u8>,
}

impl VisitHistory {
    /// Completed / scheduled, or `None` when nothing was ever scheduled
    pub fn completion_rate(&self) -> Option<f64> {
        if self.appointments_scheduled == 0 {
            None
        } else {
            Some(
                (self.appointments_completed as f64 / self.appointments_scheduled as f64)
                    .clamp(0.0, 1.0),
            )
        }
    }

    pub fn days_since_last_visit(&self, now: DateTime<Utc>) -> Option<u32> {
        self.last_visit_at
            .map(|at| (now - at).num_days().max(0) as u32)
    }

    /// Whole months since the first visit (30-day months)
    pub fn tenure_months(&self, now: DateTime<Utc>) -> u32 {
        self.first_visit_at
            .map(|at| ((now - at).num_days().max(0) / 30) as u32)
            .unwrap_or(0)
    }
}

/// Observable signals explaining why a patient stopped coming
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LapseEvidence {
    #[serde(default)]
    pub address_changed: bool,
    #[serde(default)]
    pub insurance_lapsed: bool,
    #[serde(default)]
    pub financial_cancellations: u32,
    #[serde(default)]
    pub scheduling_cancellations: u32,
    #[serde(default)]
    pub treatment_plan_completed: bool,
    #[serde(default)]
    pub no_show_count: u32,
    #[serde(default)]
    pub negative_feedback: bool,
    /// Free-text staff notes
    #[serde(default)]
    pub notes: Vec<String>,
}

/// Recent marketing engagement of an existing patient
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngagementHistory {
    #[serde(default)]
    pub emails_opened_90d: u32,
    #[serde(default)]
    pub replies_90d: u32,
}

/// Patient as seen by the growth engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: Uuid,
    pub practice_id: Uuid,
    pub contact: ContactInfo,
    #[serde(default)]
    pub visits: VisitHistory,
    #[serde(default)]
    pub lapse: LapseEvidence,
    #[serde(default)]
    pub engagement: EngagementHistory,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_completion_rate() {
        let mut history = VisitHistory::default();
        assert_eq!(history.completion_rate(), None);

        history.appointments_scheduled = 10;
        history.appointments_completed = 8;
        assert_eq!(history.completion_rate(), Some(0.8));
    }

    #[test]
    fn test_days_and_tenure() {
        let now = Utc::now();
        let history = VisitHistory {
            first_visit_at: Some(now - Duration::days(400)),
            last_visit_at: Some(now - Duration::days(45)),
            ..Default::default()
        };
        assert_eq!(history.days_since_last_visit(now), Some(45));
        assert_eq!(history.tenure_months(now), 13);
    }
}
