//! Referral and reactivation opportunity records
//!
//! One active record per patient for each kind. Records are recomputed in
//! place on every analysis so outreach history survives re-scoring.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::messaging::Channel;

/// NPS bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NpsCategory {
    Promoter,
    Passive,
    Detractor,
}

impl NpsCategory {
    pub fn from_score(score: u8) -> Self {
        match score {
            9..=u8::MAX => Self::Promoter,
            7..=8 => Self::Passive,
            _ => Self::Detractor,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Promoter => "promoter",
            Self::Passive => "passive",
            Self::Detractor => "detractor",
        }
    }
}

/// Per-patient referral cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralOpportunity {
    pub id: Uuid,
    pub practice_id: Uuid,
    pub patient_id: Uuid,
    pub nps_score: u8,
    pub nps_category: NpsCategory,
    /// False when the score came from an actual survey answer
    pub nps_inferred: bool,
    pub referral_score: u32,
    pub score_factors: BTreeMap<String, u32>,
    pub visit_count: u32,
    pub consecutive_visits: u32,
    pub prior_referrals: u32,
    pub optimal_outreach_at: Option<DateTime<Utc>>,
    pub last_outreach_at: Option<DateTime<Utc>>,
    pub last_review_request_at: Option<DateTime<Utc>>,
    pub analyzed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Inferred cause of a patient's absence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LapseReason {
    MovedAway,
    InsuranceChange,
    Financial,
    SchedulingConflict,
    TreatmentCompleted,
    Dissatisfied,
    SwitchedProvider,
    Forgot,
    FeelingBetter,
    LifeEvent,
    FearOrAnxiety,
    Unknown,
}

impl LapseReason {
    /// The candidate reasons the classifier can weigh (excludes `Unknown`)
    pub const CANDIDATES: [LapseReason; 11] = [
        Self::MovedAway,
        Self::InsuranceChange,
        Self::Financial,
        Self::SchedulingConflict,
        Self::TreatmentCompleted,
        Self::Dissatisfied,
        Self::SwitchedProvider,
        Self::Forgot,
        Self::FeelingBetter,
        Self::LifeEvent,
        Self::FearOrAnxiety,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MovedAway => "moved_away",
            Self::InsuranceChange => "insurance_change",
            Self::Financial => "financial",
            Self::SchedulingConflict => "scheduling_conflict",
            Self::TreatmentCompleted => "treatment_completed",
            Self::Dissatisfied => "dissatisfied",
            Self::SwitchedProvider => "switched_provider",
            Self::Forgot => "forgot",
            Self::FeelingBetter => "feeling_better",
            Self::LifeEvent => "life_event",
            Self::FearOrAnxiety => "fear_or_anxiety",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for LapseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the practice should reach out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutreachApproach {
    /// Call from a team member who knows the patient
    PersonalCall,
    /// Letter signed by the treating provider
    ProviderLetter,
    Email,
    Sms,
}

impl OutreachApproach {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PersonalCall => "personal_call",
            Self::ProviderLetter => "provider_letter",
            Self::Email => "email",
            Self::Sms => "sms",
        }
    }

    pub fn channel(&self) -> Channel {
        match self {
            Self::PersonalCall => Channel::Phone,
            Self::ProviderLetter => Channel::Mail,
            Self::Email => Channel::Email,
            Self::Sms => Channel::Sms,
        }
    }
}

/// Reactivation outcome status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReactivationStatus {
    Identified,
    Contacted,
    Engaged,
    Reactivated,
    Declined,
    Lost,
}

impl ReactivationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Identified => "IDENTIFIED",
            Self::Contacted => "CONTACTED",
            Self::Engaged => "ENGAGED",
            Self::Reactivated => "REACTIVATED",
            Self::Declined => "DECLINED",
            Self::Lost => "LOST",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Reactivated | Self::Declined | Self::Lost)
    }

    /// Statuses reachable from this one
    pub fn valid_transitions(&self) -> &'static [ReactivationStatus] {
        match self {
            Self::Identified => &[Self::Contacted],
            Self::Contacted => &[Self::Engaged, Self::Reactivated, Self::Declined, Self::Lost],
            Self::Engaged => &[Self::Reactivated, Self::Declined, Self::Lost],
            Self::Reactivated | Self::Declined | Self::Lost => &[],
        }
    }

    pub fn can_transition_to(&self, next: ReactivationStatus) -> bool {
        self.valid_transitions().contains(&next)
    }
}

/// Per-patient reactivation record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactivationOpportunity {
    pub id: Uuid,
    pub practice_id: Uuid,
    pub patient_id: Uuid,
    pub last_visit_at: Option<DateTime<Utc>>,
    pub days_lapsed: u32,
    pub lifetime_value: f64,
    pub likely_reason: LapseReason,
    pub reason_confidence: f64,
    pub reason_factors: Vec<String>,
    pub reactivation_score: u32,
    pub recommended_approach: OutreachApproach,
    pub recommended_offer_id: Option<String>,
    pub recommended_channel: Channel,
    pub outreach_attempts: u32,
    pub last_contacted_at: Option<DateTime<Utc>>,
    pub status: ReactivationStatus,
    pub analyzed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nps_category_bands() {
        assert_eq!(NpsCategory::from_score(10), NpsCategory::Promoter);
        assert_eq!(NpsCategory::from_score(9), NpsCategory::Promoter);
        assert_eq!(NpsCategory::from_score(8), NpsCategory::Passive);
        assert_eq!(NpsCategory::from_score(7), NpsCategory::Passive);
        assert_eq!(NpsCategory::from_score(6), NpsCategory::Detractor);
        assert_eq!(NpsCategory::from_score(0), NpsCategory::Detractor);
    }

    #[test]
    fn test_reactivation_transitions() {
        use ReactivationStatus::*;
        assert!(Identified.can_transition_to(Contacted));
        assert!(!Identified.can_transition_to(Reactivated));
        assert!(Contacted.can_transition_to(Engaged));
        assert!(Contacted.can_transition_to(Declined));
        assert!(Engaged.can_transition_to(Reactivated));
        assert!(!Reactivated.can_transition_to(Contacted));
        assert!(Lost.valid_transitions().is_empty());
    }

    #[test]
    fn test_candidate_reasons_exclude_unknown() {
        assert_eq!(LapseReason::CANDIDATES.len(), 11);
        assert!(!LapseReason::CANDIDATES.contains(&LapseReason::Unknown));
    }
}
