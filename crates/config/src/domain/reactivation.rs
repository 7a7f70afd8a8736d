//! Reactivation Configuration
//!
//! Evidence weights for lapse-reason inference, the reactivation score, the
//! approach decision table and the offer catalog.

use practice_growth_core::{LapseReason, OutreachApproach};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::tiers::{AgeTier, FloatTier, ThresholdTier};

/// Reason → weight contributed by one piece of evidence
pub type ReasonWeights = BTreeMap<LapseReason, f64>;

fn weights(rows: &[(LapseReason, f64)]) -> ReasonWeights {
    rows.iter().copied().collect()
}

/// Free-text note rule: any keyword hit adds `weights` once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteKeywordRule {
    pub keywords: Vec<String>,
    pub weights: ReasonWeights,
}

impl NoteKeywordRule {
    fn new(keywords: &[&str], rows: &[(LapseReason, f64)]) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            weights: weights(rows),
        }
    }
}

/// Weight each observable signal adds to candidate reasons
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceWeights {
    pub address_change: ReasonWeights,
    pub insurance_lapse: ReasonWeights,
    /// Multiplied by the number of financially-motivated cancellations
    pub per_financial_cancellation: ReasonWeights,
    /// Multiplied by the number of scheduling cancellations
    pub per_scheduling_cancellation: ReasonWeights,
    pub treatment_plan_completed: ReasonWeights,
    pub no_show_min_count: u32,
    pub no_show_pattern: ReasonWeights,
    pub negative_feedback: ReasonWeights,
    pub long_absence_after_days: u32,
    pub long_absence: ReasonWeights,
    pub note_rules: Vec<NoteKeywordRule>,
}

impl Default for EvidenceWeights {
    fn default() -> Self {
        use LapseReason::*;
        Self {
            address_change: weights(&[(MovedAway, 4.0), (SwitchedProvider, 0.5)]),
            insurance_lapse: weights(&[(InsuranceChange, 4.0), (Financial, 1.0)]),
            per_financial_cancellation: weights(&[(Financial, 2.0)]),
            per_scheduling_cancellation: weights(&[(SchedulingConflict, 2.0), (LifeEvent, 0.5)]),
            treatment_plan_completed: weights(&[(TreatmentCompleted, 3.0), (FeelingBetter, 1.5)]),
            no_show_min_count: 2,
            no_show_pattern: weights(&[(Forgot, 2.0), (FearOrAnxiety, 1.0), (SchedulingConflict, 0.5)]),
            negative_feedback: weights(&[(Dissatisfied, 3.0), (SwitchedProvider, 1.0)]),
            long_absence_after_days: 365,
            long_absence: weights(&[(SwitchedProvider, 1.0), (Forgot, 1.0)]),
            note_rules: vec![
                NoteKeywordRule::new(&["moved", "relocat", "out of state", "new city"], &[(MovedAway, 3.0)]),
                NoteKeywordRule::new(&["insurance", "coverage", "out of network"], &[(InsuranceChange, 2.0)]),
                NoteKeywordRule::new(
                    &["afford", "cost", "expensive", "price", "payment"],
                    &[(Financial, 2.0)],
                ),
                NoteKeywordRule::new(
                    &["busy", "schedule", "work hours", "no time"],
                    &[(SchedulingConflict, 2.0)],
                ),
                NoteKeywordRule::new(
                    &["feeling better", "healed", "no more pain", "pain free"],
                    &[(FeelingBetter, 2.0)],
                ),
                NoteKeywordRule::new(
                    &["unhappy", "disappointed", "rude", "long wait", "complain"],
                    &[(Dissatisfied, 2.0)],
                ),
                NoteKeywordRule::new(
                    &["another practice", "new doctor", "other office", "switched"],
                    &[(SwitchedProvider, 2.0)],
                ),
                NoteKeywordRule::new(
                    &["baby", "pregnan", "surgery", "divorce", "caring for", "family"],
                    &[(LifeEvent, 2.0)],
                ),
                NoteKeywordRule::new(
                    &["nervous", "afraid", "anxious", "scared", "fear"],
                    &[(FearOrAnxiety, 2.0)],
                ),
                NoteKeywordRule::new(&["forgot", "slipped my mind"], &[(Forgot, 2.0)]),
            ],
        }
    }
}

/// Reactivation score: base plus/minus bounded adjustments, clamped [0, 100]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactivationScoringConfig {
    pub base: i32,
    pub lifetime_value_tiers: Vec<FloatTier>,
    pub visit_tiers: Vec<ThresholdTier>,
    /// Subtracted once days lapsed exceed `after_days`
    pub recency_penalties: Vec<AgeTier<u32>>,
    pub reason_modifiers: BTreeMap<LapseReason, i32>,
    pub points_per_recent_open: u32,
    pub points_per_recent_reply: u32,
    pub engagement_max: u32,
}

impl Default for ReactivationScoringConfig {
    fn default() -> Self {
        use LapseReason::*;
        Self {
            base: 50,
            lifetime_value_tiers: vec![
                FloatTier::new(5000.0, 25),
                FloatTier::new(2000.0, 15),
                FloatTier::new(500.0, 8),
            ],
            visit_tiers: vec![
                ThresholdTier::new(20, 15),
                ThresholdTier::new(10, 10),
                ThresholdTier::new(5, 5),
            ],
            recency_penalties: vec![AgeTier::new(730, 10), AgeTier::new(365, 5)],
            reason_modifiers: BTreeMap::from([
                (SwitchedProvider, -10),
                (MovedAway, -8),
                (Dissatisfied, -5),
                (FeelingBetter, -3),
                (Financial, -2),
                (FearOrAnxiety, -2),
                (InsuranceChange, 0),
                (TreatmentCompleted, 0),
                (LifeEvent, 0),
                (Unknown, 0),
                (SchedulingConflict, 3),
                (Forgot, 5),
            ]),
            points_per_recent_open: 2,
            points_per_recent_reply: 5,
            engagement_max: 10,
        }
    }
}

/// Catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Empty means applicable to every reason
    #[serde(default)]
    pub reasons: Vec<LapseReason>,
    #[serde(default)]
    pub min_days_lapsed: u32,
    #[serde(default)]
    pub max_days_lapsed: Option<u32>,
}

impl OfferDefinition {
    pub fn applies_to(&self, reason: LapseReason, days_lapsed: u32) -> bool {
        let reason_ok = self.reasons.is_empty() || self.reasons.contains(&reason);
        let window_ok = days_lapsed >= self.min_days_lapsed
            && self.max_days_lapsed.map_or(true, |max| days_lapsed <= max);
        reason_ok && window_ok
    }
}

fn offer(
    id: &str,
    name: &str,
    description: &str,
    reasons: &[LapseReason],
    min_days_lapsed: u32,
    max_days_lapsed: Option<u32>,
) -> OfferDefinition {
    OfferDefinition {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        reasons: reasons.to_vec(),
        min_days_lapsed,
        max_days_lapsed,
    }
}

fn default_offers() -> Vec<OfferDefinition> {
    use LapseReason::*;
    vec![
        offer(
            "service_recovery_consult",
            "Complimentary consult with the practice manager",
            "A no-cost visit to make things right",
            &[Dissatisfied],
            0,
            None,
        ),
        offer(
            "interest_free_payment_plan",
            "Interest-free payment plan",
            "Spread treatment cost over 12 months",
            &[Financial],
            0,
            None,
        ),
        offer(
            "insurance_benefits_review",
            "Free insurance benefits review",
            "We check your new coverage before you book",
            &[InsuranceChange],
            0,
            None,
        ),
        offer(
            "priority_flexible_booking",
            "Priority evening and weekend booking",
            "First pick of after-hours appointments",
            &[SchedulingConflict, LifeEvent],
            0,
            None,
        ),
        offer(
            "comfort_first_visit",
            "Comfort-first visit",
            "Extra time, a gentle walkthrough and no treatment pressure",
            &[FearOrAnxiety],
            0,
            None,
        ),
        offer(
            "telehealth_check_in",
            "Telehealth check-in",
            "Stay connected with your provider remotely",
            &[MovedAway],
            0,
            None,
        ),
        offer(
            "maintenance_checkup",
            "Complimentary maintenance check-up",
            "Keep your results on track",
            &[TreatmentCompleted, FeelingBetter],
            180,
            None,
        ),
        offer(
            "welcome_back_exam",
            "20% off a welcome-back exam",
            "Return visit discount",
            &[],
            90,
            Some(730),
        ),
        offer(
            "fresh_start_new_patient",
            "New-patient pricing",
            "Returning after two years is billed as a new patient special",
            &[],
            731,
            None,
        ),
    ]
}

/// Reactivation configuration loaded from the `reactivation` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactivationConfig {
    pub evidence: EvidenceWeights,
    /// Confidence reported for `unknown` when no evidence exists
    pub unknown_confidence: f64,
    pub scoring: ReactivationScoringConfig,
    /// Patients at or above this lifetime value always get personal outreach
    pub high_value_lifetime_value: f64,
    pub approaches: BTreeMap<LapseReason, OutreachApproach>,
    pub default_approach: OutreachApproach,
    /// Catalog order is priority order
    pub offers: Vec<OfferDefinition>,
    /// Financially-motivated outreach lands on these days of the month
    pub financial_send_days: Vec<u32>,
    pub default_min_days_lapsed: u32,
}

impl Default for ReactivationConfig {
    fn default() -> Self {
        use LapseReason::*;
        use OutreachApproach::*;
        Self {
            evidence: EvidenceWeights::default(),
            unknown_confidence: 0.1,
            scoring: ReactivationScoringConfig::default(),
            high_value_lifetime_value: 5000.0,
            approaches: BTreeMap::from([
                (Dissatisfied, PersonalCall),
                (FearOrAnxiety, PersonalCall),
                (SwitchedProvider, ProviderLetter),
                (LifeEvent, ProviderLetter),
                (MovedAway, Email),
                (InsuranceChange, Email),
                (Financial, Email),
                (TreatmentCompleted, Email),
                (FeelingBetter, Email),
                (SchedulingConflict, Sms),
                (Forgot, Sms),
            ]),
            default_approach: Email,
            offers: default_offers(),
            financial_send_days: vec![1, 15],
            default_min_days_lapsed: 180,
        }
    }
}

impl ReactivationConfig {
    pub fn find_offer(&self, id: &str) -> Option<&OfferDefinition> {
        self.offers.iter().find(|offer| offer.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offer_applicability() {
        let config = ReactivationConfig::default();
        let plan = config.find_offer("interest_free_payment_plan").unwrap();
        assert!(plan.applies_to(LapseReason::Financial, 10));
        assert!(!plan.applies_to(LapseReason::Forgot, 10));

        let welcome = config.find_offer("welcome_back_exam").unwrap();
        assert!(welcome.applies_to(LapseReason::Forgot, 200));
        assert!(!welcome.applies_to(LapseReason::Forgot, 60));
        assert!(!welcome.applies_to(LapseReason::Forgot, 800));
    }

    #[test]
    fn test_every_candidate_reason_has_an_approach() {
        let config = ReactivationConfig::default();
        for reason in LapseReason::CANDIDATES {
            assert!(config.approaches.contains_key(&reason), "{reason} has no approach");
        }
    }
}
