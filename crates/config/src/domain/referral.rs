//! Referral Scoring Configuration
//!
//! Behavioural NPS inference and the five-factor referral score.

use serde::{Deserialize, Serialize};

use super::tiers::{FloatTier, ThresholdTier};

/// Rating boundary → NPS adjustment, highest first
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingAdjustment {
    pub min_rating: f64,
    pub adjustment: f64,
}

/// Count boundary → NPS adjustment, highest first
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CountAdjustment {
    pub min: u32,
    pub adjustment: f64,
}

fn count_adjustment(table: &[CountAdjustment], value: u32) -> Option<f64> {
    table.iter().find(|row| value >= row.min).map(|row| row.adjustment)
}

/// NPS inference rules; the result is clamped to [0, 10]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NpsInferenceConfig {
    pub base: f64,
    /// Visits in the last 12 months
    pub visit_frequency: Vec<CountAdjustment>,
    /// Applied when yearly visits are strictly below `infrequent_below`
    pub infrequent_below: u32,
    pub infrequent_adjustment: f64,
    pub streak: Vec<CountAdjustment>,
    pub review_rating: Vec<RatingAdjustment>,
    /// Applied to ratings below every `review_rating` row
    pub low_review_adjustment: f64,
    pub prior_referrals: Vec<CountAdjustment>,
    pub high_completion_min: f64,
    pub high_completion_adjustment: f64,
    pub low_completion_below: f64,
    pub low_completion_adjustment: f64,
    pub positive_outcome_adjustment: f64,
    pub negative_outcome_adjustment: f64,
}

impl Default for NpsInferenceConfig {
    fn default() -> Self {
        Self {
            base: 5.0,
            visit_frequency: vec![
                CountAdjustment { min: 12, adjustment: 2.0 },
                CountAdjustment { min: 6, adjustment: 1.0 },
            ],
            infrequent_below: 2,
            infrequent_adjustment: -1.0,
            streak: vec![
                CountAdjustment { min: 10, adjustment: 1.5 },
                CountAdjustment { min: 5, adjustment: 1.0 },
            ],
            review_rating: vec![
                RatingAdjustment { min_rating: 4.5, adjustment: 2.0 },
                RatingAdjustment { min_rating: 4.0, adjustment: 1.0 },
                RatingAdjustment { min_rating: 3.0, adjustment: -1.0 },
            ],
            low_review_adjustment: -3.0,
            prior_referrals: vec![
                CountAdjustment { min: 2, adjustment: 2.0 },
                CountAdjustment { min: 1, adjustment: 1.0 },
            ],
            high_completion_min: 0.9,
            high_completion_adjustment: 1.0,
            low_completion_below: 0.6,
            low_completion_adjustment: -1.0,
            positive_outcome_adjustment: 1.0,
            negative_outcome_adjustment: -2.0,
        }
    }
}

impl NpsInferenceConfig {
    pub fn visit_frequency_adjustment(&self, visits_last_12_months: u32) -> f64 {
        if visits_last_12_months < self.infrequent_below {
            return self.infrequent_adjustment;
        }
        count_adjustment(&self.visit_frequency, visits_last_12_months).unwrap_or(0.0)
    }

    pub fn streak_adjustment(&self, streak: u32) -> f64 {
        count_adjustment(&self.streak, streak).unwrap_or(0.0)
    }

    pub fn review_adjustment(&self, rating: f64) -> f64 {
        self.review_rating
            .iter()
            .find(|row| rating >= row.min_rating)
            .map(|row| row.adjustment)
            .unwrap_or(self.low_review_adjustment)
    }

    pub fn referral_adjustment(&self, prior_referrals: u32) -> f64 {
        count_adjustment(&self.prior_referrals, prior_referrals).unwrap_or(0.0)
    }
}

/// Five weighted referral factors summing to at most 100
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferralScoringConfig {
    pub points_per_yearly_visit: f64,
    pub visit_frequency_max: u32,
    pub review_tiers: Vec<FloatTier>,
    pub review_max: u32,
    pub tenure_month_tiers: Vec<ThresholdTier>,
    pub tenure_max: u32,
    pub treatment_success_points: u32,
    pub treatment_unknown_points: u32,
    pub treatment_max: u32,
    pub points_per_prior_referral: u32,
    pub prior_referral_max: u32,
}

impl Default for ReferralScoringConfig {
    fn default() -> Self {
        Self {
            points_per_yearly_visit: 2.5,
            visit_frequency_max: 25,
            review_tiers: vec![
                FloatTier::new(4.5, 30),
                FloatTier::new(4.0, 20),
                FloatTier::new(3.0, 10),
            ],
            review_max: 30,
            tenure_month_tiers: vec![
                ThresholdTier::new(24, 20),
                ThresholdTier::new(12, 15),
                ThresholdTier::new(6, 10),
                ThresholdTier::new(3, 5),
            ],
            tenure_max: 20,
            treatment_success_points: 15,
            treatment_unknown_points: 5,
            treatment_max: 15,
            points_per_prior_referral: 5,
            prior_referral_max: 10,
        }
    }
}

/// Referral configuration loaded from the `referral` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferralConfig {
    pub nps: NpsInferenceConfig,
    pub scoring: ReferralScoringConfig,
    /// Outreach window after the last visit
    pub outreach_min_days_after_visit: i64,
    pub outreach_max_days_after_visit: i64,
    /// Minimum spacing between two referral asks
    pub outreach_cooldown_days: i64,
    pub review_request_cooldown_days: i64,
    /// Candidate defaults when the caller does not specify criteria
    pub default_min_referral_score: u32,
    pub default_min_nps: u8,
}

impl Default for ReferralConfig {
    fn default() -> Self {
        Self {
            nps: NpsInferenceConfig::default(),
            scoring: ReferralScoringConfig::default(),
            outreach_min_days_after_visit: 1,
            outreach_max_days_after_visit: 3,
            outreach_cooldown_days: 14,
            review_request_cooldown_days: 90,
            default_min_referral_score: 60,
            default_min_nps: 9,
        }
    }
}
