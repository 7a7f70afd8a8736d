//! Referral Scoring Engine
//!
//! Behavioural NPS inference, the five-factor referral score and the
//! outreach window.

use chrono::{DateTime, Duration, Utc};
use practice_growth_config::{float_tier_points, tier_points, GrowthConfig};
use practice_growth_core::{NpsCategory, VisitHistory};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Factor keys stored in `ReferralOpportunity::score_factors`
pub mod factors {
    pub const VISIT_FREQUENCY: &str = "visit_frequency";
    pub const POSITIVE_REVIEWS: &str = "positive_reviews";
    pub const TENURE: &str = "tenure";
    pub const TREATMENT_SUCCESS: &str = "treatment_success";
    pub const PRIOR_REFERRALS: &str = "prior_referrals";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpsEstimate {
    pub score: u8,
    pub category: NpsCategory,
    /// False when the patient answered a survey
    pub inferred: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferralScore {
    pub score: u32,
    pub factors: BTreeMap<String, u32>,
}

#[derive(Debug, Clone)]
pub struct ReferralEngine {
    config: Arc<GrowthConfig>,
}

impl ReferralEngine {
    pub fn new(config: Arc<GrowthConfig>) -> Self {
        Self { config }
    }

    /// Survey answer when present, otherwise inferred from behaviour
    pub fn estimate_nps(&self, history: &VisitHistory) -> NpsEstimate {
        if let Some(answer) = history.survey_nps {
            let score = answer.min(10);
            return NpsEstimate {
                score,
                category: NpsCategory::from_score(score),
                inferred: false,
            };
        }

        let score = self.infer_nps(history);
        NpsEstimate {
            score,
            category: NpsCategory::from_score(score),
            inferred: true,
        }
    }

    /// Behavioural NPS in [0, 10]
    pub fn infer_nps(&self, history: &VisitHistory) -> u8 {
        let nps = &self.config.referral.nps;

        let mut score = nps.base;
        score += nps.visit_frequency_adjustment(history.visits_last_12_months);
        score += nps.streak_adjustment(history.consecutive_visits);
        if let Some(review) = &history.review {
            score += nps.review_adjustment(review.rating);
        }
        score += nps.referral_adjustment(history.prior_referrals);
        if let Some(rate) = history.completion_rate() {
            if rate >= nps.high_completion_min {
                score += nps.high_completion_adjustment;
            } else if rate < nps.low_completion_below {
                score += nps.low_completion_adjustment;
            }
        }
        match history.treatment_outcome_positive {
            Some(true) => score += nps.positive_outcome_adjustment,
            Some(false) => score += nps.negative_outcome_adjustment,
            None => {}
        }

        score.round().clamp(0.0, 10.0) as u8
    }

    /// Referral propensity in [0, 100]
    pub fn referral_score(&self, history: &VisitHistory, now: DateTime<Utc>) -> ReferralScore {
        let s = &self.config.referral.scoring;

        let visit_frequency = ((history.visits_last_12_months as f64 * s.points_per_yearly_visit)
            .round() as u32)
            .min(s.visit_frequency_max);
        let positive_reviews = history
            .review
            .as_ref()
            .map(|review| float_tier_points(&s.review_tiers, review.rating))
            .unwrap_or(0)
            .min(s.review_max);
        let tenure = tier_points(&s.tenure_month_tiers, history.tenure_months(now)).min(s.tenure_max);
        let treatment_success = match history.treatment_outcome_positive {
            Some(true) => s.treatment_success_points,
            Some(false) => 0,
            None => s.treatment_unknown_points,
        }
        .min(s.treatment_max);
        let prior_referrals = history
            .prior_referrals
            .saturating_mul(s.points_per_prior_referral)
            .min(s.prior_referral_max);

        let factors = BTreeMap::from([
            (factors::VISIT_FREQUENCY.to_string(), visit_frequency),
            (factors::POSITIVE_REVIEWS.to_string(), positive_reviews),
            (factors::TENURE.to_string(), tenure),
            (factors::TREATMENT_SUCCESS.to_string(), treatment_success),
            (factors::PRIOR_REFERRALS.to_string(), prior_referrals),
        ]);
        let score = factors.values().sum::<u32>().min(100);

        ReferralScore { score, factors }
    }

    /// When to ask: a few days after the last visit, outside the cooldown.
    ///
    /// A window that has already passed yields `now`. `None` without a visit.
    pub fn optimal_outreach(
        &self,
        last_visit_at: Option<DateTime<Utc>>,
        last_outreach_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let r = &self.config.referral;
        let last_visit = last_visit_at?;

        let window_start = last_visit + Duration::days(r.outreach_min_days_after_visit);
        let window_end = last_visit + Duration::days(r.outreach_max_days_after_visit);
        let mut at = if now > window_end {
            now
        } else {
            window_start.max(now)
        };

        if let Some(previous) = last_outreach_at {
            let cooldown_end = previous + Duration::days(r.outreach_cooldown_days);
            if at < cooldown_end {
                at = cooldown_end;
            }
        }
        Some(at)
    }

    /// True while a previous ask is inside the cooldown
    pub fn in_outreach_cooldown(
        &self,
        last_outreach_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> bool {
        last_outreach_at.map_or(false, |previous| {
            now < previous + Duration::days(self.config.referral.outreach_cooldown_days)
        })
    }

    pub fn in_review_cooldown(
        &self,
        last_review_request_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> bool {
        last_review_request_at.map_or(false, |previous| {
            now < previous + Duration::days(self.config.referral.review_request_cooldown_days)
        })
    }
}
