//! Reactivation Engine
//!
//! Infers why a patient lapsed from weighted evidence, scores how likely
//! they are to return and picks an approach, offer and send time.

use chrono::{DateTime, Duration, Utc};
use practice_growth_config::{
    age_tier_value, float_tier_points, tier_points, GrowthConfig, OfferDefinition, ReasonWeights,
};
use practice_growth_core::{
    Channel, EngagementHistory, LapseEvidence, LapseReason, OutreachApproach, PatientRecord,
    VisitHistory,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::timing::{next_day_of_month, next_send_slot};

/// Winning reason with its share of the evidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapseInference {
    pub reason: LapseReason,
    /// Winning weight / total weight, or the unknown floor without evidence
    pub confidence: f64,
    /// Human-readable evidence, in evaluation order
    pub factors: Vec<String>,
    pub weights: BTreeMap<LapseReason, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactivationScore {
    pub score: u32,
    pub adjustments: BTreeMap<String, i32>,
}

/// Full recommendation for one lapsed patient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapseAnalysis {
    pub days_lapsed: u32,
    pub inference: LapseInference,
    pub score: ReactivationScore,
    pub approach: OutreachApproach,
    pub channel: Channel,
    pub offer: Option<OfferDefinition>,
    pub optimal_timing: DateTime<Utc>,
}

fn add_weights(totals: &mut BTreeMap<LapseReason, f64>, weights: &ReasonWeights, times: f64) {
    for (reason, weight) in weights {
        *totals.entry(*reason).or_insert(0.0) += weight * times;
    }
}

#[derive(Debug, Clone)]
pub struct ReactivationEngine {
    config: Arc<GrowthConfig>,
}

impl ReactivationEngine {
    pub fn new(config: Arc<GrowthConfig>) -> Self {
        Self { config }
    }

    /// Weighted multi-evidence classification over the candidate reasons
    pub fn infer_reason(&self, evidence: &LapseEvidence, days_lapsed: u32) -> LapseInference {
        let w = &self.config.reactivation.evidence;
        let mut totals: BTreeMap<LapseReason, f64> = BTreeMap::new();
        let mut factors = Vec::new();

        if evidence.address_changed {
            add_weights(&mut totals, &w.address_change, 1.0);
            factors.push("Address on file changed".to_string());
        }
        if evidence.insurance_lapsed {
            add_weights(&mut totals, &w.insurance_lapse, 1.0);
            factors.push("Insurance coverage lapsed".to_string());
        }
        if evidence.financial_cancellations > 0 {
            add_weights(
                &mut totals,
                &w.per_financial_cancellation,
                evidence.financial_cancellations as f64,
            );
            factors.push(format!(
                "{} cancellations citing cost",
                evidence.financial_cancellations
            ));
        }
        if evidence.scheduling_cancellations > 0 {
            add_weights(
                &mut totals,
                &w.per_scheduling_cancellation,
                evidence.scheduling_cancellations as f64,
            );
            factors.push(format!(
                "{} cancellations for scheduling conflicts",
                evidence.scheduling_cancellations
            ));
        }
        if evidence.treatment_plan_completed {
            add_weights(&mut totals, &w.treatment_plan_completed, 1.0);
            factors.push("Completed treatment plan".to_string());
        }
        if evidence.no_show_count >= w.no_show_min_count {
            add_weights(&mut totals, &w.no_show_pattern, 1.0);
            factors.push(format!("{} missed appointments", evidence.no_show_count));
        }
        if evidence.negative_feedback {
            add_weights(&mut totals, &w.negative_feedback, 1.0);
            factors.push("Left negative feedback".to_string());
        }
        if days_lapsed > w.long_absence_after_days {
            add_weights(&mut totals, &w.long_absence, 1.0);
            factors.push(format!("No visit in {} days", days_lapsed));
        }

        let notes = evidence.notes.join(" ").to_lowercase();
        if !notes.is_empty() {
            for rule in &w.note_rules {
                if let Some(keyword) = rule
                    .keywords
                    .iter()
                    .find(|k| notes.contains(&k.to_lowercase()))
                {
                    add_weights(&mut totals, &rule.weights, 1.0);
                    factors.push(format!("Staff note mentions \"{}\"", keyword));
                }
            }
        }

        let total: f64 = totals.values().filter(|w| **w > 0.0).sum();
        let mut best: Option<(LapseReason, f64)> = None;
        for reason in LapseReason::CANDIDATES {
            let weight = totals.get(&reason).copied().unwrap_or(0.0);
            if weight > 0.0 && best.map_or(true, |(_, top)| weight > top) {
                best = Some((reason, weight));
            }
        }

        let (reason, confidence) = match best {
            Some((reason, weight)) if total > 0.0 => (reason, (weight / total).clamp(0.0, 1.0)),
            _ => (LapseReason::Unknown, self.config.reactivation.unknown_confidence),
        };

        tracing::debug!(
            reason = reason.as_str(),
            confidence,
            evidence = factors.len(),
            "Lapse reason inferred"
        );

        LapseInference {
            reason,
            confidence,
            factors,
            weights: totals,
        }
    }

    /// Likelihood of return in [0, 100]
    pub fn score(
        &self,
        visits: &VisitHistory,
        engagement: &EngagementHistory,
        reason: LapseReason,
        days_lapsed: u32,
    ) -> ReactivationScore {
        let s = &self.config.reactivation.scoring;

        let lifetime_value = float_tier_points(&s.lifetime_value_tiers, visits.lifetime_value) as i32;
        let visit_count = tier_points(&s.visit_tiers, visits.total_visits) as i32;
        let recency = -(age_tier_value(&s.recency_penalties, days_lapsed).unwrap_or(0) as i32);
        let reason_modifier = s.reason_modifiers.get(&reason).copied().unwrap_or(0);
        let engagement_points = engagement
            .emails_opened_90d
            .saturating_mul(s.points_per_recent_open)
            .saturating_add(engagement.replies_90d.saturating_mul(s.points_per_recent_reply))
            .min(s.engagement_max) as i32;

        let adjustments = BTreeMap::from([
            ("lifetime_value".to_string(), lifetime_value),
            ("visit_count".to_string(), visit_count),
            ("recency".to_string(), recency),
            ("reason".to_string(), reason_modifier),
            ("engagement".to_string(), engagement_points),
        ]);
        let score = (s.base + adjustments.values().sum::<i32>()).clamp(0, 100) as u32;

        ReactivationScore { score, adjustments }
    }

    /// Decision table; high-value patients always get a personal call
    pub fn approach(&self, reason: LapseReason, lifetime_value: f64) -> OutreachApproach {
        let r = &self.config.reactivation;
        if lifetime_value >= r.high_value_lifetime_value {
            return OutreachApproach::PersonalCall;
        }
        r.approaches
            .get(&reason)
            .copied()
            .unwrap_or(r.default_approach)
    }

    /// Catalog entries valid for the reason and elapsed days, in catalog order
    pub fn applicable_offers(&self, reason: LapseReason, days_lapsed: u32) -> Vec<&OfferDefinition> {
        self.config
            .reactivation
            .offers
            .iter()
            .filter(|offer| offer.applies_to(reason, days_lapsed))
            .collect()
    }

    pub fn select_offer(&self, reason: LapseReason, days_lapsed: u32) -> Option<&OfferDefinition> {
        self.applicable_offers(reason, days_lapsed).into_iter().next()
    }

    /// Pay-day slot for financial lapses, the weekday heuristic otherwise
    pub fn optimal_timing(
        &self,
        reason: LapseReason,
        engagement: &EngagementHistory,
        now: DateTime<Utc>,
    ) -> DateTime<Utc> {
        let timing = &self.config.nurture.timing;
        if reason == LapseReason::Financial {
            return next_day_of_month(
                &self.config.reactivation.financial_send_days,
                now,
                timing.morning_hour,
            );
        }
        next_send_slot(timing, now + Duration::hours(1), now, engagement.emails_opened_90d)
    }

    /// Full analysis of one patient
    pub fn analyze(&self, patient: &PatientRecord, now: DateTime<Utc>) -> LapseAnalysis {
        let days_lapsed = patient.visits.days_since_last_visit(now).unwrap_or(0);
        let inference = self.infer_reason(&patient.lapse, days_lapsed);
        let score = self.score(
            &patient.visits,
            &patient.engagement,
            inference.reason,
            days_lapsed,
        );
        let approach = self.approach(inference.reason, patient.visits.lifetime_value);
        let offer = self.select_offer(inference.reason, days_lapsed).cloned();
        let optimal_timing = self.optimal_timing(inference.reason, &patient.engagement, now);

        LapseAnalysis {
            days_lapsed,
            inference,
            score,
            approach,
            channel: approach.channel(),
            offer,
            optimal_timing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone};

    fn engine() -> ReactivationEngine {
        ReactivationEngine::new(Arc::new(GrowthConfig::default()))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 5, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_address_change_means_moved_away() {
        let evidence = LapseEvidence {
            address_changed: true,
            ..Default::default()
        };
        let inference = engine().infer_reason(&evidence, 200);
        assert_eq!(inference.reason, LapseReason::MovedAway);
        assert!(inference.confidence >= 0.8, "confidence {}", inference.confidence);
        assert_eq!(inference.factors, vec!["Address on file changed".to_string()]);
    }

    #[test]
    fn test_no_evidence_is_unknown() {
        let inference = engine().infer_reason(&LapseEvidence::default(), 200);
        assert_eq!(inference.reason, LapseReason::Unknown);
        assert_eq!(inference.confidence, 0.1);
        assert!(inference.factors.is_empty());
    }

    #[test]
    fn test_cancellations_scale_with_count() {
        let evidence = LapseEvidence {
            financial_cancellations: 3,
            insurance_lapsed: true,
            ..Default::default()
        };
        let inference = engine().infer_reason(&evidence, 200);
        // financial 1 + 6 = 7 against insurance 4
        assert_eq!(inference.reason, LapseReason::Financial);
        assert!((inference.confidence - 7.0 / 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_notes_add_evidence() {
        let evidence = LapseEvidence {
            notes: vec!["Patient said she was too NERVOUS after the last procedure".to_string()],
            ..Default::default()
        };
        let inference = engine().infer_reason(&evidence, 100);
        assert_eq!(inference.reason, LapseReason::FearOrAnxiety);
        assert_eq!(inference.confidence, 1.0);
    }

    #[test]
    fn test_score_components() {
        let visits = VisitHistory {
            total_visits: 22,
            lifetime_value: 6000.0,
            ..Default::default()
        };
        let engagement = EngagementHistory {
            emails_opened_90d: 1,
            replies_90d: 1,
        };
        let score = engine().score(&visits, &engagement, LapseReason::Forgot, 400);
        // 50 + 25 + 15 - 5 + 5 + 7
        assert_eq!(score.score, 97);

        let score = engine().score(
            &VisitHistory::default(),
            &EngagementHistory::default(),
            LapseReason::SwitchedProvider,
            800,
        );
        // 50 - 10 - 10
        assert_eq!(score.score, 30);
    }

    #[test]
    fn test_approach_table() {
        let e = engine();
        assert_eq!(e.approach(LapseReason::Dissatisfied, 100.0), OutreachApproach::PersonalCall);
        assert_eq!(e.approach(LapseReason::Forgot, 100.0), OutreachApproach::Sms);
        assert_eq!(e.approach(LapseReason::LifeEvent, 100.0), OutreachApproach::ProviderLetter);
        assert_eq!(e.approach(LapseReason::Unknown, 100.0), OutreachApproach::Email);
        assert_eq!(e.approach(LapseReason::Forgot, 5000.0), OutreachApproach::PersonalCall);
    }

    #[test]
    fn test_offer_selection() {
        let e = engine();
        assert_eq!(
            e.select_offer(LapseReason::Financial, 200).map(|o| o.id.as_str()),
            Some("interest_free_payment_plan")
        );
        assert_eq!(
            e.select_offer(LapseReason::Forgot, 200).map(|o| o.id.as_str()),
            Some("welcome_back_exam")
        );
        assert_eq!(
            e.select_offer(LapseReason::Forgot, 900).map(|o| o.id.as_str()),
            Some("fresh_start_new_patient")
        );
        assert!(e.select_offer(LapseReason::Forgot, 30).is_none());
    }

    #[test]
    fn test_financial_timing_targets_pay_days() {
        let at = engine().optimal_timing(LapseReason::Financial, &EngagementHistory::default(), now());
        assert_eq!(at.day(), 15);
        assert_eq!(at.month(), 6);

        let other = engine().optimal_timing(LapseReason::Forgot, &EngagementHistory::default(), now());
        assert!(other > now());
    }

    #[test]
    fn test_analyze_patient() {
        let patient = PatientRecord {
            id: uuid::Uuid::new_v4(),
            practice_id: uuid::Uuid::new_v4(),
            contact: Default::default(),
            visits: VisitHistory {
                total_visits: 6,
                last_visit_at: Some(now() - Duration::days(250)),
                lifetime_value: 900.0,
                ..Default::default()
            },
            lapse: LapseEvidence {
                scheduling_cancellations: 2,
                ..Default::default()
            },
            engagement: EngagementHistory::default(),
        };
        let analysis = engine().analyze(&patient, now());
        assert_eq!(analysis.days_lapsed, 250);
        assert_eq!(analysis.inference.reason, LapseReason::SchedulingConflict);
        assert_eq!(analysis.approach, OutreachApproach::Sms);
        assert_eq!(analysis.channel, Channel::Sms);
        assert_eq!(
            analysis.offer.map(|o| o.id),
            Some("priority_flexible_booking".to_string())
        );
        // 50 + 8 + 5 + 3
        assert_eq!(analysis.score.score, 66);
    }
}
