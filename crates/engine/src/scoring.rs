//! Lead Scoring Primitives
//!
//! Quality, urgency, conversion probability and intent signals computed from
//! raw behavioural counters. Every function here is pure: identical counters,
//! source and lead age always give identical results, and outputs are clamped
//! into range instead of failing.

use practice_growth_config::{
    age_tier_value, tier_points, GrowthConfig, QualityScoringConfig, UrgencyScoringConfig,
};
use practice_growth_core::{BehaviorCounters, LeadSource};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Factor keys stored in `Lead::score_factors`
pub mod factors {
    pub const VISIT_FREQUENCY: &str = "visit_frequency";
    pub const PAGE_DEPTH: &str = "page_depth";
    pub const TIME_ON_SITE: &str = "time_on_site";
    pub const FORM_ENGAGEMENT: &str = "form_engagement";
    pub const EMAIL_ENGAGEMENT: &str = "email_engagement";
    pub const SOURCE_QUALITY: &str = "source_quality";
}

/// Result of scoring one lead
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadScore {
    pub quality: u32,
    pub urgency: u32,
    pub conversion_probability: f64,
    /// Quality sub-scores by factor
    pub factors: BTreeMap<String, u32>,
    pub signals: Vec<String>,
}

/// Scoring primitives bound to a configuration
#[derive(Debug, Clone)]
pub struct LeadScorer {
    config: Arc<GrowthConfig>,
}

impl LeadScorer {
    pub fn new(config: Arc<GrowthConfig>) -> Self {
        Self { config }
    }

    /// Score all four primitives at once
    pub fn score(
        &self,
        behavior: &BehaviorCounters,
        source: LeadSource,
        days_since_created: u32,
    ) -> LeadScore {
        let factors = self.quality_factors(behavior, source);
        let quality = factors.values().sum::<u32>().min(100);
        let urgency = self.urgency_score(behavior, days_since_created);
        let conversion_probability =
            self.conversion_probability(quality, urgency, source, days_since_created);
        let signals = self.intent_signals(behavior);

        tracing::debug!(
            quality,
            urgency,
            conversion_probability,
            source = source.as_str(),
            age_days = days_since_created,
            "Lead scored"
        );

        LeadScore {
            quality,
            urgency,
            conversion_probability,
            factors,
            signals,
        }
    }

    /// Quality score in [0, 100]
    pub fn quality_score(&self, behavior: &BehaviorCounters, source: LeadSource) -> u32 {
        self.quality_factors(behavior, source)
            .values()
            .sum::<u32>()
            .min(100)
    }

    /// Independently capped quality sub-scores
    pub fn quality_factors(
        &self,
        behavior: &BehaviorCounters,
        source: LeadSource,
    ) -> BTreeMap<String, u32> {
        let q: &QualityScoringConfig = &self.config.scoring.quality;

        let visits = behavior
            .site_visits
            .saturating_mul(q.points_per_visit)
            .min(q.visit_max);
        let depth = behavior
            .page_views
            .saturating_mul(q.points_per_page_view)
            .min(q.page_depth_max);
        let dwell = tier_points(&q.dwell_tiers, behavior.time_on_site_secs).min(q.dwell_max);
        let form = if behavior.form_abandoned {
            q.form_abandoned_points
        } else {
            0
        };
        let email = behavior
            .emails_opened
            .saturating_mul(q.points_per_email_open)
            .saturating_add(behavior.links_clicked.saturating_mul(q.points_per_link_click))
            .min(q.email_max);
        let source_points = q.source_points(source);

        BTreeMap::from([
            (factors::VISIT_FREQUENCY.to_string(), visits),
            (factors::PAGE_DEPTH.to_string(), depth),
            (factors::TIME_ON_SITE.to_string(), dwell),
            (factors::FORM_ENGAGEMENT.to_string(), form),
            (factors::EMAIL_ENGAGEMENT.to_string(), email),
            (factors::SOURCE_QUALITY.to_string(), source_points),
        ])
    }

    /// Urgency score in [0, 100]: activity signals minus an age penalty
    pub fn urgency_score(&self, behavior: &BehaviorCounters, days_since_created: u32) -> u32 {
        let u: &UrgencyScoringConfig = &self.config.scoring.urgency;

        let recent_activity = u
            .activity_rules
            .iter()
            .find(|rule| {
                days_since_created <= rule.max_age_days && behavior.site_visits >= rule.min_visits
            })
            .map(|rule| rule.points)
            .unwrap_or(0);

        let mut score = recent_activity as i64
            + tier_points(&u.page_view_tiers, behavior.page_views) as i64
            + tier_points(&u.dwell_tiers, behavior.time_on_site_secs) as i64;
        if behavior.form_abandoned {
            score += u.form_abandoned_points as i64;
        }
        score -= age_tier_value(&u.age_penalties, days_since_created).unwrap_or(0) as i64;

        score.clamp(0, 100) as u32
    }

    /// Conversion probability in [min_probability, max_probability]
    pub fn conversion_probability(
        &self,
        quality: u32,
        urgency: u32,
        source: LeadSource,
        days_since_created: u32,
    ) -> f64 {
        let c = &self.config.scoring.conversion;
        let base = c.quality_weight * (quality.min(100) as f64 / 100.0)
            + c.urgency_weight * (urgency.min(100) as f64 / 100.0);
        let decay = age_tier_value(&c.decay, days_since_created).unwrap_or(1.0);
        let probability = base * c.source_multiplier(source) * decay;
        probability.clamp(c.min_probability, c.max_probability)
    }

    /// Human-readable signals in a fixed order: thresholds, then page keywords
    pub fn intent_signals(&self, behavior: &BehaviorCounters) -> Vec<String> {
        let intent = &self.config.scoring.intent;
        let mut signals = Vec::new();

        if behavior.site_visits >= intent.min_visits {
            signals.push(format!("Returned to the site {} times", behavior.site_visits));
        }
        if behavior.page_views >= intent.min_page_views {
            signals.push(format!("Browsed {} pages", behavior.page_views));
        }
        if behavior.time_on_site_secs >= intent.min_time_on_site_secs {
            signals.push(format!(
                "Spent {} minutes on site",
                behavior.time_on_site_secs / 60
            ));
        }
        if behavior.form_abandoned {
            signals.push("Started an inquiry form without submitting".to_string());
        }
        if behavior.emails_opened >= intent.min_emails_opened {
            signals.push(format!("Opened {} emails", behavior.emails_opened));
        }
        if behavior.links_clicked >= intent.min_links_clicked {
            signals.push(format!("Clicked {} email links", behavior.links_clicked));
        }

        if let Some(page) = behavior.last_page_viewed.as_deref() {
            let page = page.to_lowercase();
            for group in &intent.page_keywords {
                if group.keywords.iter().any(|k| page.contains(&k.to_lowercase())) {
                    signals.push(group.signal.clone());
                }
            }
        }

        signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> LeadScorer {
        LeadScorer::new(Arc::new(GrowthConfig::default()))
    }

    fn engaged_referral() -> BehaviorCounters {
        BehaviorCounters {
            site_visits: 5,
            page_views: 10,
            time_on_site_secs: 320,
            form_abandoned: true,
            emails_opened: 3,
            links_clicked: 2,
            replies_received: 0,
            last_page_viewed: Some("/pricing".to_string()),
        }
    }

    #[test]
    fn test_engaged_referral_lead() {
        let score = scorer().score(&engaged_referral(), LeadSource::Referral, 2);

        // 20 + 15 + 15 + 10 + 15 + 20
        assert_eq!(score.quality, 95);
        // 30 recent activity + 20 page views + 20 dwell + 15 abandoned form
        assert_eq!(score.urgency, 85);
        // (0.475 + 0.17) * 1.5 = 0.9675 before clamping
        assert_eq!(score.conversion_probability, 0.95);
        assert_eq!(score.factors[factors::SOURCE_QUALITY], 20);
        assert!(score
            .signals
            .contains(&"Viewed pricing information".to_string()));
    }

    #[test]
    fn test_empty_behaviour_scores_source_only() {
        let score = scorer().score(&BehaviorCounters::default(), LeadSource::Social, 0);
        assert_eq!(score.quality, 5);
        assert_eq!(score.urgency, 0);
        // 0.5 * 0.05 * 0.75
        assert!((score.conversion_probability - 0.01875).abs() < 1e-9);
        assert!(score.signals.is_empty());
    }

    #[test]
    fn test_outputs_stay_in_range_for_extreme_counters() {
        let behavior = BehaviorCounters {
            site_visits: u32::MAX,
            page_views: u32::MAX,
            time_on_site_secs: u32::MAX,
            form_abandoned: true,
            emails_opened: u32::MAX,
            links_clicked: u32::MAX,
            replies_received: u32::MAX,
            last_page_viewed: None,
        };
        let s = scorer();
        for age in [0, 5, 10, 20, 40, 400] {
            let score = s.score(&behavior, LeadSource::WalkIn, age);
            assert!(score.quality <= 100);
            assert!(score.urgency <= 100);
            assert!((0.01..=0.95).contains(&score.conversion_probability));
        }
    }

    #[test]
    fn test_urgency_age_penalty() {
        let s = scorer();
        let behavior = BehaviorCounters {
            page_views: 10,
            time_on_site_secs: 320,
            ..Default::default()
        };
        assert_eq!(s.urgency_score(&behavior, 7), 40);
        assert_eq!(s.urgency_score(&behavior, 8), 30);
        assert_eq!(s.urgency_score(&behavior, 15), 20);
    }

    #[test]
    fn test_recent_activity_rules() {
        let s = scorer();
        let behavior = BehaviorCounters {
            site_visits: 2,
            ..Default::default()
        };
        assert_eq!(s.urgency_score(&behavior, 1), 15);
        assert_eq!(s.urgency_score(&behavior, 7), 15);

        let busier = BehaviorCounters {
            site_visits: 3,
            ..Default::default()
        };
        assert_eq!(s.urgency_score(&busier, 3), 30);
        assert_eq!(s.urgency_score(&busier, 4), 15);
    }

    #[test]
    fn test_conversion_decay() {
        let s = scorer();
        let fresh = s.conversion_probability(60, 40, LeadSource::Website, 0);
        let week = s.conversion_probability(60, 40, LeadSource::Website, 8);
        let month = s.conversion_probability(60, 40, LeadSource::Website, 31);
        assert!((fresh - 0.38).abs() < 1e-9);
        assert!((week - 0.38 * 0.85).abs() < 1e-9);
        assert!((month - 0.38 * 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let s = scorer();
        let a = s.score(&engaged_referral(), LeadSource::Facebook, 9);
        let b = s.score(&engaged_referral(), LeadSource::Facebook, 9);
        assert_eq!(a, b);
    }

    #[test]
    fn test_intent_signal_order() {
        let signals = scorer().intent_signals(&BehaviorCounters {
            site_visits: 4,
            links_clicked: 1,
            last_page_viewed: Some("/Insurance/Book-Now".to_string()),
            ..Default::default()
        });
        assert_eq!(
            signals,
            vec![
                "Returned to the site 4 times".to_string(),
                "Clicked 1 email links".to_string(),
                "Researched insurance coverage".to_string(),
                "Visited scheduling page".to_string(),
            ]
        );
    }
}
