//! Lead Scoring Configuration
//!
//! Quality, urgency, conversion and intent-signal rules. Every constant is a
//! named field so a practice can override it from YAML; defaults reproduce
//! the hand-tuned values the engine shipped with.

use practice_growth_core::LeadSource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::tiers::{AgeTier, ThresholdTier};

/// Scoring configuration loaded from the `scoring` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub quality: QualityScoringConfig,
    pub urgency: UrgencyScoringConfig,
    pub conversion: ConversionScoringConfig,
    pub intent: IntentSignalConfig,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            quality: QualityScoringConfig::default(),
            urgency: UrgencyScoringConfig::default(),
            conversion: ConversionScoringConfig::default(),
            intent: IntentSignalConfig::default(),
        }
    }
}

/// Quality sub-scores. Each is capped independently, the sum is clamped to 100.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityScoringConfig {
    pub points_per_visit: u32,
    pub visit_max: u32,
    pub points_per_page_view: u32,
    pub page_depth_max: u32,
    /// Seconds on site → points, strictest first
    pub dwell_tiers: Vec<ThresholdTier>,
    pub dwell_max: u32,
    /// Abandoning a form still signals intent
    pub form_abandoned_points: u32,
    pub points_per_email_open: u32,
    pub points_per_link_click: u32,
    pub email_max: u32,
    pub source_points: BTreeMap<LeadSource, u32>,
    /// Used for any source missing from the table
    pub default_source_points: u32,
    pub source_max: u32,
}

impl Default for QualityScoringConfig {
    fn default() -> Self {
        let source_points = BTreeMap::from([
            (LeadSource::Referral, 20),
            (LeadSource::WalkIn, 18),
            (LeadSource::Phone, 15),
            (LeadSource::GoogleAds, 12),
            (LeadSource::Event, 12),
            (LeadSource::Website, 10),
            (LeadSource::Email, 10),
            (LeadSource::Facebook, 8),
            (LeadSource::Instagram, 7),
            (LeadSource::Social, 5),
            (LeadSource::Other, 5),
        ]);

        Self {
            points_per_visit: 4,
            visit_max: 20,
            points_per_page_view: 2,
            page_depth_max: 15,
            dwell_tiers: vec![
                ThresholdTier::new(300, 15),
                ThresholdTier::new(120, 10),
                ThresholdTier::new(60, 5),
            ],
            dwell_max: 15,
            form_abandoned_points: 10,
            points_per_email_open: 3,
            points_per_link_click: 5,
            email_max: 15,
            source_points,
            default_source_points: 5,
            source_max: 20,
        }
    }
}

impl QualityScoringConfig {
    pub fn source_points(&self, source: LeadSource) -> u32 {
        self.source_points
            .get(&source)
            .copied()
            .unwrap_or(self.default_source_points)
            .min(self.source_max)
    }
}

/// Recent-activity rule: `visits >= min_visits` within `max_age_days` of capture
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivityRule {
    pub max_age_days: u32,
    pub min_visits: u32,
    pub points: u32,
}

/// Urgency: additive signals minus an age penalty
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UrgencyScoringConfig {
    /// Evaluated in order, first match wins
    pub activity_rules: Vec<ActivityRule>,
    pub page_view_tiers: Vec<ThresholdTier>,
    pub dwell_tiers: Vec<ThresholdTier>,
    pub form_abandoned_points: u32,
    /// Subtracted once the lead is older than `after_days`
    pub age_penalties: Vec<AgeTier<u32>>,
}

impl Default for UrgencyScoringConfig {
    fn default() -> Self {
        Self {
            activity_rules: vec![
                ActivityRule {
                    max_age_days: 3,
                    min_visits: 3,
                    points: 30,
                },
                ActivityRule {
                    max_age_days: 7,
                    min_visits: 2,
                    points: 15,
                },
            ],
            page_view_tiers: vec![ThresholdTier::new(10, 20), ThresholdTier::new(5, 10)],
            dwell_tiers: vec![ThresholdTier::new(300, 20), ThresholdTier::new(120, 10)],
            form_abandoned_points: 15,
            age_penalties: vec![AgeTier::new(14, 20), AgeTier::new(7, 10)],
        }
    }
}

/// Conversion probability
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionScoringConfig {
    pub quality_weight: f64,
    pub urgency_weight: f64,
    pub source_multipliers: BTreeMap<LeadSource, f64>,
    pub default_source_multiplier: f64,
    /// Multiplicative decay once the lead is older than `after_days`
    pub decay: Vec<AgeTier<f64>>,
    pub min_probability: f64,
    pub max_probability: f64,
}

impl Default for ConversionScoringConfig {
    fn default() -> Self {
        let source_multipliers = BTreeMap::from([
            (LeadSource::WalkIn, 1.6),
            (LeadSource::Referral, 1.5),
            (LeadSource::Phone, 1.4),
            (LeadSource::Event, 1.2),
            (LeadSource::GoogleAds, 1.1),
            (LeadSource::Website, 1.0),
            (LeadSource::Email, 0.9),
            (LeadSource::Facebook, 0.8),
            (LeadSource::Instagram, 0.8),
            (LeadSource::Social, 0.75),
            (LeadSource::Other, 0.7),
        ]);

        Self {
            quality_weight: 0.5,
            urgency_weight: 0.2,
            source_multipliers,
            default_source_multiplier: 0.7,
            decay: vec![
                AgeTier::new(30, 0.5),
                AgeTier::new(14, 0.7),
                AgeTier::new(7, 0.85),
            ],
            min_probability: 0.01,
            max_probability: 0.95,
        }
    }
}

impl ConversionScoringConfig {
    pub fn source_multiplier(&self, source: LeadSource) -> f64 {
        self.source_multipliers
            .get(&source)
            .copied()
            .unwrap_or(self.default_source_multiplier)
    }
}

/// Keyword group matched against the last page URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageKeywordSignal {
    pub keywords: Vec<String>,
    pub signal: String,
}

impl PageKeywordSignal {
    fn new(keywords: &[&str], signal: &str) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            signal: signal.to_string(),
        }
    }
}

/// Human-readable intent signals
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntentSignalConfig {
    pub min_visits: u32,
    pub min_page_views: u32,
    pub min_time_on_site_secs: u32,
    pub min_emails_opened: u32,
    pub min_links_clicked: u32,
    pub page_keywords: Vec<PageKeywordSignal>,
}

impl Default for IntentSignalConfig {
    fn default() -> Self {
        Self {
            min_visits: 3,
            min_page_views: 10,
            min_time_on_site_secs: 300,
            min_emails_opened: 3,
            min_links_clicked: 1,
            page_keywords: vec![
                PageKeywordSignal::new(&["pricing", "price", "cost", "fees"], "Viewed pricing information"),
                PageKeywordSignal::new(&["insurance", "coverage", "billing"], "Researched insurance coverage"),
                PageKeywordSignal::new(
                    &["schedule", "book", "appointment", "contact"],
                    "Visited scheduling page",
                ),
                PageKeywordSignal::new(
                    &["testimonial", "review", "success-stories"],
                    "Read patient testimonials",
                ),
            ],
        }
    }
}

/// Lifecycle thresholds and score caching
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    pub hot_min_quality: u32,
    pub hot_min_urgency: u32,
    pub warm_min_quality: u32,
    pub warm_min_conversion: f64,
    /// COLD when quality is strictly below this ...
    pub cold_below_quality: u32,
    /// ... and the lead is strictly older than this
    pub cold_after_days: u32,
    pub cache_ttl_hours: i64,
    pub score_history_cap: usize,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            hot_min_quality: 70,
            hot_min_urgency: 60,
            warm_min_quality: 50,
            warm_min_conversion: 0.4,
            cold_below_quality: 30,
            cold_after_days: 14,
            cache_ttl_hours: 24,
            score_history_cap: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_source_gets_lowest_tier() {
        let mut config = QualityScoringConfig::default();
        config.source_points.remove(&LeadSource::Instagram);
        assert_eq!(config.source_points(LeadSource::Instagram), 5);
        assert_eq!(config.source_points(LeadSource::Referral), 20);
    }

    #[test]
    fn test_source_multiplier_lookup() {
        let config = ConversionScoringConfig::default();
        assert_eq!(config.source_multiplier(LeadSource::Referral), 1.5);
        assert_eq!(config.source_multiplier(LeadSource::Other), 0.7);
    }

    #[test]
    fn test_yaml_override_keeps_defaults() {
        let yaml = r#"
quality:
  visit_max: 25
  source_points:
    referral: 18
"#;
        let config: ScoringConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.quality.visit_max, 25);
        assert_eq!(config.quality.source_points(LeadSource::Referral), 18);
        // Missing table rows fall back to the lowest tier
        assert_eq!(config.quality.source_points(LeadSource::WalkIn), 5);
        assert_eq!(config.quality.page_depth_max, 15);
        assert_eq!(config.conversion.max_probability, 0.95);
    }
}
