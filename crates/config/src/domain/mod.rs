//! Growth configuration
//!
//! Every threshold, weight, template and catalog the engines use, grouped by
//! engine. Loaded once from YAML at start-up and shared read-only:
//!
//! ```yaml
//! scoring:      # quality / urgency / conversion / intent signals
//! lifecycle:    # HOT / WARM / COLD thresholds, cache TTL, history cap
//! nurture:      # selection thresholds, timing, sequence templates
//! response:     # keyword sets, engagement caps
//! referral:     # NPS inference, referral factors, outreach window
//! reactivation: # evidence weights, score modifiers, approaches, offers
//! reputation:   # platform weights, risk bands, trend window
//! staff:        # matcher coefficients
//! ```
//!
//! Missing sections and fields fall back to their defaults, so an empty file
//! is a valid configuration.

pub mod nurture;
pub mod reactivation;
pub mod referral;
pub mod reputation;
pub mod response;
pub mod scoring;
pub mod staff;
pub mod tiers;

pub use nurture::{ContentType, NurtureConfig, SequenceStep, TimingConfig};
pub use reactivation::{
    EvidenceWeights, NoteKeywordRule, OfferDefinition, ReactivationConfig,
    ReactivationScoringConfig, ReasonWeights,
};
pub use referral::{
    CountAdjustment, NpsInferenceConfig, RatingAdjustment, ReferralConfig, ReferralScoringConfig,
};
pub use reputation::{PlatformScoreConfig, ReputationConfig};
pub use response::{EngagementScoringConfig, ResponseConfig};
pub use scoring::{
    ActivityRule, ConversionScoringConfig, IntentSignalConfig, LifecycleConfig, PageKeywordSignal,
    QualityScoringConfig, ScoringConfig, UrgencyScoringConfig,
};
pub use staff::StaffMatchConfig;
pub use tiers::{
    age_tier_value, float_tier_points, tier_points, AgeTier, FloatTier, ThresholdTier,
};

use practice_growth_core::SequenceType;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ConfigError;
use tiers::is_descending;

/// All engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthConfig {
    pub scoring: ScoringConfig,
    pub lifecycle: LifecycleConfig,
    pub nurture: NurtureConfig,
    pub response: ResponseConfig,
    pub referral: ReferralConfig,
    pub reactivation: ReactivationConfig,
    pub reputation: ReputationConfig,
    pub staff: StaffMatchConfig,
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.into(),
    }
}

fn check_unit(field: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, format!("Must be between 0.0 and 1.0, got {}", value)))
    }
}

fn check_descending<K: PartialOrd>(
    field: &str,
    keys: impl IntoIterator<Item = K>,
) -> Result<(), ConfigError> {
    if is_descending(keys) {
        Ok(())
    } else {
        Err(invalid(field, "Rows must be ordered from the highest threshold down"))
    }
}

impl GrowthConfig {
    /// Load and validate a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path.display().to_string()))?;
        let config = Self::from_yaml(&content)?;
        tracing::info!(path = %path.display(), "Loaded growth configuration");
        Ok(config)
    }

    /// Parse and validate YAML text
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        // serde_yaml rejects an empty document, treat it as all-defaults
        let config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(content)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engines cannot interpret
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_scoring()?;
        self.validate_lifecycle()?;
        self.validate_nurture()?;
        self.validate_referral()?;
        self.validate_reactivation()?;
        self.validate_reputation()?;
        Ok(())
    }

    fn validate_scoring(&self) -> Result<(), ConfigError> {
        let scoring = &self.scoring;
        check_descending(
            "scoring.quality.dwell_tiers",
            scoring.quality.dwell_tiers.iter().map(|t| t.min),
        )?;
        check_descending(
            "scoring.urgency.page_view_tiers",
            scoring.urgency.page_view_tiers.iter().map(|t| t.min),
        )?;
        check_descending(
            "scoring.urgency.dwell_tiers",
            scoring.urgency.dwell_tiers.iter().map(|t| t.min),
        )?;
        check_descending(
            "scoring.urgency.age_penalties",
            scoring.urgency.age_penalties.iter().map(|t| t.after_days),
        )?;
        check_descending(
            "scoring.conversion.decay",
            scoring.conversion.decay.iter().map(|t| t.after_days),
        )?;

        let conversion = &scoring.conversion;
        check_unit("scoring.conversion.quality_weight", conversion.quality_weight)?;
        check_unit("scoring.conversion.urgency_weight", conversion.urgency_weight)?;
        check_unit("scoring.conversion.min_probability", conversion.min_probability)?;
        check_unit("scoring.conversion.max_probability", conversion.max_probability)?;
        if conversion.min_probability > conversion.max_probability {
            return Err(invalid(
                "scoring.conversion.min_probability",
                "Cannot exceed max_probability",
            ));
        }
        for tier in &conversion.decay {
            check_unit("scoring.conversion.decay", tier.value)?;
        }
        if let Some((source, multiplier)) = conversion
            .source_multipliers
            .iter()
            .find(|(_, m)| **m < 0.0)
        {
            return Err(invalid(
                "scoring.conversion.source_multipliers",
                format!("Multiplier for {} is negative: {}", source.as_str(), multiplier),
            ));
        }
        Ok(())
    }

    fn validate_lifecycle(&self) -> Result<(), ConfigError> {
        let lifecycle = &self.lifecycle;
        check_unit("lifecycle.warm_min_conversion", lifecycle.warm_min_conversion)?;
        if lifecycle.cache_ttl_hours < 0 {
            return Err(invalid("lifecycle.cache_ttl_hours", "Cannot be negative"));
        }
        if lifecycle.score_history_cap == 0 {
            return Err(invalid("lifecycle.score_history_cap", "Must be at least 1"));
        }
        Ok(())
    }

    fn validate_nurture(&self) -> Result<(), ConfigError> {
        let nurture = &self.nurture;
        for sequence in [
            SequenceType::Awareness,
            SequenceType::Consideration,
            SequenceType::Decision,
            SequenceType::ReEngagement,
        ] {
            let steps = nurture.steps(sequence);
            let field = format!("nurture.sequences.{}", sequence.as_str());
            if steps.is_empty() {
                return Err(invalid(&field, "Sequence has no steps"));
            }
            for (idx, step) in steps.iter().enumerate() {
                if step.step_number != idx as u32 + 1 {
                    return Err(invalid(
                        &field,
                        format!(
                            "Step {} is numbered {}, steps must be numbered 1..n in order",
                            idx + 1,
                            step.step_number
                        ),
                    ));
                }
            }
        }

        let timing = &nurture.timing;
        if timing.send_days.is_empty() {
            return Err(invalid("nurture.timing.send_days", "At least one send day is required"));
        }
        if timing.morning_hour > 23 || timing.afternoon_hour > 23 {
            return Err(invalid("nurture.timing", "Send hours must be between 0 and 23"));
        }
        check_unit(
            "nurture.consideration_min_conversion",
            nurture.consideration_min_conversion,
        )?;
        Ok(())
    }

    fn validate_referral(&self) -> Result<(), ConfigError> {
        let referral = &self.referral;
        if referral.outreach_min_days_after_visit > referral.outreach_max_days_after_visit {
            return Err(invalid(
                "referral.outreach_min_days_after_visit",
                "Cannot exceed outreach_max_days_after_visit",
            ));
        }
        if referral.default_min_nps > 10 {
            return Err(invalid("referral.default_min_nps", "Must be between 0 and 10"));
        }
        check_descending(
            "referral.scoring.review_tiers",
            referral.scoring.review_tiers.iter().map(|t| t.min),
        )?;
        check_descending(
            "referral.scoring.tenure_month_tiers",
            referral.scoring.tenure_month_tiers.iter().map(|t| t.min),
        )?;
        check_descending(
            "referral.nps.review_rating",
            referral.nps.review_rating.iter().map(|r| r.min_rating),
        )?;
        Ok(())
    }

    fn validate_reactivation(&self) -> Result<(), ConfigError> {
        let reactivation = &self.reactivation;
        check_unit("reactivation.unknown_confidence", reactivation.unknown_confidence)?;
        if let Some(day) = reactivation
            .financial_send_days
            .iter()
            .find(|d| !(1..=28).contains(*d))
        {
            return Err(invalid(
                "reactivation.financial_send_days",
                format!("Day {} is not valid in every month (1-28)", day),
            ));
        }
        for offer in &reactivation.offers {
            if let Some(max) = offer.max_days_lapsed {
                if max < offer.min_days_lapsed {
                    return Err(invalid(
                        "reactivation.offers",
                        format!("Offer {} has an inverted days-lapsed window", offer.id),
                    ));
                }
            }
        }
        check_descending(
            "reactivation.scoring.lifetime_value_tiers",
            reactivation.scoring.lifetime_value_tiers.iter().map(|t| t.min),
        )?;
        check_descending(
            "reactivation.scoring.visit_tiers",
            reactivation.scoring.visit_tiers.iter().map(|t| t.min),
        )?;
        check_descending(
            "reactivation.scoring.recency_penalties",
            reactivation.scoring.recency_penalties.iter().map(|t| t.after_days),
        )?;
        Ok(())
    }

    fn validate_reputation(&self) -> Result<(), ConfigError> {
        let reputation = &self.reputation;
        for (platform, weight) in &reputation.platform_weights {
            check_unit(
                &format!("reputation.platform_weights.{}", platform.as_str()),
                *weight,
            )?;
        }
        check_unit(
            "reputation.default_platform_weight",
            reputation.default_platform_weight,
        )?;
        if reputation.high_risk_below > reputation.medium_risk_below {
            return Err(invalid(
                "reputation.high_risk_below",
                "Cannot exceed medium_risk_below",
            ));
        }
        if reputation.trend_window_days <= 0 {
            return Err(invalid("reputation.trend_window_days", "Must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        assert!(GrowthConfig::default().validate().is_ok());
    }

    #[test]
    fn test_empty_document_is_all_defaults() {
        let config = GrowthConfig::from_yaml("").unwrap();
        assert_eq!(config.lifecycle.hot_min_quality, 70);
        assert_eq!(config.reputation.trend_window_days, 30);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
lifecycle:
  hot_min_quality: 80
reputation:
  platform_weights:
    google: 0.5
staff:
  pairing_bonus: 30.0
"#
        )
        .unwrap();

        let config = GrowthConfig::load(file.path()).unwrap();
        assert_eq!(config.lifecycle.hot_min_quality, 80);
        assert_eq!(config.lifecycle.hot_min_urgency, 60);
        assert_eq!(config.reputation.weight(practice_growth_core::ReviewPlatform::Google), 0.5);
        assert_eq!(config.staff.pairing_bonus, 30.0);
    }

    #[test]
    fn test_missing_file() {
        let err = GrowthConfig::load("/nonexistent/growth.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_rejects_weight_out_of_range() {
        let mut config = GrowthConfig::default();
        config.scoring.conversion.quality_weight = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_risk_bands() {
        let mut config = GrowthConfig::default();
        config.reputation.high_risk_below = 80.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_sequence() {
        let mut config = GrowthConfig::default();
        config.nurture.sequences.insert(SequenceType::Decision, Vec::new());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("decision"));
    }

    #[test]
    fn test_rejects_unsorted_tiers() {
        let mut config = GrowthConfig::default();
        config.scoring.quality.dwell_tiers.reverse();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_invalid_pay_day() {
        let mut config = GrowthConfig::default();
        config.reactivation.financial_send_days = vec![1, 31];
        assert!(config.validate().is_err());
    }
}
