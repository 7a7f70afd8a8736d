//! Reputation Scoring Configuration

use practice_growth_core::ReviewPlatform;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-platform score components, summing to at most 100
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformScoreConfig {
    /// rating / 5 × this
    pub rating_points: f64,
    /// log10(reviews + 1) × this, capped at `volume_max`
    pub volume_points_per_log10: f64,
    pub volume_max: f64,
    /// response rate × this
    pub response_points: f64,
    /// ((sentiment + 1) / 2) × this
    pub sentiment_points: f64,
    /// Used when a snapshot carries no sentiment
    pub neutral_sentiment: f64,
}

impl Default for PlatformScoreConfig {
    fn default() -> Self {
        Self {
            rating_points: 60.0,
            volume_points_per_log10: 10.0,
            volume_max: 20.0,
            response_points: 10.0,
            sentiment_points: 10.0,
            neutral_sentiment: 0.0,
        }
    }
}

/// Reputation configuration loaded from the `reputation` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReputationConfig {
    pub platform_weights: BTreeMap<ReviewPlatform, f64>,
    pub default_platform_weight: f64,
    pub platform: PlatformScoreConfig,
    /// Overall score strictly below this is high risk
    pub high_risk_below: f64,
    /// ... strictly below this is medium risk
    pub medium_risk_below: f64,
    /// Baseline snapshots must be at least this old
    pub trend_window_days: i64,
    /// Score deltas inside ±band are reported as stable
    pub stable_band: f64,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            platform_weights: BTreeMap::from([
                (ReviewPlatform::Google, 0.4),
                (ReviewPlatform::Yelp, 0.25),
                (ReviewPlatform::Facebook, 0.2),
                (ReviewPlatform::Healthgrades, 0.15),
            ]),
            default_platform_weight: 0.1,
            platform: PlatformScoreConfig::default(),
            high_risk_below: 50.0,
            medium_risk_below: 70.0,
            trend_window_days: 30,
            stable_band: 2.0,
        }
    }
}

impl ReputationConfig {
    pub fn weight(&self, platform: ReviewPlatform) -> f64 {
        self.platform_weights
            .get(&platform)
            .copied()
            .unwrap_or(self.default_platform_weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlisted_platform_uses_default_weight() {
        let config = ReputationConfig::default();
        assert_eq!(config.weight(ReviewPlatform::Google), 0.4);
        assert_eq!(config.weight(ReviewPlatform::Zocdoc), 0.1);
        assert_eq!(config.weight(ReviewPlatform::Other), 0.1);
    }
}
