//! Reputation Scoring Engine
//!
//! Folds dated per-platform snapshots into a practice-wide score. Snapshots
//! are never modified; the trend compares the latest view with the view one
//! trend window earlier.

use chrono::{DateTime, Duration, Utc};
use practice_growth_config::GrowthConfig;
use practice_growth_core::{ReputationMetric, ReviewPlatform};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    High,
    Medium,
    Low,
    /// No snapshots yet
    Unknown,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Stable,
    Declining,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReputationTrend {
    pub direction: TrendDirection,
    pub delta: f64,
    pub previous_score: f64,
    /// Newest snapshot time in the baseline view
    pub compared_to: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformScore {
    pub platform: ReviewPlatform,
    pub score: f64,
    pub weight: f64,
    pub rating: f64,
    pub review_count: u32,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReputationReport {
    pub overall_score: f64,
    pub platform_scores: Vec<PlatformScore>,
    pub risk_level: RiskLevel,
    /// `None` until snapshots span a full trend window
    pub trend: Option<ReputationTrend>,
    /// Platforms whose latest snapshot carries a negative review
    pub alerts: Vec<ReviewPlatform>,
}

/// Latest snapshot per platform among those accepted by `keep`
fn latest_by_platform<'a>(
    snapshots: &'a [ReputationMetric],
    keep: impl Fn(&ReputationMetric) -> bool,
) -> BTreeMap<ReviewPlatform, &'a ReputationMetric> {
    snapshots
        .iter()
        .filter(|m| keep(*m))
        .fold(BTreeMap::new(), |mut latest, metric| {
            latest
                .entry(metric.platform)
                .and_modify(|current| {
                    if metric.captured_at > current.captured_at {
                        *current = metric;
                    }
                })
                .or_insert(metric);
            latest
        })
}

#[derive(Debug, Clone)]
pub struct ReputationEngine {
    config: Arc<GrowthConfig>,
}

impl ReputationEngine {
    pub fn new(config: Arc<GrowthConfig>) -> Self {
        Self { config }
    }

    /// Score of one snapshot in [0, 100]
    pub fn platform_score(&self, metric: &ReputationMetric) -> f64 {
        let p = &self.config.reputation.platform;

        let rating = (metric.rating / 5.0).clamp(0.0, 1.0) * p.rating_points;
        let volume = ((metric.review_count as f64 + 1.0).log10() * p.volume_points_per_log10)
            .min(p.volume_max);
        let response = metric.response_rate.clamp(0.0, 1.0) * p.response_points;
        let sentiment = metric
            .sentiment
            .unwrap_or(p.neutral_sentiment)
            .clamp(-1.0, 1.0);
        let sentiment = (sentiment + 1.0) / 2.0 * p.sentiment_points;

        (rating + volume + response + sentiment).clamp(0.0, 100.0)
    }

    /// Weighted average over one snapshot per platform
    fn weighted(&self, view: &BTreeMap<ReviewPlatform, &ReputationMetric>) -> (f64, Vec<PlatformScore>) {
        let scores: Vec<PlatformScore> = view
            .values()
            .map(|metric| PlatformScore {
                platform: metric.platform,
                score: self.platform_score(metric),
                weight: self.config.reputation.weight(metric.platform),
                rating: metric.rating,
                review_count: metric.review_count,
                captured_at: metric.captured_at,
            })
            .collect();

        let total_weight: f64 = scores.iter().map(|s| s.weight).sum();
        let overall = if total_weight > 0.0 {
            scores.iter().map(|s| s.score * s.weight).sum::<f64>() / total_weight
        } else {
            0.0
        };
        (overall, scores)
    }

    pub fn risk_level(&self, overall: f64) -> RiskLevel {
        let r = &self.config.reputation;
        if overall < r.high_risk_below {
            RiskLevel::High
        } else if overall < r.medium_risk_below {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// Aggregate report over every stored snapshot
    pub fn report(&self, snapshots: &[ReputationMetric]) -> ReputationReport {
        let current = latest_by_platform(snapshots, |_| true);
        if current.is_empty() {
            return ReputationReport {
                overall_score: 0.0,
                platform_scores: Vec::new(),
                risk_level: RiskLevel::Unknown,
                trend: None,
                alerts: Vec::new(),
            };
        }

        let (overall, platform_scores) = self.weighted(&current);
        let alerts = current
            .values()
            .filter(|m| m.has_negative_review)
            .map(|m| m.platform)
            .collect();
        let trend = self.trend(snapshots, &current, overall);

        ReputationReport {
            overall_score: overall,
            platform_scores,
            risk_level: self.risk_level(overall),
            trend,
            alerts,
        }
    }

    fn trend(
        &self,
        snapshots: &[ReputationMetric],
        current: &BTreeMap<ReviewPlatform, &ReputationMetric>,
        overall: f64,
    ) -> Option<ReputationTrend> {
        let r = &self.config.reputation;
        let newest = current.values().map(|m| m.captured_at).max()?;
        let cutoff = newest - Duration::days(r.trend_window_days);

        let baseline = latest_by_platform(snapshots, |m| m.captured_at <= cutoff);
        let compared_to = baseline.values().map(|m| m.captured_at).max()?;
        let (previous, _) = self.weighted(&baseline);

        let delta = overall - previous;
        let direction = if delta > r.stable_band {
            TrendDirection::Improving
        } else if delta < -r.stable_band {
            TrendDirection::Declining
        } else {
            TrendDirection::Stable
        };

        Some(ReputationTrend {
            direction,
            delta,
            previous_score: previous,
            compared_to,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use practice_growth_core::RatingBreakdown;
    use uuid::Uuid;

    fn engine() -> ReputationEngine {
        ReputationEngine::new(Arc::new(GrowthConfig::default()))
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, d, 0, 0, 0).unwrap()
    }

    fn metric(
        platform: ReviewPlatform,
        rating: f64,
        reviews: u32,
        response_rate: f64,
        at: DateTime<Utc>,
    ) -> ReputationMetric {
        ReputationMetric {
            id: Uuid::new_v4(),
            practice_id: Uuid::nil(),
            platform,
            rating,
            review_count: reviews,
            breakdown: RatingBreakdown::default(),
            response_rate,
            sentiment: None,
            has_negative_review: false,
            captured_at: at,
        }
    }

    #[test]
    fn test_google_dominates_weighted_average() {
        let snapshots = vec![
            metric(ReviewPlatform::Google, 4.8, 150, 0.6, day(20)),
            metric(ReviewPlatform::Yelp, 3.5, 10, 0.0, day(20)),
        ];
        let e = engine();
        let report = e.report(&snapshots);

        let google = e.platform_score(&snapshots[0]);
        let yelp = e.platform_score(&snapshots[1]);
        // 57.6 + 20 (capped volume) + 6 + 5
        assert!((google - 88.6).abs() < 1e-9);
        assert!(yelp < 60.0);
        let expected = (google * 0.4 + yelp * 0.25) / 0.65;
        assert!((report.overall_score - expected).abs() < 1e-9);
        assert!((report.overall_score - 76.6).abs() < 0.1);
        assert_eq!(report.risk_level, RiskLevel::Low);
        assert!(report.trend.is_none());
    }

    #[test]
    fn test_latest_snapshot_per_platform_wins() {
        let snapshots = vec![
            metric(ReviewPlatform::Google, 2.0, 5, 0.0, day(1)),
            metric(ReviewPlatform::Google, 4.0, 50, 0.5, day(10)),
            metric(ReviewPlatform::Google, 1.0, 5, 0.0, day(5)),
        ];
        let report = engine().report(&snapshots);
        assert_eq!(report.platform_scores.len(), 1);
        assert_eq!(report.platform_scores[0].rating, 4.0);
    }

    #[test]
    fn test_single_snapshot_has_no_trend() {
        let report = engine().report(&[metric(ReviewPlatform::Yelp, 4.0, 20, 0.5, day(1))]);
        assert!(report.trend.is_none());
    }

    #[test]
    fn test_trend_compares_across_window() {
        let old = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let snapshots = vec![
            metric(ReviewPlatform::Google, 3.0, 20, 0.1, old),
            metric(ReviewPlatform::Google, 4.5, 40, 0.8, day(20)),
        ];
        let trend = engine().report(&snapshots).trend.unwrap();
        assert_eq!(trend.direction, TrendDirection::Improving);
        assert!(trend.delta > 2.0);
        assert_eq!(trend.compared_to, old);

        let declining = vec![
            metric(ReviewPlatform::Google, 4.5, 40, 0.8, old),
            metric(ReviewPlatform::Google, 3.0, 40, 0.1, day(20)),
        ];
        assert_eq!(
            engine().report(&declining).trend.unwrap().direction,
            TrendDirection::Declining
        );
    }

    #[test]
    fn test_risk_bands_and_alerts() {
        let e = engine();
        assert_eq!(e.risk_level(49.9), RiskLevel::High);
        assert_eq!(e.risk_level(50.0), RiskLevel::Medium);
        assert_eq!(e.risk_level(70.0), RiskLevel::Low);

        let mut bad = metric(ReviewPlatform::Facebook, 1.5, 3, 0.0, day(2));
        bad.has_negative_review = true;
        let report = e.report(&[bad]);
        assert_eq!(report.alerts, vec![ReviewPlatform::Facebook]);
        assert_eq!(report.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_empty_report() {
        let report = engine().report(&[]);
        assert_eq!(report.risk_level, RiskLevel::Unknown);
        assert!(report.platform_scores.is_empty());
    }
}
