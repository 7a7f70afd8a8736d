//! Reputation reporting and snapshot capture

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use practice_growth_core::{Error, RatingBreakdown, ReputationMetric, Result, ReviewPlatform};
use practice_growth_engine::ReputationReport;

use crate::GrowthService;

/// One platform observation as submitted by an integration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotInput {
    pub platform: ReviewPlatform,
    pub rating: f64,
    pub review_count: u32,
    #[serde(default)]
    pub breakdown: RatingBreakdown,
    #[serde(default)]
    pub response_rate: f64,
    /// Normalised to [-1, 1]
    #[serde(default)]
    pub sentiment: Option<f64>,
    #[serde(default)]
    pub has_negative_review: bool,
    /// Defaults to now
    #[serde(default)]
    pub captured_at: Option<DateTime<Utc>>,
}

impl SnapshotInput {
    fn validate(&self) -> Result<()> {
        if !(0.0..=5.0).contains(&self.rating) {
            return Err(Error::BadRequest(format!(
                "rating must be within 0-5, got {}",
                self.rating
            )));
        }
        if !(0.0..=1.0).contains(&self.response_rate) {
            return Err(Error::BadRequest(format!(
                "response_rate must be within 0-1, got {}",
                self.response_rate
            )));
        }
        if let Some(sentiment) = self.sentiment {
            if !(-1.0..=1.0).contains(&sentiment) {
                return Err(Error::BadRequest(format!(
                    "sentiment must be within -1..1, got {}",
                    sentiment
                )));
            }
        }
        let counted = self.breakdown.total();
        if counted > self.review_count {
            return Err(Error::BadRequest(format!(
                "rating breakdown counts {} reviews but review_count is {}",
                counted, self.review_count
            )));
        }
        Ok(())
    }
}

impl GrowthService {
    pub async fn get_reputation_score(&self) -> Result<ReputationReport> {
        let snapshots = self.store.reputation.list_snapshots(self.practice_id()).await?;
        let report = self.engines.reputation.report(&snapshots);

        tracing::debug!(
            snapshots = snapshots.len(),
            overall = report.overall_score,
            risk = report.risk_level.as_str(),
            "Reputation report computed"
        );
        if !report.alerts.is_empty() {
            tracing::warn!(platforms = ?report.alerts, "Negative reviews flagged");
        }
        Ok(report)
    }

    /// Append an immutable platform snapshot
    pub async fn record_reputation_snapshot(
        &self,
        input: SnapshotInput,
    ) -> Result<ReputationMetric> {
        input.validate()?;

        let metric = ReputationMetric {
            id: Uuid::new_v4(),
            practice_id: self.practice_id(),
            platform: input.platform,
            rating: input.rating,
            review_count: input.review_count,
            breakdown: input.breakdown,
            response_rate: input.response_rate,
            sentiment: input.sentiment,
            has_negative_review: input.has_negative_review,
            captured_at: input.captured_at.unwrap_or_else(|| self.now()),
        };
        self.store.reputation.insert_snapshot(&metric).await?;

        tracing::info!(
            platform = metric.platform.as_str(),
            rating = metric.rating,
            review_count = metric.review_count,
            "Reputation snapshot recorded"
        );
        self.audit(
            "reputation_snapshot_recorded",
            "reputation_metric",
            json!({
                "metric_id": metric.id,
                "platform": metric.platform.as_str(),
                "rating": metric.rating,
                "review_count": metric.review_count,
                "has_negative_review": metric.has_negative_review,
            }),
        )
        .await?;

        Ok(metric)
    }
}
