//! Append-only reputation snapshots

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use practice_growth_core::{Error, ReputationMetric, ReputationRepository, Result};

#[derive(Default)]
pub struct InMemoryReputationRepository {
    snapshots: RwLock<Vec<ReputationMetric>>,
}

impl InMemoryReputationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReputationRepository for InMemoryReputationRepository {
    /// Snapshots for the practice, oldest first
    async fn list_snapshots(&self, practice_id: Uuid) -> Result<Vec<ReputationMetric>> {
        let mut snapshots: Vec<ReputationMetric> = self
            .snapshots
            .read()
            .iter()
            .filter(|m| m.practice_id == practice_id)
            .cloned()
            .collect();
        snapshots.sort_by_key(|m| m.captured_at);
        Ok(snapshots)
    }

    async fn insert_snapshot(&self, metric: &ReputationMetric) -> Result<()> {
        let mut snapshots = self.snapshots.write();
        if snapshots.iter().any(|m| m.id == metric.id) {
            return Err(Error::Conflict(format!("snapshot {} already recorded", metric.id)));
        }
        snapshots.push(metric.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use practice_growth_core::ReviewPlatform;

    fn metric(practice_id: Uuid, days_ago: i64) -> ReputationMetric {
        ReputationMetric {
            id: Uuid::new_v4(),
            practice_id,
            platform: ReviewPlatform::Google,
            rating: 4.5,
            review_count: 100,
            breakdown: Default::default(),
            response_rate: 0.5,
            sentiment: None,
            has_negative_review: false,
            captured_at: Utc::now() - Duration::days(days_ago),
        }
    }

    #[tokio::test]
    async fn test_snapshots_sorted_oldest_first() {
        let repo = InMemoryReputationRepository::new();
        let practice = Uuid::new_v4();
        repo.insert_snapshot(&metric(practice, 1)).await.unwrap();
        repo.insert_snapshot(&metric(practice, 40)).await.unwrap();
        repo.insert_snapshot(&metric(Uuid::new_v4(), 5)).await.unwrap();

        let snapshots = repo.list_snapshots(practice).await.unwrap();
        assert_eq!(snapshots.len(), 2);
        assert!(snapshots[0].captured_at < snapshots[1].captured_at);
    }

    #[tokio::test]
    async fn test_duplicate_snapshot_rejected() {
        let repo = InMemoryReputationRepository::new();
        let m = metric(Uuid::new_v4(), 0);
        repo.insert_snapshot(&m).await.unwrap();
        assert!(matches!(
            repo.insert_snapshot(&m).await,
            Err(Error::Conflict(_))
        ));
    }
}
