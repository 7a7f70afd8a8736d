//! Referral and reactivation records, one of each per patient

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use practice_growth_core::{
    Error, OpportunityRepository, ReactivationOpportunity, ReferralOpportunity, Result,
};

type Key = (Uuid, Uuid);

#[derive(Default)]
pub struct InMemoryOpportunityRepository {
    referrals: RwLock<HashMap<Key, ReferralOpportunity>>,
    reactivations: RwLock<HashMap<Key, ReactivationOpportunity>>,
}

impl InMemoryOpportunityRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OpportunityRepository for InMemoryOpportunityRepository {
    async fn find_referral(
        &self,
        practice_id: Uuid,
        patient_id: Uuid,
    ) -> Result<Option<ReferralOpportunity>> {
        Ok(self.referrals.read().get(&(practice_id, patient_id)).cloned())
    }

    async fn save_referral(&self, opportunity: &ReferralOpportunity) -> Result<()> {
        self.referrals.write().insert(
            (opportunity.practice_id, opportunity.patient_id),
            opportunity.clone(),
        );
        Ok(())
    }

    async fn find_reactivation(
        &self,
        practice_id: Uuid,
        patient_id: Uuid,
    ) -> Result<Option<ReactivationOpportunity>> {
        Ok(self
            .reactivations
            .read()
            .get(&(practice_id, patient_id))
            .cloned())
    }

    async fn save_reactivation(&self, opportunity: &ReactivationOpportunity) -> Result<()> {
        self.reactivations.write().insert(
            (opportunity.practice_id, opportunity.patient_id),
            opportunity.clone(),
        );
        Ok(())
    }

    async fn increment_reactivation_attempts(
        &self,
        practice_id: Uuid,
        patient_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<ReactivationOpportunity> {
        let mut map = self.reactivations.write();
        let record = map
            .get_mut(&(practice_id, patient_id))
            .ok_or_else(|| Error::not_found("reactivation opportunity", patient_id))?;
        record.outreach_attempts = record.outreach_attempts.saturating_add(1);
        record.updated_at = at;
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use practice_growth_core::{Channel, LapseReason, OutreachApproach, ReactivationStatus};

    fn reactivation(practice_id: Uuid, patient_id: Uuid) -> ReactivationOpportunity {
        let now = Utc::now();
        ReactivationOpportunity {
            id: Uuid::new_v4(),
            practice_id,
            patient_id,
            last_visit_at: None,
            days_lapsed: 400,
            lifetime_value: 1200.0,
            likely_reason: LapseReason::Forgot,
            reason_confidence: 0.4,
            reason_factors: vec![],
            reactivation_score: 55,
            recommended_approach: OutreachApproach::Email,
            recommended_offer_id: None,
            recommended_channel: Channel::Email,
            outreach_attempts: 0,
            last_contacted_at: None,
            status: ReactivationStatus::Identified,
            analyzed_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_save_replaces_existing_record() {
        let repo = InMemoryOpportunityRepository::new();
        let (practice, patient) = (Uuid::new_v4(), Uuid::new_v4());

        let mut record = reactivation(practice, patient);
        repo.save_reactivation(&record).await.unwrap();
        record.reactivation_score = 80;
        repo.save_reactivation(&record).await.unwrap();

        let stored = repo.find_reactivation(practice, patient).await.unwrap().unwrap();
        assert_eq!(stored.reactivation_score, 80);
        assert!(repo
            .find_reactivation(Uuid::new_v4(), patient)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_increment_attempts() {
        let repo = InMemoryOpportunityRepository::new();
        let (practice, patient) = (Uuid::new_v4(), Uuid::new_v4());
        repo.save_reactivation(&reactivation(practice, patient))
            .await
            .unwrap();

        let at = Utc::now();
        repo.increment_reactivation_attempts(practice, patient, at)
            .await
            .unwrap();
        let record = repo
            .increment_reactivation_attempts(practice, patient, at)
            .await
            .unwrap();
        assert_eq!(record.outreach_attempts, 2);
        assert_eq!(record.updated_at, at);

        let err = repo
            .increment_reactivation_attempts(practice, Uuid::new_v4(), at)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }
}
