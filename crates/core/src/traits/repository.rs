//! Storage traits
//!
//! Every lookup is scoped by practice: an id owned by another practice is
//! reported as absent.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::lead::{Lead, LeadCounter, LeadStatus};
use crate::opportunity::{ReactivationOpportunity, ReferralOpportunity};
use crate::patient::PatientRecord;
use crate::reputation::ReputationMetric;

#[async_trait]
pub trait LeadRepository: Send + Sync {
    async fn find(&self, practice_id: Uuid, lead_id: Uuid) -> Result<Option<Lead>>;

    /// First non-terminal lead matching the email or phone
    async fn find_active_by_contact(
        &self,
        practice_id: Uuid,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Option<Lead>>;

    async fn insert(&self, lead: &Lead) -> Result<Lead>;

    /// Write back a lead read earlier.
    ///
    /// Fails with `Conflict` when `lead.version` no longer matches the stored
    /// version; returns the stored copy with its bumped version.
    async fn update(&self, lead: &Lead) -> Result<Lead>;

    /// Atomically add `by` to a behavioural counter, stamping `updated_at`
    /// with `at`
    async fn increment_counter(
        &self,
        practice_id: Uuid,
        lead_id: Uuid,
        counter: LeadCounter,
        by: u32,
        at: DateTime<Utc>,
    ) -> Result<Lead>;

    async fn count_by_status(&self, practice_id: Uuid, status: LeadStatus) -> Result<usize>;
}

#[async_trait]
pub trait PatientRepository: Send + Sync {
    async fn find(&self, practice_id: Uuid, patient_id: Uuid) -> Result<Option<PatientRecord>>;

    async fn list(&self, practice_id: Uuid) -> Result<Vec<PatientRecord>>;
}

#[async_trait]
pub trait OpportunityRepository: Send + Sync {
    async fn find_referral(
        &self,
        practice_id: Uuid,
        patient_id: Uuid,
    ) -> Result<Option<ReferralOpportunity>>;

    /// Insert or replace the single referral record for the patient
    async fn save_referral(&self, opportunity: &ReferralOpportunity) -> Result<()>;

    async fn find_reactivation(
        &self,
        practice_id: Uuid,
        patient_id: Uuid,
    ) -> Result<Option<ReactivationOpportunity>>;

    async fn save_reactivation(&self, opportunity: &ReactivationOpportunity) -> Result<()>;

    /// Atomically bump the outreach attempt counter
    async fn increment_reactivation_attempts(
        &self,
        practice_id: Uuid,
        patient_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<ReactivationOpportunity>;
}

#[async_trait]
pub trait ReputationRepository: Send + Sync {
    async fn list_snapshots(&self, practice_id: Uuid) -> Result<Vec<ReputationMetric>>;

    async fn insert_snapshot(&self, metric: &ReputationMetric) -> Result<()>;
}
