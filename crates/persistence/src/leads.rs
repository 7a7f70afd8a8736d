//! Lead storage with optimistic concurrency

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use practice_growth_core::{Error, Lead, LeadCounter, LeadRepository, LeadStatus, Result};

/// Leads keyed by id; every read is filtered by practice
#[derive(Default)]
pub struct InMemoryLeadRepository {
    leads: RwLock<HashMap<Uuid, Lead>>,
}

impl InMemoryLeadRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.leads.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.leads.read().is_empty()
    }
}

#[async_trait]
impl LeadRepository for InMemoryLeadRepository {
    async fn find(&self, practice_id: Uuid, lead_id: Uuid) -> Result<Option<Lead>> {
        Ok(self
            .leads
            .read()
            .get(&lead_id)
            .filter(|lead| lead.practice_id == practice_id)
            .cloned())
    }

    async fn find_active_by_contact(
        &self,
        practice_id: Uuid,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Option<Lead>> {
        let leads = self.leads.read();
        // Oldest match wins so repeated captures keep landing on the same lead
        Ok(leads
            .values()
            .filter(|lead| lead.practice_id == practice_id && !lead.is_terminal())
            .filter(|lead| lead.matches_contact(email, phone))
            .min_by_key(|lead| lead.created_at)
            .cloned())
    }

    async fn insert(&self, lead: &Lead) -> Result<Lead> {
        let mut leads = self.leads.write();
        if leads.contains_key(&lead.id) {
            return Err(Error::Conflict(format!("lead {} already exists", lead.id)));
        }
        let mut stored = lead.clone();
        stored.version = 1;
        leads.insert(stored.id, stored.clone());

        tracing::debug!(lead_id = %stored.id, practice_id = %stored.practice_id, "Lead stored");
        Ok(stored)
    }

    async fn update(&self, lead: &Lead) -> Result<Lead> {
        let mut leads = self.leads.write();
        let current = leads
            .get(&lead.id)
            .filter(|stored| stored.practice_id == lead.practice_id)
            .ok_or_else(|| Error::not_found("lead", lead.id))?;

        if current.version != lead.version {
            tracing::warn!(
                lead_id = %lead.id,
                expected = lead.version,
                actual = current.version,
                "Stale lead write rejected"
            );
            return Err(Error::Conflict(format!(
                "lead {} was modified concurrently",
                lead.id
            )));
        }

        let mut stored = lead.clone();
        stored.version += 1;
        leads.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn increment_counter(
        &self,
        practice_id: Uuid,
        lead_id: Uuid,
        counter: LeadCounter,
        by: u32,
        at: DateTime<Utc>,
    ) -> Result<Lead> {
        let mut leads = self.leads.write();
        let lead = leads
            .get_mut(&lead_id)
            .filter(|lead| lead.practice_id == practice_id)
            .ok_or_else(|| Error::not_found("lead", lead_id))?;

        let slot = match counter {
            LeadCounter::EmailsOpened => &mut lead.behavior.emails_opened,
            LeadCounter::LinksClicked => &mut lead.behavior.links_clicked,
            LeadCounter::RepliesReceived => &mut lead.behavior.replies_received,
        };
        *slot = slot.saturating_add(by);
        lead.version += 1;
        lead.updated_at = at;
        Ok(lead.clone())
    }

    async fn count_by_status(&self, practice_id: Uuid, status: LeadStatus) -> Result<usize> {
        Ok(self
            .leads
            .read()
            .values()
            .filter(|lead| lead.practice_id == practice_id && lead.status == status)
            .count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use practice_growth_core::{BehaviorCounters, ContactInfo, LeadSource};

    fn lead(practice_id: Uuid, email: &str) -> Lead {
        Lead::new(
            practice_id,
            LeadSource::Website,
            ContactInfo {
                first_name: "Sam".into(),
                email: Some(email.into()),
                ..Default::default()
            },
            BehaviorCounters::default(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_find_is_practice_scoped() {
        let repo = InMemoryLeadRepository::new();
        let practice = Uuid::new_v4();
        let stored = repo.insert(&lead(practice, "a@example.com")).await.unwrap();

        assert!(repo.find(practice, stored.id).await.unwrap().is_some());
        assert!(repo.find(Uuid::new_v4(), stored.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stale_update_conflicts() {
        let repo = InMemoryLeadRepository::new();
        let practice = Uuid::new_v4();
        let stored = repo.insert(&lead(practice, "a@example.com")).await.unwrap();

        let mut first = stored.clone();
        first.quality_score = 40;
        let updated = repo.update(&first).await.unwrap();
        assert_eq!(updated.version, stored.version + 1);

        let mut second = stored.clone();
        second.quality_score = 90;
        let err = repo.update(&second).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        let current = repo.find(practice, stored.id).await.unwrap().unwrap();
        assert_eq!(current.quality_score, 40);
    }

    #[tokio::test]
    async fn test_increment_counter_bumps_version() {
        let repo = InMemoryLeadRepository::new();
        let practice = Uuid::new_v4();
        let stored = repo.insert(&lead(practice, "a@example.com")).await.unwrap();

        let at = stored.created_at + Duration::days(3);

        repo.increment_counter(practice, stored.id, LeadCounter::EmailsOpened, 1, at)
            .await
            .unwrap();
        let after = repo
            .increment_counter(practice, stored.id, LeadCounter::EmailsOpened, 2, at)
            .await
            .unwrap();

        assert_eq!(after.behavior.emails_opened, 3);
        assert_eq!(after.version, stored.version + 2);
        assert_eq!(after.updated_at, at);
    }

    #[tokio::test]
    async fn test_contact_lookup_skips_terminal_leads() {
        let repo = InMemoryLeadRepository::new();
        let practice = Uuid::new_v4();
        let mut lost = lead(practice, "dup@example.com");
        lost.status = LeadStatus::Lost;
        repo.insert(&lost).await.unwrap();

        assert!(repo
            .find_active_by_contact(practice, Some("DUP@example.com"), None)
            .await
            .unwrap()
            .is_none());

        let active = repo.insert(&lead(practice, "dup@example.com")).await.unwrap();
        let found = repo
            .find_active_by_contact(practice, Some("dup@example.com"), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, active.id);
        assert_eq!(repo.count_by_status(practice, LeadStatus::Lost).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_missing_lead_is_not_found() {
        let repo = InMemoryLeadRepository::new();
        let err = repo
            .increment_counter(
                Uuid::new_v4(),
                Uuid::new_v4(),
                LeadCounter::LinksClicked,
                1,
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }
}
