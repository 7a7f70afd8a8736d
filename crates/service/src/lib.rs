//! Growth operations
//!
//! `GrowthService` ties the pure engines to storage, delivery and audit.
//! Every operation is a read-modify-write against the injected repositories:
//!
//! ```text
//! load entity ──▶ engines (pure) ──▶ lifecycle / priority ──▶ save ──▶ send ──▶ audit
//! ```
//!
//! All lookups are scoped to the configured practice; ids owned by another
//! practice surface as `NotFound`.

mod clock;
pub mod leads;
pub mod nurture;
pub mod reactivation;
pub mod referrals;
pub mod reputation;
pub mod responses;
mod telemetry;

pub use clock::{Clock, FixedClock, SystemClock};
pub use leads::{AssignmentOutcome, CaptureLeadRequest, CaptureOutcome, ConversionOutcome, ScoreOutcome};
pub use nurture::NurtureOutcome;
pub use reactivation::{
    LapseOutcome, OfferSummary, ReactivationCandidate, ReactivationCriteria,
    ReactivationOutcomeResult, ReactivationOutreachOutcome,
};
pub use referrals::{OutreachOutcome, ReferralCandidate, ReferralCriteria};
pub use reputation::SnapshotInput;
pub use responses::ResponseOutcome;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use practice_growth_config::{GrowthConfig, PracticeProfile};
use practice_growth_core::{
    AuditSink, Channel, ContactInfo, Error, Lead, LeadRepository, LeadStatus, MessageSender,
    OpportunityRepository, PatientRecord, PatientRepository, ReputationRepository, Result,
    StaffDirectory,
};
use practice_growth_engine::{GrowthEngines, LifecycleEvent, TemplateContext, Transition};

/// Injected storage and side-effect collaborators
#[derive(Clone)]
pub struct Collaborators {
    pub leads: Arc<dyn LeadRepository>,
    pub patients: Arc<dyn PatientRepository>,
    pub opportunities: Arc<dyn OpportunityRepository>,
    pub reputation: Arc<dyn ReputationRepository>,
    pub sender: Arc<dyn MessageSender>,
    pub audit: Arc<dyn AuditSink>,
    pub staff: Arc<dyn StaffDirectory>,
}

/// Growth operations for one practice
#[derive(Clone)]
pub struct GrowthService {
    practice: PracticeProfile,
    engines: GrowthEngines,
    store: Collaborators,
    clock: Arc<dyn Clock>,
}

impl GrowthService {
    pub fn new(config: Arc<GrowthConfig>, practice: PracticeProfile, store: Collaborators) -> Self {
        Self::with_clock(config, practice, store, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: Arc<GrowthConfig>,
        practice: PracticeProfile,
        store: Collaborators,
        clock: Arc<dyn Clock>,
    ) -> Self {
        tracing::info!(
            practice_id = %practice.id,
            practice = %practice.name,
            "Growth service initialized"
        );
        Self {
            practice,
            engines: GrowthEngines::new(config),
            store,
            clock,
        }
    }

    pub fn practice(&self) -> &PracticeProfile {
        &self.practice
    }

    pub fn engines(&self) -> &GrowthEngines {
        &self.engines
    }

    fn practice_id(&self) -> Uuid {
        self.practice.id
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    async fn load_lead(&self, lead_id: Uuid) -> Result<Lead> {
        self.store
            .leads
            .find(self.practice_id(), lead_id)
            .await?
            .ok_or_else(|| Error::not_found("lead", lead_id))
    }

    async fn load_patient(&self, patient_id: Uuid) -> Result<PatientRecord> {
        self.store
            .patients
            .find(self.practice_id(), patient_id)
            .await?
            .ok_or_else(|| Error::not_found("patient", patient_id))
    }

    async fn audit(&self, action: &str, entity_type: &str, payload: serde_json::Value) -> Result<()> {
        self.store.audit.record(action, entity_type, payload).await
    }

    fn template_context(&self, contact: &ContactInfo) -> TemplateContext {
        TemplateContext {
            first_name: contact.first_name.clone(),
            practice_name: self.practice.name.clone(),
            practice_phone: self.practice.phone.clone(),
            booking_link: self.practice.booking_link.clone(),
        }
    }

    /// Apply a lifecycle event to the lead in place.
    ///
    /// A status change also refreshes priority and next action; leaving the
    /// live statuses clears nurture state.
    fn apply_event(&self, lead: &mut Lead, event: LifecycleEvent, now: DateTime<Utc>) -> Transition {
        let transition = self.engines.lifecycle.apply(lead.status, event);
        if let Transition::Changed { to, .. } = transition {
            lead.status = to;
            telemetry::record_status_transition(to);
            if to.is_terminal() {
                lead.nurture = None;
            }
            self.refresh_priority(lead, now);
        }
        transition
    }

    fn refresh_priority(&self, lead: &mut Lead, now: DateTime<Utc>) {
        let plan = self.engines.lifecycle.priority(lead.status, now);
        lead.priority_rank = plan.rank;
        lead.next_action = plan.action;
        lead.next_action_date = plan.due_at;
    }

    async fn save_lead(&self, lead: &mut Lead, now: DateTime<Utc>) -> Result<()> {
        lead.updated_at = now;
        *lead = self.store.leads.update(lead).await?;
        Ok(())
    }

    /// Put a lead back to `before` after a rejected delivery. Failure to
    /// restore is logged; the delivery error is what the caller reports.
    async fn restore_lead(&self, lead: &mut Lead, before: Lead, now: DateTime<Utc>) {
        let mut restored = Lead {
            version: lead.version,
            ..before
        };
        match self.save_lead(&mut restored, now).await {
            Ok(()) => *lead = restored,
            Err(e) => tracing::error!(
                lead_id = %lead.id,
                error = %e,
                "Failed to restore lead after delivery error"
            ),
        }
    }
}

/// Route a message to an address the contact actually has.
///
/// Email-like channels fall back to SMS and vice versa; `None` when the
/// contact has neither address.
pub(crate) fn route(channel: Channel, contact: &ContactInfo) -> Option<(Channel, String)> {
    let email = contact.email.as_deref().filter(|e| !e.trim().is_empty());
    let phone = contact.phone.as_deref().filter(|p| !p.trim().is_empty());

    let preferred = match channel {
        Channel::Email | Channel::Video | Channel::Mail => email.map(|e| (channel, e)),
        Channel::Sms | Channel::Phone => phone.map(|p| (channel, p)),
    };
    preferred
        .or_else(|| email.map(|e| (Channel::Email, e)))
        .or_else(|| phone.map(|p| (Channel::Sms, p)))
        .map(|(channel, address)| (channel, address.to_string()))
}

pub(crate) fn require_live(lead: &Lead) -> Result<()> {
    if lead.is_terminal() {
        return Err(Error::BadRequest(format!(
            "lead {} is {} and can no longer change",
            lead.id,
            lead.status
        )));
    }
    Ok(())
}

pub(crate) fn is_escalated(status: LeadStatus) -> bool {
    matches!(status, LeadStatus::Hot | LeadStatus::Ready)
}
