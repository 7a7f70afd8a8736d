//! Storage and delivery backends for the practice growth engine
//!
//! Provides in-process implementations of every collaborator trait in
//! `practice_growth_core::traits`:
//! - Leads (versioned writes, contact dedup, atomic counters)
//! - Patient history (seeded by the host)
//! - Referral / reactivation opportunity records
//! - Reputation snapshots (append-only)
//! - Outbound messages (simulated, kept for inspection)
//! - Audit log
//! - Staff directory
//!
//! Everything is held behind `parking_lot` locks, so a single
//! `PersistenceLayer` can be shared across request handlers.

pub mod audit;
pub mod leads;
pub mod messages;
pub mod opportunities;
pub mod patients;
pub mod reputation;
pub mod staff;

use std::sync::Arc;

use practice_growth_core::{
    AuditSink, LeadRepository, MessageSender, OpportunityRepository, PatientRepository,
    ReputationRepository, StaffDirectory,
};

pub use audit::{AuditEntry, InMemoryAuditLog};
pub use leads::InMemoryLeadRepository;
pub use messages::{SentMessage, SimulatedMessageSender};
pub use opportunities::InMemoryOpportunityRepository;
pub use patients::InMemoryPatientRepository;
pub use reputation::InMemoryReputationRepository;
pub use staff::StaticStaffDirectory;

/// Combined persistence layer with all collaborators.
///
/// Concrete handles are kept so hosts can seed patients and staff or inspect
/// sent messages; `as_*` accessors hand out the trait objects the service
/// consumes.
#[derive(Clone, Default)]
pub struct PersistenceLayer {
    pub leads: Arc<InMemoryLeadRepository>,
    pub patients: Arc<InMemoryPatientRepository>,
    pub opportunities: Arc<InMemoryOpportunityRepository>,
    pub reputation: Arc<InMemoryReputationRepository>,
    pub messages: Arc<SimulatedMessageSender>,
    pub audit: Arc<InMemoryAuditLog>,
    pub staff: Arc<StaticStaffDirectory>,
}

impl PersistenceLayer {
    pub fn in_memory() -> Self {
        tracing::info!("Initializing in-memory persistence layer");
        Self::default()
    }

    pub fn lead_repository(&self) -> Arc<dyn LeadRepository> {
        self.leads.clone()
    }

    pub fn patient_repository(&self) -> Arc<dyn PatientRepository> {
        self.patients.clone()
    }

    pub fn opportunity_repository(&self) -> Arc<dyn OpportunityRepository> {
        self.opportunities.clone()
    }

    pub fn reputation_repository(&self) -> Arc<dyn ReputationRepository> {
        self.reputation.clone()
    }

    pub fn message_sender(&self) -> Arc<dyn MessageSender> {
        self.messages.clone()
    }

    pub fn audit_sink(&self) -> Arc<dyn AuditSink> {
        self.audit.clone()
    }

    pub fn staff_directory(&self) -> Arc<dyn StaffDirectory> {
        self.staff.clone()
    }
}
