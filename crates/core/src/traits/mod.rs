//! Collaborator contracts consumed by the growth service
//!
//! Storage, delivery, audit and staff statistics are external concerns. The
//! service only sees these traits so backends can be swapped (in-memory for
//! tests and local runs, a real database in deployment).
//!
//! ```text
//! Storage:
//!   - LeadRepository: lead CRUD, contact dedup lookup, atomic counters
//!   - PatientRepository: read-only patient history
//!   - OpportunityRepository: referral / reactivation caches
//!   - ReputationRepository: append-only platform snapshots
//!
//! Side effects:
//!   - AuditSink: (action, entity_type, payload)
//!   - MessageSender: (channel, recipient, content, scheduled_at)
//!   - StaffDirectory: load and conversion statistics
//! ```

mod collaborators;
mod repository;

pub use collaborators::{AuditSink, MessageSender, StaffDirectory};
pub use repository::{LeadRepository, OpportunityRepository, PatientRepository, ReputationRepository};
