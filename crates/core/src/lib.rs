//! Core types for the practice growth engine
//!
//! This crate provides the foundational types used across all other crates:
//! - Entities: leads, patient history, referral/reactivation opportunities,
//!   reputation snapshots, staff statistics
//! - Error taxonomy (not found / conflict / bad request)
//! - Collaborator traits for storage, delivery, audit and staff directory

pub mod error;
pub mod lead;
pub mod messaging;
pub mod opportunity;
pub mod patient;
pub mod reputation;
pub mod staff;
pub mod traits;

pub use error::{Error, ErrorKind, Result};
pub use lead::{
    BehaviorCounters, ContactInfo, Lead, LeadCounter, LeadSource, LeadStatus, NextAction,
    NurtureState, ScoreSnapshot, SequenceType,
};
pub use messaging::{Channel, MessageKind, MessageReceipt, OutboundMessage};
pub use opportunity::{
    LapseReason, NpsCategory, OutreachApproach, ReactivationOpportunity, ReactivationStatus,
    ReferralOpportunity,
};
pub use patient::{EngagementHistory, LapseEvidence, PatientRecord, PatientReview, VisitHistory};
pub use reputation::{RatingBreakdown, ReputationMetric, ReviewPlatform};
pub use staff::StaffMember;

// Trait re-exports
pub use traits::{
    AuditSink, LeadRepository, MessageSender, OpportunityRepository, PatientRepository,
    ReputationRepository, StaffDirectory,
};
