//! Application State
//!
//! Shared state across all handlers.

use std::sync::Arc;

use practice_growth_config::{GrowthConfig, Settings};
use practice_growth_persistence::PersistenceLayer;
use practice_growth_service::{Collaborators, GrowthService};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub service: GrowthService,
}

impl AppState {
    pub fn new(settings: Settings, service: GrowthService) -> Self {
        Self {
            settings: Arc::new(settings),
            service,
        }
    }

    /// State backed by the in-memory persistence layer
    pub fn in_memory(settings: Settings, growth: Arc<GrowthConfig>) -> Self {
        let persistence = PersistenceLayer::in_memory();
        let service = GrowthService::new(
            growth,
            settings.practice.clone(),
            collaborators(&persistence),
        );
        Self::new(settings, service)
    }
}

pub fn collaborators(persistence: &PersistenceLayer) -> Collaborators {
    Collaborators {
        leads: persistence.lead_repository(),
        patients: persistence.patient_repository(),
        opportunities: persistence.opportunity_repository(),
        reputation: persistence.reputation_repository(),
        sender: persistence.message_sender(),
        audit: persistence.audit_sink(),
        staff: persistence.staff_directory(),
    }
}
