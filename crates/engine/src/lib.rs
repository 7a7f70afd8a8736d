//! Decision engines for practice growth
//!
//! Pure, deterministic scoring and decision logic. Nothing here performs I/O
//! or reads the clock; callers pass `now` explicitly so results are
//! reproducible.
//!
//! - [`scoring`]: lead quality, urgency, conversion probability, intent signals
//! - [`lifecycle`]: lead status transitions and priority
//! - [`nurture`]: sequence selection, step progression, templating
//! - [`response`]: reply classification and engagement score
//! - [`referral`]: NPS inference, referral score, outreach window
//! - [`reactivation`]: lapse reason, reactivation score, approach and offer
//! - [`reputation`]: cross-platform reputation score, risk and trend
//! - [`staff`]: staff ranking for lead assignment

pub mod lifecycle;
pub mod nurture;
pub mod reactivation;
pub mod referral;
pub mod reputation;
pub mod response;
pub mod scoring;
pub mod staff;
pub mod timing;

pub use lifecycle::{LifecycleEvent, LifecycleMachine, PriorityPlan, Transition};
pub use nurture::{render_template, NurtureEngine, NurtureProgress, TemplateContext};
pub use reactivation::{LapseAnalysis, LapseInference, ReactivationEngine, ReactivationScore};
pub use referral::{NpsEstimate, ReferralEngine, ReferralScore};
pub use reputation::{
    PlatformScore, ReputationEngine, ReputationReport, ReputationTrend, RiskLevel, TrendDirection,
};
pub use response::{
    ReplyAnalysis, ResponseAnalyzer, ResponseDecision, ResponseType, Sentiment, SuggestedAction,
    UrgencyLevel,
};
pub use scoring::{LeadScore, LeadScorer};
pub use staff::{StaffMatch, StaffMatcher};

use practice_growth_config::GrowthConfig;
use std::sync::Arc;

/// Every engine built over one shared configuration
#[derive(Debug, Clone)]
pub struct GrowthEngines {
    pub scorer: LeadScorer,
    pub lifecycle: LifecycleMachine,
    pub nurture: NurtureEngine,
    pub response: ResponseAnalyzer,
    pub referral: ReferralEngine,
    pub reactivation: ReactivationEngine,
    pub reputation: ReputationEngine,
    pub staff: StaffMatcher,
    config: Arc<GrowthConfig>,
}

impl GrowthEngines {
    pub fn new(config: Arc<GrowthConfig>) -> Self {
        Self {
            scorer: LeadScorer::new(config.clone()),
            lifecycle: LifecycleMachine::new(config.clone()),
            nurture: NurtureEngine::new(config.clone()),
            response: ResponseAnalyzer::new(config.clone()),
            referral: ReferralEngine::new(config.clone()),
            reactivation: ReactivationEngine::new(config.clone()),
            reputation: ReputationEngine::new(config.clone()),
            staff: StaffMatcher::new(config.clone()),
            config,
        }
    }

    pub fn config(&self) -> &GrowthConfig {
        &self.config
    }
}
