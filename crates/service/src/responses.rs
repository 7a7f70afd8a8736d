//! Inbound interactions: opens, clicks, replies, booking requests, unsubscribes

use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use practice_growth_core::{LeadCounter, LeadStatus, Result};
use practice_growth_engine::{
    LifecycleEvent, ResponseType, Sentiment, SuggestedAction, UrgencyLevel,
};

use crate::{is_escalated, telemetry, GrowthService};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseOutcome {
    pub lead_id: Uuid,
    pub response_type: ResponseType,
    pub sentiment: Sentiment,
    pub urgency: UrgencyLevel,
    pub escalate: bool,
    pub suggested_action: SuggestedAction,
    pub engagement_score: u32,
    pub status: LeadStatus,
}

impl GrowthService {
    /// Record an interaction and act on it.
    ///
    /// Replies and booking requests bypass the scoring cache. A positive or
    /// urgent reply forces HOT, a booking request forces READY; either pauses
    /// any running nurture so staff can take over. Unsubscribing loses the
    /// lead for good.
    pub async fn handle_response(
        &self,
        lead_id: Uuid,
        response_type: ResponseType,
        content: Option<&str>,
    ) -> Result<ResponseOutcome> {
        let now = self.now();
        // Existence and tenancy check before touching counters
        let lead = self.load_lead(lead_id).await?;

        let counter = match response_type {
            ResponseType::Open => Some(LeadCounter::EmailsOpened),
            ResponseType::Click => Some(LeadCounter::LinksClicked),
            ResponseType::Reply => Some(LeadCounter::RepliesReceived),
            ResponseType::AppointmentRequest | ResponseType::Unsubscribe => None,
        };
        let mut lead = match counter {
            Some(counter) if !lead.is_terminal() => {
                self.store
                    .leads
                    .increment_counter(self.practice_id(), lead_id, counter, 1, now)
                    .await?
            }
            _ => lead,
        };

        let decision = self.engines.response.decide(response_type, content);
        let status_before = lead.status;

        if decision.escalate && !lead.is_terminal() {
            self.rescore(&mut lead, true, now);
        }

        let event = match response_type {
            ResponseType::Unsubscribe => Some(LifecycleEvent::Unsubscribed),
            ResponseType::AppointmentRequest => Some(LifecycleEvent::AppointmentRequested),
            ResponseType::Reply if decision.force_hot => Some(LifecycleEvent::Escalated),
            _ => None,
        };
        if let Some(event) = event {
            self.apply_event(&mut lead, event, now);
        }

        if is_escalated(lead.status) {
            if let Some(state) = lead.nurture.as_ref().filter(|s| !s.is_paused()) {
                lead.nurture = Some(self.engines.nurture.pause(state, now));
                tracing::info!(lead_id = %lead.id, "Nurture paused after escalation");
            }
        }

        let changed = decision.escalate || event.is_some();
        if changed && (!lead.is_terminal() || lead.status != status_before) {
            self.save_lead(&mut lead, now).await?;
        }

        let engagement_score = self.engines.response.engagement_score(
            lead.behavior.emails_opened,
            lead.behavior.links_clicked,
            lead.behavior.replies_received,
            lead.nurture.as_ref().map(|s| s.step_number),
        );
        telemetry::record_response(decision.analysis.sentiment.as_str());

        tracing::info!(
            lead_id = %lead.id,
            response_type = response_type.as_str(),
            sentiment = decision.analysis.sentiment.as_str(),
            escalate = decision.escalate,
            status = %lead.status,
            "Response handled"
        );
        self.audit(
            "response_handled",
            "lead",
            json!({
                "lead_id": lead.id,
                "response_type": response_type.as_str(),
                "sentiment": decision.analysis.sentiment.as_str(),
                "urgency": decision.analysis.urgency.as_str(),
                "escalate": decision.escalate,
                "status": lead.status.as_str(),
            }),
        )
        .await?;

        Ok(ResponseOutcome {
            lead_id,
            response_type,
            sentiment: decision.analysis.sentiment,
            urgency: decision.analysis.urgency,
            escalate: decision.escalate,
            suggested_action: decision.suggested_action,
            engagement_score,
            status: lead.status,
        })
    }
}
