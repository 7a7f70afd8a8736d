//! Nurture enrollment, step delivery, pause and resume

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use practice_growth_core::{
    Channel, Error, Lead, LeadStatus, MessageKind, NurtureState, OutboundMessage, Result,
    SequenceType,
};
use practice_growth_engine::{render_template, LifecycleEvent, NurtureProgress};

use crate::{require_live, route, telemetry, GrowthService};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NurtureOutcome {
    pub lead_id: Uuid,
    pub sequence: SequenceType,
    /// Last step sent; `None` once the sequence has finished
    pub current_step: Option<u32>,
    pub step_count: u32,
    /// When the step just sent (or the next one, after a resume) goes out
    pub scheduled_at: Option<DateTime<Utc>>,
    pub channel: Option<Channel>,
    pub message_id: Option<Uuid>,
    pub completed: bool,
    pub paused: bool,
    pub status: LeadStatus,
}

impl GrowthService {
    /// Enroll a lead and send step 1, or send the next step when already
    /// enrolled.
    ///
    /// Running out of steps is not an error: the outcome reports `completed`
    /// and the lead moves to HOT or WARM.
    pub async fn nurture_lead(
        &self,
        lead_id: Uuid,
        sequence: Option<SequenceType>,
    ) -> Result<NurtureOutcome> {
        let now = self.now();
        let mut lead = self.load_lead(lead_id).await?;
        require_live(&lead)?;
        let before = lead.clone();

        let enrolled = match lead.nurture.as_ref().map(|state| state.sequence) {
            Some(current) => {
                if let Some(requested) = sequence.filter(|s| *s != current) {
                    return Err(Error::BadRequest(format!(
                        "lead {} is already in the {} sequence, not {}",
                        lead_id,
                        current.as_str(),
                        requested.as_str()
                    )));
                }
                self.require_advanceable(&lead)?;
                false
            }
            None => {
                let sequence = sequence.unwrap_or_else(|| self.pick_sequence(&lead, now));
                lead.nurture = Some(self.engines.nurture.enroll(sequence, now));
                self.apply_event(&mut lead, LifecycleEvent::NurtureStarted, now);
                true
            }
        };

        self.send_next_step(&mut lead, before, None, enrolled, now).await
    }

    /// Send the next step, or jump ahead to `skip_to`
    pub async fn advance_nurture_step(
        &self,
        lead_id: Uuid,
        skip_to: Option<u32>,
    ) -> Result<NurtureOutcome> {
        let now = self.now();
        let mut lead = self.load_lead(lead_id).await?;
        require_live(&lead)?;
        self.require_advanceable(&lead)?;
        let before = lead.clone();

        self.send_next_step(&mut lead, before, skip_to, false, now).await
    }

    pub async fn pause_nurture(&self, lead_id: Uuid) -> Result<NurtureOutcome> {
        let now = self.now();
        let mut lead = self.load_lead(lead_id).await?;
        require_live(&lead)?;

        let state = active_state(&lead)?;
        if state.is_paused() {
            return Err(Error::BadRequest(format!(
                "nurture for lead {} is already paused",
                lead_id
            )));
        }

        let paused = self.engines.nurture.pause(state, now);
        lead.nurture = Some(paused.clone());
        self.save_lead(&mut lead, now).await?;

        tracing::info!(lead_id = %lead.id, step = paused.step_number, "Nurture paused");
        self.audit(
            "nurture_paused",
            "lead",
            json!({ "lead_id": lead.id, "step_number": paused.step_number }),
        )
        .await?;

        Ok(self.outcome(&lead, &paused, None))
    }

    /// Clear a pause. With `restart` the sequence starts again from step 1.
    ///
    /// Nothing is sent here; the outcome carries the projected slot of the
    /// next step.
    pub async fn resume_nurture(&self, lead_id: Uuid, restart: bool) -> Result<NurtureOutcome> {
        let now = self.now();
        let mut lead = self.load_lead(lead_id).await?;
        require_live(&lead)?;

        let state = active_state(&lead)?;
        if !state.is_paused() {
            return Err(Error::BadRequest(format!(
                "nurture for lead {} is not paused",
                lead_id
            )));
        }

        let resumed = self.engines.nurture.resume(state, restart, now);
        lead.nurture = Some(resumed.clone());
        if lead.status != LeadStatus::Nurturing {
            self.apply_event(&mut lead, LifecycleEvent::NurtureStarted, now);
        }
        self.save_lead(&mut lead, now).await?;

        let scheduled_at = match self.engines.nurture.next_step(&resumed, None)? {
            NurtureProgress::Send(step) => {
                Some(self.engines.nurture.schedule(step, lead.behavior.links_clicked, now))
            }
            NurtureProgress::Completed => None,
        };

        tracing::info!(
            lead_id = %lead.id,
            restart,
            step = resumed.step_number,
            "Nurture resumed"
        );
        self.audit(
            "nurture_resumed",
            "lead",
            json!({ "lead_id": lead.id, "restart": restart, "step_number": resumed.step_number }),
        )
        .await?;

        Ok(NurtureOutcome {
            scheduled_at,
            ..self.outcome(&lead, &resumed, None)
        })
    }

    fn pick_sequence(&self, lead: &Lead, now: DateTime<Utc>) -> SequenceType {
        let engagement = self.engines.response.engagement_score(
            lead.behavior.emails_opened,
            lead.behavior.links_clicked,
            lead.behavior.replies_received,
            None,
        );
        self.engines.nurture.select_sequence(
            lead.quality_score,
            lead.urgency_score,
            lead.conversion_probability,
            lead.days_since_created(now),
            engagement,
        )
    }

    fn require_advanceable(&self, lead: &Lead) -> Result<()> {
        let state = active_state(lead)?;
        if lead.status != LeadStatus::Nurturing {
            return Err(Error::BadRequest(format!(
                "lead {} is {}, not NURTURING",
                lead.id, lead.status
            )));
        }
        if state.is_paused() {
            return Err(Error::BadRequest(format!(
                "nurture for lead {} is paused",
                lead.id
            )));
        }
        Ok(())
    }

    /// Deliver the next step of the lead's sequence.
    ///
    /// The step is recorded on the lead before the message goes out, so a
    /// stale write never produces a delivery. A rejected delivery puts the
    /// lead back to `before`. Audit entries are written only once the
    /// message was accepted.
    async fn send_next_step(
        &self,
        lead: &mut Lead,
        before: Lead,
        skip_to: Option<u32>,
        enrolled: bool,
        now: DateTime<Utc>,
    ) -> Result<NurtureOutcome> {
        let state = active_state(lead)?.clone();

        let step = match self.engines.nurture.next_step(&state, skip_to)? {
            NurtureProgress::Send(step) => step.clone(),
            NurtureProgress::Completed => return self.complete_sequence(lead, state, now).await,
        };

        let (channel, recipient) = route(step.channel, &lead.contact).ok_or_else(|| {
            Error::BadRequest(format!("lead {} has no contact address", lead.id))
        })?;
        let context = self.template_context(&lead.contact);
        let scheduled_at = self
            .engines
            .nurture
            .schedule(&step, lead.behavior.links_clicked, now);
        let message = OutboundMessage {
            kind: MessageKind::Nurture,
            channel,
            recipient,
            subject: step.subject.as_deref().map(|s| render_template(s, &context)),
            body: render_template(&step.template, &context),
            scheduled_at,
            entity_id: lead.id,
        };

        let sent = self.engines.nurture.mark_sent(&state, &step);
        lead.nurture = Some(sent.clone());
        self.save_lead(lead, now).await?;

        let receipt = match self.store.sender.send(&message).await {
            Ok(receipt) => receipt,
            Err(e) => {
                self.restore_lead(lead, before, now).await;
                return Err(e);
            }
        };
        telemetry::record_nurture_message(channel);

        if enrolled {
            tracing::info!(
                lead_id = %lead.id,
                sequence = sent.sequence.as_str(),
                "Lead enrolled in nurture sequence"
            );
            self.audit(
                "nurture_started",
                "lead",
                json!({ "lead_id": lead.id, "sequence": sent.sequence.as_str() }),
            )
            .await?;
        }

        tracing::info!(
            lead_id = %lead.id,
            sequence = sent.sequence.as_str(),
            step = sent.step_number,
            channel = channel.as_str(),
            scheduled_at = %scheduled_at,
            "Nurture step scheduled"
        );
        self.audit(
            "nurture_step_sent",
            "lead",
            json!({
                "lead_id": lead.id,
                "sequence": sent.sequence.as_str(),
                "step_number": sent.step_number,
                "channel": channel.as_str(),
                "message_id": receipt.message_id,
                "scheduled_at": scheduled_at,
            }),
        )
        .await?;

        Ok(NurtureOutcome {
            scheduled_at: Some(receipt.scheduled_at),
            channel: Some(channel),
            message_id: Some(receipt.message_id),
            ..self.outcome(lead, &sent, None)
        })
    }

    async fn complete_sequence(
        &self,
        lead: &mut Lead,
        state: NurtureState,
        now: DateTime<Utc>,
    ) -> Result<NurtureOutcome> {
        lead.nurture = None;
        let quality = lead.quality_score;
        self.apply_event(lead, LifecycleEvent::NurtureCompleted { quality }, now);
        self.save_lead(lead, now).await?;

        tracing::info!(
            lead_id = %lead.id,
            sequence = state.sequence.as_str(),
            status = %lead.status,
            "Nurture sequence completed"
        );
        self.audit(
            "nurture_completed",
            "lead",
            json!({
                "lead_id": lead.id,
                "sequence": state.sequence.as_str(),
                "status": lead.status.as_str(),
            }),
        )
        .await?;

        Ok(NurtureOutcome {
            current_step: None,
            completed: true,
            paused: false,
            ..self.outcome(lead, &state, None)
        })
    }

    fn outcome(
        &self,
        lead: &Lead,
        state: &NurtureState,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> NurtureOutcome {
        NurtureOutcome {
            lead_id: lead.id,
            sequence: state.sequence,
            current_step: Some(state.step_number),
            step_count: self.engines.nurture.step_count(state.sequence),
            scheduled_at,
            channel: None,
            message_id: None,
            completed: false,
            paused: state.is_paused(),
            status: lead.status,
        }
    }
}

fn active_state(lead: &Lead) -> Result<&NurtureState> {
    lead.nurture.as_ref().ok_or_else(|| {
        Error::BadRequest(format!("lead {} is not enrolled in a nurture sequence", lead.id))
    })
}
