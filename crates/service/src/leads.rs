//! Lead capture, scoring, conversion and assignment

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use uuid::Uuid;

use practice_growth_core::{
    BehaviorCounters, ContactInfo, Error, Lead, LeadSource, LeadStatus, NextAction, Result,
    ScoreSnapshot,
};
use practice_growth_engine::LifecycleEvent;

use crate::{require_live, telemetry, GrowthService};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureLeadRequest {
    /// Free-form channel name; unknown values score as `other`
    pub source: String,
    pub contact: ContactInfo,
    #[serde(default)]
    pub behavior: BehaviorCounters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureOutcome {
    pub lead: Lead,
    pub is_new: bool,
    /// An existing active lead absorbed the submission
    pub merged: bool,
    pub score: ScoreOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreOutcome {
    pub lead_id: Uuid,
    pub quality: u32,
    pub urgency: u32,
    pub conversion_probability: f64,
    pub factors: BTreeMap<String, u32>,
    pub signals: Vec<String>,
    pub status: LeadStatus,
    pub priority_rank: Option<u8>,
    pub next_action: NextAction,
    pub next_action_date: Option<DateTime<Utc>>,
    /// Scores came from the cache rather than a fresh computation
    pub cached: bool,
}

impl ScoreOutcome {
    fn from_lead(lead: &Lead, cached: bool) -> Self {
        Self {
            lead_id: lead.id,
            quality: lead.quality_score,
            urgency: lead.urgency_score,
            conversion_probability: lead.conversion_probability,
            factors: lead.score_factors.clone(),
            signals: lead.intent_signals.clone(),
            status: lead.status,
            priority_rank: lead.priority_rank,
            next_action: lead.next_action,
            next_action_date: lead.next_action_date,
            cached,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionOutcome {
    pub lead_id: Uuid,
    pub status: LeadStatus,
    pub converted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentOutcome {
    pub lead_id: Uuid,
    pub staff_id: Uuid,
    pub staff_name: String,
    pub match_score: f64,
    pub previous_staff_id: Option<Uuid>,
}

impl GrowthService {
    /// Create a lead or fold the submission into a matching active lead,
    /// then score it.
    pub async fn capture_lead(&self, request: CaptureLeadRequest) -> Result<CaptureOutcome> {
        let CaptureLeadRequest {
            source,
            contact,
            behavior,
        } = request;

        let contact = contact.normalized();
        if !contact.has_address() {
            return Err(Error::BadRequest(
                "lead requires an email or a phone number".to_string(),
            ));
        }

        let now = self.now();
        let source = LeadSource::parse(&source);
        let existing = self
            .store
            .leads
            .find_active_by_contact(
                self.practice_id(),
                contact.email.as_deref(),
                contact.phone.as_deref(),
            )
            .await?;

        let (mut lead, is_new) = match existing {
            Some(mut lead) => {
                lead.behavior.merge(&behavior);
                fill_missing_contact(&mut lead.contact, contact);
                tracing::info!(lead_id = %lead.id, source = source.as_str(), "Capture merged into existing lead");
                (lead, false)
            }
            None => {
                let lead = Lead::new(self.practice_id(), source, contact, behavior, now);
                let lead = self.store.leads.insert(&lead).await?;
                tracing::info!(lead_id = %lead.id, source = source.as_str(), "Lead captured");
                (lead, true)
            }
        };

        // New data always invalidates the cached scores
        let score = self.rescore(&mut lead, true, now);
        self.save_lead(&mut lead, now).await?;

        self.audit(
            "lead_captured",
            "lead",
            json!({
                "lead_id": lead.id,
                "source": lead.source.as_str(),
                "is_new": is_new,
                "status": lead.status.as_str(),
                "quality": lead.quality_score,
            }),
        )
        .await?;

        Ok(CaptureOutcome {
            score,
            lead,
            is_new,
            merged: !is_new,
        })
    }

    /// Score a lead, reusing scores younger than the cache TTL unless forced.
    ///
    /// The lifecycle is evaluated on every call, cached or not.
    pub async fn score_lead(&self, lead_id: Uuid, force: bool) -> Result<ScoreOutcome> {
        let now = self.now();
        let mut lead = self.load_lead(lead_id).await?;

        let before = (lead.status, lead.last_analyzed_at);
        let outcome = self.rescore(&mut lead, force, now);
        if (lead.status, lead.last_analyzed_at) != before {
            self.save_lead(&mut lead, now).await?;
        }

        if !outcome.cached {
            self.audit(
                "lead_scored",
                "lead",
                json!({
                    "lead_id": lead.id,
                    "quality": outcome.quality,
                    "urgency": outcome.urgency,
                    "conversion_probability": outcome.conversion_probability,
                    "status": outcome.status.as_str(),
                }),
            )
            .await?;
        }
        Ok(outcome)
    }

    /// Recompute (or reuse) scores and run the lifecycle on `lead` in place
    pub(crate) fn rescore(&self, lead: &mut Lead, force: bool, now: DateTime<Utc>) -> ScoreOutcome {
        let ttl = Duration::hours(self.engines.config().lifecycle.cache_ttl_hours);
        let fresh_cache = lead
            .last_analyzed_at
            .map_or(false, |at| now - at < ttl);
        let cached = fresh_cache && !force;
        let age_days = lead.days_since_created(now);

        if !cached {
            let score = self.engines.scorer.score(&lead.behavior, lead.source, age_days);
            lead.quality_score = score.quality;
            lead.urgency_score = score.urgency;
            lead.conversion_probability = score.conversion_probability;
            lead.score_factors = score.factors;
            lead.intent_signals = score.signals;
            lead.push_snapshot(
                ScoreSnapshot {
                    at: now,
                    quality: score.quality,
                    urgency: score.urgency,
                    conversion_probability: score.conversion_probability,
                },
                self.engines.config().lifecycle.score_history_cap,
            );
            lead.last_analyzed_at = Some(now);
            if lead.priority_rank.is_none() && !lead.is_terminal() {
                self.refresh_priority(lead, now);
            }
        }
        telemetry::record_lead_scored(cached);

        let scored = LifecycleEvent::Scored {
            quality: lead.quality_score,
            urgency: lead.urgency_score,
            conversion_probability: lead.conversion_probability,
            age_days,
        };
        self.apply_event(lead, scored, now);

        tracing::debug!(
            lead_id = %lead.id,
            quality = lead.quality_score,
            urgency = lead.urgency_score,
            status = %lead.status,
            cached,
            "Lead score evaluated"
        );

        ScoreOutcome::from_lead(lead, cached)
    }

    /// Mark a lead converted. Repeating the call is a no-op.
    pub async fn record_conversion(&self, lead_id: Uuid) -> Result<ConversionOutcome> {
        let now = self.now();
        let mut lead = self.load_lead(lead_id).await?;

        match lead.status {
            LeadStatus::Converted => {
                return Ok(ConversionOutcome {
                    lead_id,
                    status: lead.status,
                    converted_at: lead.converted_at,
                })
            }
            LeadStatus::Lost => {
                return Err(Error::BadRequest(format!(
                    "lead {} is LOST and cannot be converted",
                    lead_id
                )))
            }
            _ => {}
        }

        self.apply_event(&mut lead, LifecycleEvent::Converted, now);
        lead.converted_at = Some(now);
        self.save_lead(&mut lead, now).await?;

        tracing::info!(lead_id = %lead.id, "Lead converted");
        self.audit(
            "lead_converted",
            "lead",
            json!({ "lead_id": lead.id, "assigned_staff_id": lead.assigned_staff_id }),
        )
        .await?;

        Ok(ConversionOutcome {
            lead_id,
            status: lead.status,
            converted_at: lead.converted_at,
        })
    }

    /// Route a lead to the best-matching active staff member
    pub async fn assign_lead(&self, lead_id: Uuid, reassign: bool) -> Result<AssignmentOutcome> {
        let now = self.now();
        let mut lead = self.load_lead(lead_id).await?;
        require_live(&lead)?;

        let previous = lead.assigned_staff_id;
        if let (Some(current), false) = (previous, reassign) {
            return Err(Error::Conflict(format!(
                "lead {} is already assigned to {}",
                lead_id, current
            )));
        }

        let staff = self.store.staff.list_staff(self.practice_id()).await?;
        let best = self
            .engines
            .staff
            .rank(&staff, lead.quality_score)
            .into_iter()
            .find(|m| Some(m.staff_id) != previous)
            .ok_or_else(|| Error::not_found("staff member", "active"))?;

        lead.assigned_staff_id = Some(best.staff_id);
        self.save_lead(&mut lead, now).await?;

        self.store
            .staff
            .adjust_open_leads(self.practice_id(), best.staff_id, 1)
            .await?;
        if let Some(previous) = previous {
            // The previous assignee may have left the roster
            if let Err(e) = self
                .store
                .staff
                .adjust_open_leads(self.practice_id(), previous, -1)
                .await
            {
                tracing::warn!(
                    staff_id = %previous,
                    error = %e,
                    "Could not release previous assignee"
                );
            }
        }

        tracing::info!(
            lead_id = %lead.id,
            staff_id = %best.staff_id,
            match_score = best.score,
            reassigned = previous.is_some(),
            "Lead assigned"
        );
        self.audit(
            "lead_assigned",
            "lead",
            json!({
                "lead_id": lead.id,
                "staff_id": best.staff_id,
                "previous_staff_id": previous,
                "match_score": best.score,
            }),
        )
        .await?;

        Ok(AssignmentOutcome {
            lead_id,
            staff_id: best.staff_id,
            staff_name: best.name,
            match_score: best.score,
            previous_staff_id: previous,
        })
    }
}

fn fill_missing_contact(stored: &mut ContactInfo, incoming: ContactInfo) {
    if stored.first_name.trim().is_empty() {
        stored.first_name = incoming.first_name;
    }
    if stored.last_name.is_none() {
        stored.last_name = incoming.last_name;
    }
    if stored.email.as_deref().map_or(true, |e| e.trim().is_empty()) {
        stored.email = incoming.email;
    }
    if stored.phone.as_deref().map_or(true, |p| p.trim().is_empty()) {
        stored.phone = incoming.phone;
    }
}
