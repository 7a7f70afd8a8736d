//! Lapse analysis and the reactivation outreach lifecycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use uuid::Uuid;

use practice_growth_config::OfferDefinition;
use practice_growth_core::{
    Channel, Error, LapseReason, MessageKind, OutreachApproach, PatientRecord,
    ReactivationOpportunity, ReactivationStatus, Result,
};
use practice_growth_engine::LapseAnalysis;

use crate::{telemetry, GrowthService};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferSummary {
    pub id: String,
    pub name: String,
    pub description: String,
}

impl From<&OfferDefinition> for OfferSummary {
    fn from(offer: &OfferDefinition) -> Self {
        Self {
            id: offer.id.clone(),
            name: offer.name.clone(),
            description: offer.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapseOutcome {
    pub patient_id: Uuid,
    pub days_lapsed: u32,
    pub likely_reason: LapseReason,
    pub confidence: f64,
    pub factors: Vec<String>,
    pub reactivation_score: u32,
    pub score_adjustments: BTreeMap<String, i32>,
    pub suggested_approach: OutreachApproach,
    pub suggested_channel: Channel,
    pub suggested_offer: Option<OfferSummary>,
    pub optimal_timing: DateTime<Utc>,
    pub status: ReactivationStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReactivationCriteria {
    #[serde(default)]
    pub min_days_lapsed: Option<u32>,
    #[serde(default)]
    pub min_score: Option<u32>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactivationCandidate {
    pub patient_id: Uuid,
    pub first_name: String,
    pub days_lapsed: u32,
    pub lifetime_value: f64,
    pub likely_reason: LapseReason,
    pub confidence: f64,
    pub reactivation_score: u32,
    pub suggested_approach: OutreachApproach,
    pub suggested_offer_id: Option<String>,
    pub outreach_attempts: u32,
    pub status: ReactivationStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactivationOutreachOutcome {
    pub patient_id: Uuid,
    pub message_id: Uuid,
    pub channel: Channel,
    pub offer: Option<OfferSummary>,
    pub scheduled_at: DateTime<Utc>,
    pub outreach_attempts: u32,
    pub status: ReactivationStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactivationOutcomeResult {
    pub patient_id: Uuid,
    pub previous_status: ReactivationStatus,
    pub status: ReactivationStatus,
}

impl GrowthService {
    /// Infer why a patient lapsed and how to bring them back
    pub async fn analyze_lapse(&self, patient_id: Uuid) -> Result<LapseOutcome> {
        let now = self.now();
        let patient = self.load_patient(patient_id).await?;
        let (analysis, opportunity) = self.refresh_reactivation(&patient, now).await?;

        tracing::info!(
            patient_id = %patient_id,
            reason = analysis.inference.reason.as_str(),
            confidence = analysis.inference.confidence,
            score = analysis.score.score,
            "Lapse analyzed"
        );

        Ok(LapseOutcome {
            patient_id,
            days_lapsed: analysis.days_lapsed,
            likely_reason: analysis.inference.reason,
            confidence: analysis.inference.confidence,
            factors: analysis.inference.factors,
            reactivation_score: analysis.score.score,
            score_adjustments: analysis.score.adjustments,
            suggested_approach: analysis.approach,
            suggested_channel: analysis.channel,
            suggested_offer: analysis.offer.as_ref().map(OfferSummary::from),
            optimal_timing: analysis.optimal_timing,
            status: opportunity.status,
        })
    }

    /// Lapsed patients worth contacting, most likely to return first.
    ///
    /// Patients without a recorded visit and closed opportunities are skipped.
    pub async fn identify_reactivation_candidates(
        &self,
        criteria: ReactivationCriteria,
    ) -> Result<Vec<ReactivationCandidate>> {
        let now = self.now();
        let min_days = criteria
            .min_days_lapsed
            .unwrap_or(self.engines.config().reactivation.default_min_days_lapsed);
        let min_score = criteria.min_score.unwrap_or(0);

        let patients = self.store.patients.list(self.practice_id()).await?;
        let mut candidates = Vec::new();
        for patient in &patients {
            match patient.visits.days_since_last_visit(now) {
                Some(days) if days >= min_days => {}
                _ => continue,
            }

            let (analysis, opportunity) = self.refresh_reactivation(patient, now).await?;
            if opportunity.status.is_terminal() || analysis.score.score < min_score {
                continue;
            }
            candidates.push(ReactivationCandidate {
                patient_id: patient.id,
                first_name: patient.contact.first_name.clone(),
                days_lapsed: analysis.days_lapsed,
                lifetime_value: patient.visits.lifetime_value,
                likely_reason: analysis.inference.reason,
                confidence: analysis.inference.confidence,
                reactivation_score: analysis.score.score,
                suggested_approach: analysis.approach,
                suggested_offer_id: analysis.offer.map(|o| o.id),
                outreach_attempts: opportunity.outreach_attempts,
                status: opportunity.status,
            });
        }

        candidates.sort_by(|a, b| b.reactivation_score.cmp(&a.reactivation_score));
        if let Some(limit) = criteria.limit {
            candidates.truncate(limit);
        }

        tracing::info!(
            patients = patients.len(),
            candidates = candidates.len(),
            min_days,
            "Reactivation candidates identified"
        );
        Ok(candidates)
    }

    /// Contact a lapsed patient with the recommended (or a chosen) offer.
    ///
    /// A chosen offer must apply to the inferred reason and elapsed days.
    pub async fn send_reactivation_outreach(
        &self,
        patient_id: Uuid,
        offer_id: Option<&str>,
    ) -> Result<ReactivationOutreachOutcome> {
        let now = self.now();
        let patient = self.load_patient(patient_id).await?;
        let (analysis, mut opportunity) = self.refresh_reactivation(&patient, now).await?;

        if opportunity.status.is_terminal() {
            return Err(Error::BadRequest(format!(
                "reactivation for patient {} is closed ({})",
                patient_id,
                opportunity.status.as_str()
            )));
        }

        let offer = match offer_id {
            Some(id) => Some(
                self.engines
                    .reactivation
                    .applicable_offers(analysis.inference.reason, analysis.days_lapsed)
                    .into_iter()
                    .find(|offer| offer.id == id)
                    .cloned()
                    .ok_or_else(|| {
                        Error::BadRequest(format!(
                            "offer {} does not apply to a {} lapse of {} days",
                            id,
                            analysis.inference.reason.as_str(),
                            analysis.days_lapsed
                        ))
                    })?,
            ),
            None => analysis.offer.clone(),
        };

        let body = match &offer {
            Some(offer) => format!(
                "Hi {}, it has been a while since we saw you at {}. {}: {} Call {} or book at {}.",
                patient.contact.first_name,
                self.practice.name,
                offer.name,
                offer.description,
                self.practice.phone,
                self.practice.booking_link
            ),
            None => format!(
                "Hi {}, it has been a while since we saw you at {}. We would love to help you \
                 again. Call {} or book at {}.",
                patient.contact.first_name,
                self.practice.name,
                self.practice.phone,
                self.practice.booking_link
            ),
        };
        let message = self.patient_message(
            analysis.channel,
            &patient,
            MessageKind::Reactivation,
            Some(format!("We miss you at {}", self.practice.name)),
            body,
            analysis.optimal_timing,
        )?;

        // Record the attempt before delivery; a rejected send restores it
        let previous = opportunity.clone();
        if opportunity.status == ReactivationStatus::Identified {
            opportunity.status = ReactivationStatus::Contacted;
        }
        opportunity.recommended_offer_id = offer.as_ref().map(|o| o.id.clone());
        opportunity.last_contacted_at = Some(now);
        opportunity.updated_at = now;
        self.store.opportunities.save_reactivation(&opportunity).await?;
        let opportunity = self
            .store
            .opportunities
            .increment_reactivation_attempts(self.practice_id(), patient_id, now)
            .await?;

        let receipt = match self.store.sender.send(&message).await {
            Ok(receipt) => receipt,
            Err(e) => {
                if let Err(restore) = self.store.opportunities.save_reactivation(&previous).await {
                    tracing::error!(
                        patient_id = %patient_id,
                        error = %restore,
                        "Failed to restore reactivation record after delivery error"
                    );
                }
                return Err(e);
            }
        };
        let (message_id, channel) = (receipt.message_id, message.channel);
        telemetry::record_outreach("reactivation");

        tracing::info!(
            patient_id = %patient_id,
            message_id = %message_id,
            channel = channel.as_str(),
            attempts = opportunity.outreach_attempts,
            "Reactivation outreach sent"
        );
        self.audit(
            "reactivation_outreach_sent",
            "reactivation_opportunity",
            json!({
                "patient_id": patient_id,
                "message_id": message_id,
                "channel": channel.as_str(),
                "offer_id": opportunity.recommended_offer_id,
                "attempt": opportunity.outreach_attempts,
            }),
        )
        .await?;

        Ok(ReactivationOutreachOutcome {
            patient_id,
            message_id,
            channel,
            offer: offer.as_ref().map(OfferSummary::from),
            scheduled_at: analysis.optimal_timing,
            outreach_attempts: opportunity.outreach_attempts,
            status: opportunity.status,
        })
    }

    /// Move a reactivation record along its lifecycle
    pub async fn record_reactivation_outcome(
        &self,
        patient_id: Uuid,
        status: ReactivationStatus,
    ) -> Result<ReactivationOutcomeResult> {
        let now = self.now();
        let mut opportunity = self
            .store
            .opportunities
            .find_reactivation(self.practice_id(), patient_id)
            .await?
            .ok_or_else(|| Error::not_found("reactivation opportunity", patient_id))?;

        let previous = opportunity.status;
        if !previous.can_transition_to(status) {
            return Err(Error::BadRequest(format!(
                "reactivation cannot move from {} to {}",
                previous.as_str(),
                status.as_str()
            )));
        }

        opportunity.status = status;
        opportunity.updated_at = now;
        self.store.opportunities.save_reactivation(&opportunity).await?;

        tracing::info!(
            patient_id = %patient_id,
            from = previous.as_str(),
            to = status.as_str(),
            "Reactivation status changed"
        );
        self.audit(
            "reactivation_outcome_recorded",
            "reactivation_opportunity",
            json!({
                "patient_id": patient_id,
                "from": previous.as_str(),
                "to": status.as_str(),
            }),
        )
        .await?;

        Ok(ReactivationOutcomeResult {
            patient_id,
            previous_status: previous,
            status,
        })
    }

    /// Re-run the analysis and store it on the patient's record, keeping
    /// outreach history and status
    async fn refresh_reactivation(
        &self,
        patient: &PatientRecord,
        now: DateTime<Utc>,
    ) -> Result<(LapseAnalysis, ReactivationOpportunity)> {
        let analysis = self.engines.reactivation.analyze(patient, now);
        let existing = self
            .store
            .opportunities
            .find_reactivation(self.practice_id(), patient.id)
            .await?;

        let opportunity = ReactivationOpportunity {
            id: existing.as_ref().map_or_else(Uuid::new_v4, |o| o.id),
            practice_id: self.practice_id(),
            patient_id: patient.id,
            last_visit_at: patient.visits.last_visit_at,
            days_lapsed: analysis.days_lapsed,
            lifetime_value: patient.visits.lifetime_value,
            likely_reason: analysis.inference.reason,
            reason_confidence: analysis.inference.confidence,
            reason_factors: analysis.inference.factors.clone(),
            reactivation_score: analysis.score.score,
            recommended_approach: analysis.approach,
            recommended_offer_id: analysis.offer.as_ref().map(|o| o.id.clone()),
            recommended_channel: analysis.channel,
            outreach_attempts: existing.as_ref().map_or(0, |o| o.outreach_attempts),
            last_contacted_at: existing.as_ref().and_then(|o| o.last_contacted_at),
            status: existing
                .as_ref()
                .map_or(ReactivationStatus::Identified, |o| o.status),
            analyzed_at: now,
            created_at: existing.as_ref().map_or(now, |o| o.created_at),
            updated_at: now,
        };
        self.store.opportunities.save_reactivation(&opportunity).await?;
        Ok((analysis, opportunity))
    }
}
