//! Referral candidates, referral asks and review requests

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use uuid::Uuid;

use practice_growth_core::{
    Channel, Error, MessageKind, NpsCategory, OutboundMessage, PatientRecord,
    ReferralOpportunity, Result, ReviewPlatform,
};

use crate::{route, telemetry, GrowthService};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferralCriteria {
    #[serde(default)]
    pub min_referral_score: Option<u32>,
    #[serde(default)]
    pub min_nps: Option<u8>,
    /// Skip patients whose last ask is still inside the cooldown
    #[serde(default)]
    pub exclude_in_cooldown: bool,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferralCandidate {
    pub patient_id: Uuid,
    pub first_name: String,
    pub nps_score: u8,
    pub nps_category: NpsCategory,
    pub nps_inferred: bool,
    pub referral_score: u32,
    pub score_factors: BTreeMap<String, u32>,
    pub optimal_outreach_at: Option<DateTime<Utc>>,
    pub in_cooldown: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutreachOutcome {
    pub patient_id: Uuid,
    pub message_id: Uuid,
    pub channel: Channel,
    pub scheduled_at: DateTime<Utc>,
}

impl GrowthService {
    /// Rank patients by referral propensity.
    ///
    /// Every patient's referral record is recomputed in place; only those
    /// clearing the thresholds are returned, best first.
    pub async fn identify_referrers(
        &self,
        criteria: ReferralCriteria,
    ) -> Result<Vec<ReferralCandidate>> {
        let now = self.now();
        let defaults = &self.engines.config().referral;
        let min_score = criteria
            .min_referral_score
            .unwrap_or(defaults.default_min_referral_score);
        let min_nps = criteria.min_nps.unwrap_or(defaults.default_min_nps);

        let patients = self.store.patients.list(self.practice_id()).await?;
        let mut candidates = Vec::new();
        for patient in &patients {
            let opportunity = self.refresh_referral(patient, now).await?;
            let in_cooldown = self
                .engines
                .referral
                .in_outreach_cooldown(opportunity.last_outreach_at, now);

            if opportunity.referral_score < min_score || opportunity.nps_score < min_nps {
                continue;
            }
            if criteria.exclude_in_cooldown && in_cooldown {
                continue;
            }
            candidates.push(ReferralCandidate {
                patient_id: patient.id,
                first_name: patient.contact.first_name.clone(),
                nps_score: opportunity.nps_score,
                nps_category: opportunity.nps_category,
                nps_inferred: opportunity.nps_inferred,
                referral_score: opportunity.referral_score,
                score_factors: opportunity.score_factors,
                optimal_outreach_at: opportunity.optimal_outreach_at,
                in_cooldown,
            });
        }

        candidates.sort_by(|a, b| b.referral_score.cmp(&a.referral_score));
        if let Some(limit) = criteria.limit {
            candidates.truncate(limit);
        }

        tracing::info!(
            patients = patients.len(),
            candidates = candidates.len(),
            min_score,
            min_nps,
            "Referral candidates identified"
        );
        Ok(candidates)
    }

    /// Ask a patient for a referral. CONFLICT inside the outreach cooldown.
    pub async fn request_referral(&self, patient_id: Uuid) -> Result<OutreachOutcome> {
        let now = self.now();
        let patient = self.load_patient(patient_id).await?;
        let mut opportunity = self.refresh_referral(&patient, now).await?;

        if self
            .engines
            .referral
            .in_outreach_cooldown(opportunity.last_outreach_at, now)
        {
            return Err(Error::Conflict(format!(
                "referral already requested from patient {} within the last {} days",
                patient_id,
                self.engines.config().referral.outreach_cooldown_days
            )));
        }

        let scheduled_at = opportunity.optimal_outreach_at.unwrap_or(now).max(now);
        let body = format!(
            "Hi {}, thank you for trusting {} with your care. If you know someone who could \
             use our help, we would be grateful for the introduction. They can reach us at {} \
             or book at {}.",
            patient.contact.first_name,
            self.practice.name,
            self.practice.phone,
            self.practice.booking_link
        );
        let message = self.patient_message(
            Channel::Email,
            &patient,
            MessageKind::ReferralRequest,
            Some(format!("A favour from {}", self.practice.name)),
            body,
            scheduled_at,
        )?;

        // Stamp the cooldown first so a retry cannot double-send
        let previous = opportunity.clone();
        opportunity.last_outreach_at = Some(now);
        opportunity.optimal_outreach_at = self.engines.referral.optimal_outreach(
            patient.visits.last_visit_at,
            opportunity.last_outreach_at,
            now,
        );
        self.store.opportunities.save_referral(&opportunity).await?;

        let receipt = match self.store.sender.send(&message).await {
            Ok(receipt) => receipt,
            Err(e) => {
                self.restore_referral(&previous).await;
                return Err(e);
            }
        };
        let (message_id, channel) = (receipt.message_id, message.channel);
        telemetry::record_outreach("referral_request");

        tracing::info!(
            patient_id = %patient_id,
            message_id = %message_id,
            referral_score = opportunity.referral_score,
            "Referral requested"
        );
        self.audit(
            "referral_requested",
            "referral_opportunity",
            json!({
                "patient_id": patient_id,
                "message_id": message_id,
                "channel": channel.as_str(),
                "scheduled_at": scheduled_at,
            }),
        )
        .await?;

        Ok(OutreachOutcome {
            patient_id,
            message_id,
            channel,
            scheduled_at,
        })
    }

    /// Ask a patient for a review on `platform`. CONFLICT inside the review
    /// cooldown.
    pub async fn request_review(
        &self,
        patient_id: Uuid,
        platform: ReviewPlatform,
    ) -> Result<OutreachOutcome> {
        let now = self.now();
        let patient = self.load_patient(patient_id).await?;
        let mut opportunity = self.refresh_referral(&patient, now).await?;

        if self
            .engines
            .referral
            .in_review_cooldown(opportunity.last_review_request_at, now)
        {
            return Err(Error::Conflict(format!(
                "review already requested from patient {} within the last {} days",
                patient_id,
                self.engines.config().referral.review_request_cooldown_days
            )));
        }

        let body = format!(
            "Hi {}, how was your recent visit to {}? A short review on {} helps other patients \
             find us.",
            patient.contact.first_name,
            self.practice.name,
            platform_label(platform)
        );
        let message = self.patient_message(
            Channel::Email,
            &patient,
            MessageKind::ReviewRequest,
            Some(format!("How did we do, {}?", patient.contact.first_name)),
            body,
            now,
        )?;

        let previous = opportunity.clone();
        opportunity.last_review_request_at = Some(now);
        self.store.opportunities.save_referral(&opportunity).await?;

        let receipt = match self.store.sender.send(&message).await {
            Ok(receipt) => receipt,
            Err(e) => {
                self.restore_referral(&previous).await;
                return Err(e);
            }
        };
        let (message_id, channel) = (receipt.message_id, message.channel);
        telemetry::record_outreach("review_request");

        tracing::info!(
            patient_id = %patient_id,
            platform = platform.as_str(),
            message_id = %message_id,
            "Review requested"
        );
        self.audit(
            "review_requested",
            "referral_opportunity",
            json!({
                "patient_id": patient_id,
                "platform": platform.as_str(),
                "message_id": message_id,
            }),
        )
        .await?;

        Ok(OutreachOutcome {
            patient_id,
            message_id,
            channel,
            scheduled_at: now,
        })
    }

    /// Recompute the patient's referral record, keeping outreach history
    async fn refresh_referral(
        &self,
        patient: &PatientRecord,
        now: DateTime<Utc>,
    ) -> Result<ReferralOpportunity> {
        let existing = self
            .store
            .opportunities
            .find_referral(self.practice_id(), patient.id)
            .await?;

        let nps = self.engines.referral.estimate_nps(&patient.visits);
        let score = self.engines.referral.referral_score(&patient.visits, now);
        let last_outreach_at = existing.as_ref().and_then(|o| o.last_outreach_at);
        let optimal_outreach_at = self.engines.referral.optimal_outreach(
            patient.visits.last_visit_at,
            last_outreach_at,
            now,
        );

        let opportunity = ReferralOpportunity {
            id: existing.as_ref().map_or_else(Uuid::new_v4, |o| o.id),
            practice_id: self.practice_id(),
            patient_id: patient.id,
            nps_score: nps.score,
            nps_category: nps.category,
            nps_inferred: nps.inferred,
            referral_score: score.score,
            score_factors: score.factors,
            visit_count: patient.visits.total_visits,
            consecutive_visits: patient.visits.consecutive_visits,
            prior_referrals: patient.visits.prior_referrals,
            optimal_outreach_at,
            last_outreach_at,
            last_review_request_at: existing.as_ref().and_then(|o| o.last_review_request_at),
            analyzed_at: now,
            created_at: existing.as_ref().map_or(now, |o| o.created_at),
        };
        self.store.opportunities.save_referral(&opportunity).await?;

        tracing::debug!(
            patient_id = %patient.id,
            nps = nps.score,
            category = nps.category.as_str(),
            referral_score = score.score,
            "Referral record refreshed"
        );
        Ok(opportunity)
    }

    /// Address a patient-facing message, preferring `channel` and falling
    /// back between email and SMS
    pub(crate) fn patient_message(
        &self,
        channel: Channel,
        patient: &PatientRecord,
        kind: MessageKind,
        subject: Option<String>,
        body: String,
        scheduled_at: DateTime<Utc>,
    ) -> Result<OutboundMessage> {
        let (channel, recipient) = route(channel, &patient.contact).ok_or_else(|| {
            Error::BadRequest(format!("patient {} has no contact address", patient.id))
        })?;
        Ok(OutboundMessage {
            kind,
            channel,
            recipient,
            subject,
            body,
            scheduled_at,
            entity_id: patient.id,
        })
    }

    /// Put a referral record back after a rejected delivery
    async fn restore_referral(&self, previous: &ReferralOpportunity) {
        if let Err(e) = self.store.opportunities.save_referral(previous).await {
            tracing::error!(
                patient_id = %previous.patient_id,
                error = %e,
                "Failed to restore referral record after delivery error"
            );
        }
    }
}

fn platform_label(platform: ReviewPlatform) -> &'static str {
    match platform {
        ReviewPlatform::Google => "Google",
        ReviewPlatform::Yelp => "Yelp",
        ReviewPlatform::Facebook => "Facebook",
        ReviewPlatform::Healthgrades => "Healthgrades",
        ReviewPlatform::Zocdoc => "Zocdoc",
        ReviewPlatform::Other => "your favourite review site",
    }
}
