//! Domain counters exported through the `metrics` facade

use practice_growth_core::{Channel, LeadStatus};

pub fn record_lead_scored(cached: bool) {
    metrics::counter!("growth_leads_scored_total", "cached" => if cached { "true" } else { "false" })
        .increment(1);
}

pub fn record_status_transition(to: LeadStatus) {
    metrics::counter!("growth_status_transitions_total", "to" => to.as_str()).increment(1);
}

pub fn record_nurture_message(channel: Channel) {
    metrics::counter!("growth_nurture_messages_total", "channel" => channel.as_str())
        .increment(1);
}

pub fn record_response(sentiment: &'static str) {
    metrics::counter!("growth_responses_total", "sentiment" => sentiment).increment(1);
}

pub fn record_outreach(kind: &'static str) {
    metrics::counter!("growth_outreach_total", "kind" => kind).increment(1);
}
