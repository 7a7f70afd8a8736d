//! Nurture Sequence Configuration
//!
//! The four sequence templates, the rules choosing between them and the send
//! timing heuristic. Templates are plain text with `{{placeholder}}` tokens.

use chrono::Weekday;
use practice_growth_core::{Channel, SequenceType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a step's content is meant to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Educational,
    Testimonial,
    CaseStudy,
    Faq,
    Offer,
    Reminder,
    PersonalNote,
    VideoIntro,
}

/// One timed message in a sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceStep {
    /// 1-based position
    pub step_number: u32,
    /// Days after the previous step (or the sequence start for step 1)
    pub delay_days: u32,
    pub channel: Channel,
    pub content_type: ContentType,
    #[serde(default)]
    pub subject: Option<String>,
    pub template: String,
}

impl SequenceStep {
    fn new(
        step_number: u32,
        delay_days: u32,
        channel: Channel,
        content_type: ContentType,
        subject: Option<&str>,
        template: &str,
    ) -> Self {
        Self {
            step_number,
            delay_days,
            channel,
            content_type,
            subject: subject.map(str::to_string),
            template: template.to_string(),
        }
    }
}

/// Send-window heuristic
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub send_days: Vec<Weekday>,
    pub morning_hour: u32,
    pub afternoon_hour: u32,
    /// Leads with at least this many link clicks get the morning slot
    pub morning_min_clicks: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            send_days: vec![Weekday::Tue, Weekday::Wed, Weekday::Thu],
            morning_hour: 10,
            afternoon_hour: 14,
            morning_min_clicks: 3,
        }
    }
}

/// Nurture configuration loaded from the `nurture` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NurtureConfig {
    /// Re-engagement when older than this ...
    pub reengagement_after_days: u32,
    /// ... and engagement is strictly below this
    pub reengagement_below_engagement: u32,
    pub decision_min_quality: u32,
    pub decision_min_urgency: u32,
    pub consideration_min_quality: u32,
    pub consideration_min_conversion: f64,
    /// Completing a sequence lands on HOT at or above this quality, else WARM
    pub completion_hot_min_quality: u32,
    pub timing: TimingConfig,
    pub sequences: BTreeMap<SequenceType, Vec<SequenceStep>>,
}

impl Default for NurtureConfig {
    fn default() -> Self {
        Self {
            reengagement_after_days: 21,
            reengagement_below_engagement: 20,
            decision_min_quality: 70,
            decision_min_urgency: 50,
            consideration_min_quality: 40,
            consideration_min_conversion: 0.3,
            completion_hot_min_quality: 70,
            timing: TimingConfig::default(),
            sequences: default_sequences(),
        }
    }
}

impl NurtureConfig {
    pub fn steps(&self, sequence: SequenceType) -> &[SequenceStep] {
        self.sequences
            .get(&sequence)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

fn default_sequences() -> BTreeMap<SequenceType, Vec<SequenceStep>> {
    use Channel::*;
    use ContentType::*;

    let awareness = vec![
        SequenceStep::new(
            1,
            0,
            Email,
            Educational,
            Some("Welcome to {{practiceName}}"),
            "Hi {{firstName}}, thanks for your interest in {{practiceName}}. \
             Here is what to expect at a first visit with us.",
        ),
        SequenceStep::new(
            2,
            3,
            Email,
            Educational,
            Some("Answers to the questions we hear most"),
            "Hi {{firstName}}, we put together answers to the questions new patients ask us most.",
        ),
        SequenceStep::new(
            3,
            4,
            Email,
            Testimonial,
            Some("Why patients choose {{practiceName}}"),
            "Hi {{firstName}}, a few of our patients shared their experience with {{practiceName}}.",
        ),
        SequenceStep::new(
            4,
            7,
            Sms,
            Reminder,
            None,
            "Hi {{firstName}}, {{practiceName}} here. Questions about getting started? \
             Call {{practicePhone}} or book at {{bookingLink}}",
        ),
        SequenceStep::new(
            5,
            7,
            Email,
            Offer,
            Some("A welcome offer from {{practiceName}}"),
            "Hi {{firstName}}, new patients receive a complimentary consultation. \
             Reserve yours at {{bookingLink}}.",
        ),
    ];

    let consideration = vec![
        SequenceStep::new(
            1,
            0,
            Email,
            CaseStudy,
            Some("How we helped a patient like you"),
            "Hi {{firstName}}, here is how {{practiceName}} helped a patient with a similar concern.",
        ),
        SequenceStep::new(
            2,
            2,
            Email,
            Testimonial,
            Some("In their own words"),
            "Hi {{firstName}}, hear directly from patients who were in your position.",
        ),
        SequenceStep::new(
            3,
            3,
            Sms,
            Faq,
            None,
            "Hi {{firstName}}, wondering about insurance or cost? {{practiceName}} can check \
             your benefits: {{practicePhone}}",
        ),
        SequenceStep::new(
            4,
            4,
            Email,
            Offer,
            Some("Ready when you are, {{firstName}}"),
            "Hi {{firstName}}, book a consultation this month at {{bookingLink}}.",
        ),
    ];

    let decision = vec![
        SequenceStep::new(
            1,
            0,
            Sms,
            PersonalNote,
            None,
            "Hi {{firstName}}, this is the team at {{practiceName}}. We have openings this week. \
             Reply or call {{practicePhone}} to grab one.",
        ),
        SequenceStep::new(
            2,
            1,
            Email,
            Offer,
            Some("Your consultation at {{practiceName}}"),
            "Hi {{firstName}}, your first consultation is on us. Pick a time: {{bookingLink}}",
        ),
        SequenceStep::new(
            3,
            2,
            Video,
            VideoIntro,
            Some("Meet your care team"),
            "Hi {{firstName}}, here is a short introduction from the {{practiceName}} team.",
        ),
    ];

    let reengagement = vec![
        SequenceStep::new(
            1,
            0,
            Email,
            PersonalNote,
            Some("Still thinking it over, {{firstName}}?"),
            "Hi {{firstName}}, no pressure. {{practiceName}} is here whenever you are ready.",
        ),
        SequenceStep::new(
            2,
            5,
            Sms,
            Offer,
            None,
            "Hi {{firstName}}, {{practiceName}} is holding a complimentary consultation for you: \
             {{bookingLink}}",
        ),
        SequenceStep::new(
            3,
            7,
            Email,
            Educational,
            Some("One last note from {{practiceName}}"),
            "Hi {{firstName}}, this is our last check-in. Reach us any time at {{practicePhone}}.",
        ),
    ];

    BTreeMap::from([
        (SequenceType::Awareness, awareness),
        (SequenceType::Consideration, consideration),
        (SequenceType::Decision, decision),
        (SequenceType::ReEngagement, reengagement),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sequences_are_numbered_contiguously() {
        let config = NurtureConfig::default();
        for sequence in [
            SequenceType::Awareness,
            SequenceType::Consideration,
            SequenceType::Decision,
            SequenceType::ReEngagement,
        ] {
            let steps = config.steps(sequence);
            assert!(!steps.is_empty(), "{:?} has no steps", sequence);
            for (idx, step) in steps.iter().enumerate() {
                assert_eq!(step.step_number, idx as u32 + 1);
            }
        }
    }

    #[test]
    fn test_timing_defaults() {
        let timing = TimingConfig::default();
        assert_eq!(
            timing.send_days,
            vec![Weekday::Tue, Weekday::Wed, Weekday::Thu]
        );
        assert_eq!(timing.morning_hour, 10);
        assert_eq!(timing.afternoon_hour, 14);
    }
}
