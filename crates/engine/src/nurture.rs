//! Nurture Sequencing Engine
//!
//! Chooses a sequence template for a lead, walks its steps, renders step
//! content and picks send slots. `NurtureState::step_number` is the last step
//! sent; 0 means the sequence is enrolled but nothing has gone out yet.

use chrono::{DateTime, Duration, Utc};
use practice_growth_config::{GrowthConfig, SequenceStep};
use practice_growth_core::{Error, NurtureState, Result, SequenceType};
use std::sync::Arc;

use crate::timing::next_send_slot;

/// Values substituted into `{{placeholder}}` tokens
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateContext {
    pub first_name: String,
    pub practice_name: String,
    pub practice_phone: String,
    pub booking_link: String,
}

impl TemplateContext {
    fn replacements(&self) -> [(&'static str, &str); 4] {
        [
            ("{{firstName}}", self.first_name.as_str()),
            ("{{practiceName}}", self.practice_name.as_str()),
            ("{{practicePhone}}", self.practice_phone.as_str()),
            ("{{bookingLink}}", self.booking_link.as_str()),
        ]
    }
}

/// Literal placeholder substitution; unknown tokens are left as written
pub fn render_template(template: &str, context: &TemplateContext) -> String {
    context
        .replacements()
        .iter()
        .fold(template.to_string(), |text, (token, value)| text.replace(token, value))
}

/// What happens on the next advance
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NurtureProgress<'a> {
    Send(&'a SequenceStep),
    /// No steps remain
    Completed,
}

#[derive(Debug, Clone)]
pub struct NurtureEngine {
    config: Arc<GrowthConfig>,
}

impl NurtureEngine {
    pub fn new(config: Arc<GrowthConfig>) -> Self {
        Self { config }
    }

    /// Pick a sequence, first matching rule wins
    pub fn select_sequence(
        &self,
        quality: u32,
        urgency: u32,
        conversion_probability: f64,
        age_days: u32,
        engagement_score: u32,
    ) -> SequenceType {
        let n = &self.config.nurture;
        let sequence = if age_days > n.reengagement_after_days
            && engagement_score < n.reengagement_below_engagement
        {
            SequenceType::ReEngagement
        } else if quality >= n.decision_min_quality && urgency >= n.decision_min_urgency {
            SequenceType::Decision
        } else if quality >= n.consideration_min_quality
            || conversion_probability >= n.consideration_min_conversion
        {
            SequenceType::Consideration
        } else {
            SequenceType::Awareness
        };

        tracing::debug!(
            sequence = sequence.as_str(),
            quality,
            urgency,
            age_days,
            engagement_score,
            "Nurture sequence selected"
        );
        sequence
    }

    pub fn steps(&self, sequence: SequenceType) -> &[SequenceStep] {
        self.config.nurture.steps(sequence)
    }

    pub fn step_count(&self, sequence: SequenceType) -> u32 {
        self.steps(sequence).len() as u32
    }

    /// Fresh enrollment positioned before step 1
    pub fn enroll(&self, sequence: SequenceType, now: DateTime<Utc>) -> NurtureState {
        NurtureState {
            sequence,
            step_number: 0,
            started_at: now,
            paused_at: None,
        }
    }

    /// Next step to send, or `skip_to` when given.
    ///
    /// `skip_to` must lie after the last sent step and within the sequence.
    pub fn next_step<'a>(
        &'a self,
        state: &NurtureState,
        skip_to: Option<u32>,
    ) -> Result<NurtureProgress<'a>> {
        let steps = self.steps(state.sequence);
        let count = steps.len() as u32;

        let target = match skip_to {
            Some(step) if step <= state.step_number || step > count => {
                return Err(Error::BadRequest(format!(
                    "Cannot skip to step {} of {} sequence (last sent {}, {} steps)",
                    step,
                    state.sequence.as_str(),
                    state.step_number,
                    count
                )));
            }
            Some(step) => step,
            None => state.step_number + 1,
        };

        if target > count {
            return Ok(NurtureProgress::Completed);
        }
        Ok(steps
            .get(target as usize - 1)
            .map(NurtureProgress::Send)
            .unwrap_or(NurtureProgress::Completed))
    }

    /// State after `step` went out
    pub fn mark_sent(&self, state: &NurtureState, step: &SequenceStep) -> NurtureState {
        NurtureState {
            step_number: step.step_number.min(self.step_count(state.sequence)),
            ..state.clone()
        }
    }

    pub fn pause(&self, state: &NurtureState, now: DateTime<Utc>) -> NurtureState {
        NurtureState {
            paused_at: Some(now),
            ..state.clone()
        }
    }

    /// Continue after the last sent step, or start over from step 1
    pub fn resume(&self, state: &NurtureState, restart: bool, now: DateTime<Utc>) -> NurtureState {
        if restart {
            self.enroll(state.sequence, now)
        } else {
            NurtureState {
                paused_at: None,
                ..state.clone()
            }
        }
    }

    /// Send slot for a step: its delay from now, then the weekday heuristic
    pub fn schedule(
        &self,
        step: &SequenceStep,
        links_clicked: u32,
        now: DateTime<Utc>,
    ) -> DateTime<Utc> {
        let earliest = now + Duration::days(step.delay_days as i64);
        next_send_slot(&self.config.nurture.timing, earliest, now, links_clicked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn engine() -> NurtureEngine {
        NurtureEngine::new(Arc::new(GrowthConfig::default()))
    }

    #[test]
    fn test_idle_unengaged_lead_gets_reengagement() {
        let e = engine();
        assert_eq!(e.select_sequence(10, 0, 0.05, 25, 10), SequenceType::ReEngagement);
        // Engagement keeps an old lead out of re-engagement
        assert_eq!(e.select_sequence(10, 0, 0.05, 25, 20), SequenceType::Awareness);
    }

    #[test]
    fn test_selection_priority() {
        let e = engine();
        assert_eq!(e.select_sequence(70, 50, 0.5, 1, 0), SequenceType::Decision);
        assert_eq!(e.select_sequence(70, 49, 0.1, 1, 0), SequenceType::Consideration);
        assert_eq!(e.select_sequence(10, 0, 0.3, 1, 0), SequenceType::Consideration);
        assert_eq!(e.select_sequence(39, 0, 0.29, 1, 0), SequenceType::Awareness);
    }

    #[test]
    fn test_walks_every_step_then_completes() {
        let e = engine();
        let now = Utc::now();
        let mut state = e.enroll(SequenceType::Decision, now);
        let mut sent = Vec::new();

        loop {
            match e.next_step(&state, None).unwrap() {
                NurtureProgress::Send(step) => {
                    sent.push(step.step_number);
                    state = e.mark_sent(&state, step);
                    assert!(state.step_number <= e.step_count(SequenceType::Decision));
                }
                NurtureProgress::Completed => break,
            }
        }
        assert_eq!(sent, vec![1, 2, 3]);
    }

    #[test]
    fn test_skip_to() {
        let e = engine();
        let state = e.enroll(SequenceType::Awareness, Utc::now());

        match e.next_step(&state, Some(4)).unwrap() {
            NurtureProgress::Send(step) => assert_eq!(step.step_number, 4),
            NurtureProgress::Completed => panic!("expected a step"),
        }
        assert!(e.next_step(&state, Some(6)).is_err());
        assert!(e.next_step(&state, Some(0)).is_err());

        let later = NurtureState {
            step_number: 3,
            ..state
        };
        assert!(e.next_step(&later, Some(2)).is_err());
    }

    #[test]
    fn test_resume_and_restart() {
        let e = engine();
        let started = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let state = NurtureState {
            sequence: SequenceType::Consideration,
            step_number: 2,
            started_at: started,
            paused_at: None,
        };
        let paused = e.pause(&state, now);
        assert!(paused.is_paused());

        let resumed = e.resume(&paused, false, now);
        assert!(!resumed.is_paused());
        assert_eq!(resumed.step_number, 2);
        assert_eq!(resumed.started_at, started);

        let restarted = e.resume(&paused, true, now);
        assert_eq!(restarted.step_number, 0);
        assert_eq!(restarted.started_at, now);
    }

    #[test]
    fn test_render_template() {
        let context = TemplateContext {
            first_name: "Ana".to_string(),
            practice_name: "Bright Smiles".to_string(),
            practice_phone: "555-0100".to_string(),
            booking_link: "https://book.example".to_string(),
        };
        let text = render_template(
            "Hi {{firstName}}, call {{practicePhone}} or visit {{bookingLink}}. {{unknown}} {{practiceName}}",
            &context,
        );
        assert_eq!(
            text,
            "Hi Ana, call 555-0100 or visit https://book.example. {{unknown}} Bright Smiles"
        );
    }

    #[test]
    fn test_schedule_respects_step_delay() {
        let e = engine();
        // Monday 2024-01-08 09:00
        let now = Utc.with_ymd_and_hms(2024, 1, 8, 9, 0, 0).unwrap();
        let step = &e.steps(SequenceType::Awareness)[1];
        assert_eq!(step.delay_days, 3);
        // Thursday 2024-01-11 at the afternoon slot
        assert_eq!(
            e.schedule(step, 0, now),
            Utc.with_ymd_and_hms(2024, 1, 11, 14, 0, 0).unwrap()
        );
    }
}
