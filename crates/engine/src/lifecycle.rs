//! Lead Lifecycle State Machine
//!
//! ```text
//!   NEW/SCORING ──scores──▶ HOT | WARM | COLD | (unchanged)
//!   any live    ──positive or urgent reply──▶ HOT
//!   any live    ──appointment request──▶ READY
//!   any live    ──nurture started──▶ NURTURING
//!   NURTURING   ──sequence finished──▶ HOT | WARM
//!   any live    ──unsubscribe──▶ LOST        (terminal)
//!   any live    ──conversion──▶ CONVERTED    (terminal)
//! ```
//!
//! CONVERTED and LOST are never left.

use chrono::{DateTime, Duration, Utc};
use practice_growth_config::GrowthConfig;
use practice_growth_core::{LeadStatus, NextAction};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Something that happened to a lead
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LifecycleEvent {
    /// Fresh or cached scores were (re)evaluated
    Scored {
        quality: u32,
        urgency: u32,
        conversion_probability: f64,
        age_days: u32,
    },
    /// Positive or high-urgency reply
    Escalated,
    AppointmentRequested,
    NurtureStarted,
    NurtureCompleted { quality: u32 },
    Unsubscribed,
    Converted,
}

impl LifecycleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Scored { .. } => "scored",
            Self::Escalated => "escalated",
            Self::AppointmentRequested => "appointment_requested",
            Self::NurtureStarted => "nurture_started",
            Self::NurtureCompleted { .. } => "nurture_completed",
            Self::Unsubscribed => "unsubscribed",
            Self::Converted => "converted",
        }
    }
}

/// Result of applying an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Changed { from: LeadStatus, to: LeadStatus },
    Unchanged(LeadStatus),
    /// The lead is terminal and the event would have moved it
    Refused(LeadStatus),
}

impl Transition {
    /// Status after the event
    pub fn status(&self) -> LeadStatus {
        match *self {
            Self::Changed { to, .. } => to,
            Self::Unchanged(status) | Self::Refused(status) => status,
        }
    }

    pub fn is_change(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }
}

/// Work-queue position and recommended follow-up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityPlan {
    /// 1 is most urgent; `None` for terminal leads
    pub rank: Option<u8>,
    pub action: NextAction,
    pub due_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct LifecycleMachine {
    config: Arc<GrowthConfig>,
}

impl LifecycleMachine {
    pub fn new(config: Arc<GrowthConfig>) -> Self {
        Self { config }
    }

    /// Status implied by scores. Only NEW and SCORING leads move.
    pub fn status_from_scores(
        &self,
        current: LeadStatus,
        quality: u32,
        urgency: u32,
        conversion_probability: f64,
        age_days: u32,
    ) -> LeadStatus {
        if !matches!(current, LeadStatus::New | LeadStatus::Scoring) {
            return current;
        }

        let l = &self.config.lifecycle;
        if quality >= l.hot_min_quality && urgency >= l.hot_min_urgency {
            LeadStatus::Hot
        } else if quality >= l.warm_min_quality || conversion_probability >= l.warm_min_conversion {
            LeadStatus::Warm
        } else if quality < l.cold_below_quality && age_days > l.cold_after_days {
            LeadStatus::Cold
        } else {
            current
        }
    }

    /// Apply an event to a status
    pub fn apply(&self, current: LeadStatus, event: LifecycleEvent) -> Transition {
        let target = match event {
            LifecycleEvent::Scored {
                quality,
                urgency,
                conversion_probability,
                age_days,
            } => self.status_from_scores(current, quality, urgency, conversion_probability, age_days),
            LifecycleEvent::Escalated => LeadStatus::Hot,
            LifecycleEvent::AppointmentRequested => LeadStatus::Ready,
            LifecycleEvent::NurtureStarted => LeadStatus::Nurturing,
            LifecycleEvent::NurtureCompleted { quality } => {
                if quality >= self.config.nurture.completion_hot_min_quality {
                    LeadStatus::Hot
                } else {
                    LeadStatus::Warm
                }
            }
            LifecycleEvent::Unsubscribed => LeadStatus::Lost,
            LifecycleEvent::Converted => LeadStatus::Converted,
        };

        if target == current {
            return Transition::Unchanged(current);
        }
        if current.is_terminal() {
            tracing::warn!(
                status = %current,
                event = event.name(),
                "Refused transition out of terminal status"
            );
            return Transition::Refused(current);
        }

        tracing::info!(from = %current, to = %target, event = event.name(), "Lead status changed");
        Transition::Changed {
            from: current,
            to: target,
        }
    }

    /// Priority rank and next action for a status
    pub fn priority(&self, status: LeadStatus, now: DateTime<Utc>) -> PriorityPlan {
        let (rank, action, due_in) = match status {
            LeadStatus::Ready => (Some(1), NextAction::BookConsultation, Some(Duration::hours(1))),
            LeadStatus::Hot => (Some(2), NextAction::CallNow, Some(Duration::hours(1))),
            LeadStatus::Warm => (Some(3), NextAction::ScheduleCall, Some(Duration::days(1))),
            LeadStatus::Nurturing => (Some(4), NextAction::ContinueNurture, None),
            LeadStatus::New | LeadStatus::Scoring => {
                (Some(4), NextAction::StartNurture, Some(Duration::days(2)))
            }
            LeadStatus::Cold => (Some(5), NextAction::StartNurture, Some(Duration::days(2))),
            LeadStatus::Converted | LeadStatus::Lost => (None, NextAction::NoAction, None),
        };

        PriorityPlan {
            rank,
            action,
            due_at: due_in.map(|d| now + d),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> LifecycleMachine {
        LifecycleMachine::new(Arc::new(GrowthConfig::default()))
    }

    const ALL: [LeadStatus; 9] = [
        LeadStatus::New,
        LeadStatus::Scoring,
        LeadStatus::Hot,
        LeadStatus::Warm,
        LeadStatus::Cold,
        LeadStatus::Nurturing,
        LeadStatus::Ready,
        LeadStatus::Converted,
        LeadStatus::Lost,
    ];

    fn all_events() -> Vec<LifecycleEvent> {
        vec![
            LifecycleEvent::Scored {
                quality: 95,
                urgency: 85,
                conversion_probability: 0.95,
                age_days: 1,
            },
            LifecycleEvent::Scored {
                quality: 10,
                urgency: 0,
                conversion_probability: 0.01,
                age_days: 30,
            },
            LifecycleEvent::Escalated,
            LifecycleEvent::AppointmentRequested,
            LifecycleEvent::NurtureStarted,
            LifecycleEvent::NurtureCompleted { quality: 80 },
            LifecycleEvent::Unsubscribed,
            LifecycleEvent::Converted,
        ]
    }

    #[test]
    fn test_score_rules_in_priority_order() {
        let m = machine();
        assert_eq!(m.status_from_scores(LeadStatus::New, 70, 60, 0.1, 0), LeadStatus::Hot);
        assert_eq!(m.status_from_scores(LeadStatus::New, 70, 59, 0.1, 0), LeadStatus::Warm);
        assert_eq!(m.status_from_scores(LeadStatus::New, 20, 0, 0.4, 0), LeadStatus::Warm);
        assert_eq!(m.status_from_scores(LeadStatus::New, 29, 0, 0.1, 15), LeadStatus::Cold);
        assert_eq!(m.status_from_scores(LeadStatus::New, 29, 0, 0.1, 14), LeadStatus::New);
        assert_eq!(
            m.status_from_scores(LeadStatus::Scoring, 40, 0, 0.1, 30),
            LeadStatus::Scoring
        );
    }

    #[test]
    fn test_scores_do_not_move_settled_leads() {
        let m = machine();
        assert_eq!(m.status_from_scores(LeadStatus::Warm, 95, 90, 0.9, 0), LeadStatus::Warm);
        assert_eq!(
            m.status_from_scores(LeadStatus::Nurturing, 10, 0, 0.01, 40),
            LeadStatus::Nurturing
        );
    }

    #[test]
    fn test_terminal_states_are_never_left() {
        let m = machine();
        for status in [LeadStatus::Converted, LeadStatus::Lost] {
            for event in all_events() {
                assert_eq!(m.apply(status, event).status(), status, "{status} left via {event:?}");
            }
        }
    }

    #[test]
    fn test_forced_events_from_any_live_status() {
        let m = machine();
        for status in ALL.iter().copied().filter(|s| !s.is_terminal()) {
            assert_eq!(m.apply(status, LifecycleEvent::Unsubscribed).status(), LeadStatus::Lost);
            assert_eq!(m.apply(status, LifecycleEvent::Converted).status(), LeadStatus::Converted);
            assert_eq!(m.apply(status, LifecycleEvent::Escalated).status(), LeadStatus::Hot);
        }
    }

    #[test]
    fn test_refusal_is_reported() {
        let m = machine();
        assert_eq!(
            m.apply(LeadStatus::Lost, LifecycleEvent::Converted),
            Transition::Refused(LeadStatus::Lost)
        );
        assert_eq!(
            m.apply(LeadStatus::Lost, LifecycleEvent::Unsubscribed),
            Transition::Unchanged(LeadStatus::Lost)
        );
    }

    #[test]
    fn test_nurture_completion() {
        let m = machine();
        assert_eq!(
            m.apply(LeadStatus::Nurturing, LifecycleEvent::NurtureCompleted { quality: 70 })
                .status(),
            LeadStatus::Hot
        );
        assert_eq!(
            m.apply(LeadStatus::Nurturing, LifecycleEvent::NurtureCompleted { quality: 69 })
                .status(),
            LeadStatus::Warm
        );
    }

    #[test]
    fn test_priority_table() {
        let m = machine();
        let now = Utc::now();

        let hot = m.priority(LeadStatus::Hot, now);
        assert_eq!(hot.rank, Some(2));
        assert_eq!(hot.action, NextAction::CallNow);
        assert_eq!(hot.due_at, Some(now + Duration::hours(1)));

        assert_eq!(m.priority(LeadStatus::Ready, now).rank, Some(1));
        assert_eq!(m.priority(LeadStatus::Cold, now).rank, Some(5));
        assert_eq!(m.priority(LeadStatus::Nurturing, now).due_at, None);

        let lost = m.priority(LeadStatus::Lost, now);
        assert_eq!(lost.rank, None);
        assert_eq!(lost.action, NextAction::NoAction);
    }
}
