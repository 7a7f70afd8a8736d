//! Response & Engagement Analyzer
//!
//! Keyword classification of inbound replies and the capped engagement
//! score. Keywords may be phrases; they are matched against whole words, so
//! "no" never fires inside "know" and "not interested" is not counted as the
//! positive "interested".

use practice_growth_config::{GrowthConfig, ResponseConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyLevel {
    High,
    Medium,
    Low,
}

impl UrgencyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// Kind of inbound interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    Open,
    Click,
    Reply,
    /// Explicit request to book
    AppointmentRequest,
    Unsubscribe,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Click => "click",
            Self::Reply => "reply",
            Self::AppointmentRequest => "appointment_request",
            Self::Unsubscribe => "unsubscribe",
        }
    }
}

/// Follow-up the team should take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    CallNow,
    BookConsultation,
    /// A person should read the reply before the sequence continues
    ReviewReply,
    ContinueNurture,
    StopOutreach,
}

impl SuggestedAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CallNow => "call_now",
            Self::BookConsultation => "book_consultation",
            Self::ReviewReply => "review_reply",
            Self::ContinueNurture => "continue_nurture",
            Self::StopOutreach => "stop_outreach",
        }
    }
}

/// Keyword classification of a reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyAnalysis {
    pub sentiment: Sentiment,
    pub urgency: UrgencyLevel,
    pub positive_hits: usize,
    pub negative_hits: usize,
    pub urgency_hits: usize,
}

impl ReplyAnalysis {
    fn empty() -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            urgency: UrgencyLevel::Low,
            positive_hits: 0,
            negative_hits: 0,
            urgency_hits: 0,
        }
    }
}

/// Decision taken for one interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseDecision {
    pub response_type: ResponseType,
    pub analysis: ReplyAnalysis,
    /// Move the lead to the front of the queue now
    pub escalate: bool,
    /// Force HOT regardless of cached scores
    pub force_hot: bool,
    pub suggested_action: SuggestedAction,
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn phrase_tokens(phrases: &[String]) -> Vec<Vec<String>> {
    phrases
        .iter()
        .map(|p| tokenize(p))
        .filter(|t| !t.is_empty())
        .collect()
}

fn matches_at(tokens: &[String], at: usize, phrase: &[String]) -> bool {
    tokens.len() >= at + phrase.len() && tokens[at..at + phrase.len()] == *phrase
}

/// Count phrase occurrences allowing overlap
fn count_phrases(tokens: &[String], phrases: &[Vec<String>]) -> usize {
    (0..tokens.len())
        .map(|at| phrases.iter().filter(|p| matches_at(tokens, at, p)).count())
        .sum()
}

#[derive(Debug, Clone)]
pub struct ResponseAnalyzer {
    config: Arc<GrowthConfig>,
}

impl ResponseAnalyzer {
    pub fn new(config: Arc<GrowthConfig>) -> Self {
        Self { config }
    }

    fn response_config(&self) -> &ResponseConfig {
        &self.config.response
    }

    /// Classify sentiment and urgency of free text
    pub fn analyze_text(&self, text: &str) -> ReplyAnalysis {
        let cfg = self.response_config();
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return ReplyAnalysis::empty();
        }

        // Positive and negative phrases compete for tokens: at each position
        // the longest phrase wins and consumes its words.
        let mut polar: Vec<(Vec<String>, bool)> = phrase_tokens(&cfg.positive_keywords)
            .into_iter()
            .map(|p| (p, true))
            .chain(
                phrase_tokens(&cfg.negative_keywords)
                    .into_iter()
                    .map(|p| (p, false)),
            )
            .collect();
        polar.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        let (mut positive_hits, mut negative_hits) = (0, 0);
        let mut at = 0;
        while at < tokens.len() {
            match polar.iter().find(|(p, _)| matches_at(&tokens, at, p)) {
                Some((phrase, positive)) => {
                    if *positive {
                        positive_hits += 1;
                    } else {
                        negative_hits += 1;
                    }
                    at += phrase.len();
                }
                None => at += 1,
            }
        }

        let urgency_hits = count_phrases(&tokens, &phrase_tokens(&cfg.urgency_keywords));

        let sentiment = match positive_hits.cmp(&negative_hits) {
            std::cmp::Ordering::Greater => Sentiment::Positive,
            std::cmp::Ordering::Less => Sentiment::Negative,
            std::cmp::Ordering::Equal => Sentiment::Neutral,
        };
        let urgency = if urgency_hits >= cfg.high_urgency_min_hits {
            UrgencyLevel::High
        } else if urgency_hits > 0 {
            UrgencyLevel::Medium
        } else {
            UrgencyLevel::Low
        };

        ReplyAnalysis {
            sentiment,
            urgency,
            positive_hits,
            negative_hits,
            urgency_hits,
        }
    }

    /// Decide escalation for an interaction
    pub fn decide(&self, response_type: ResponseType, content: Option<&str>) -> ResponseDecision {
        let analysis = content
            .map(|text| self.analyze_text(text))
            .unwrap_or_else(ReplyAnalysis::empty);

        let (escalate, force_hot, suggested_action) = match response_type {
            ResponseType::Open | ResponseType::Click => {
                (false, false, SuggestedAction::ContinueNurture)
            }
            ResponseType::AppointmentRequest => (true, false, SuggestedAction::BookConsultation),
            ResponseType::Unsubscribe => (false, false, SuggestedAction::StopOutreach),
            ResponseType::Reply => {
                let hot = analysis.sentiment == Sentiment::Positive
                    || analysis.urgency == UrgencyLevel::High;
                let action = if hot {
                    SuggestedAction::CallNow
                } else {
                    SuggestedAction::ReviewReply
                };
                (true, hot, action)
            }
        };

        tracing::debug!(
            response_type = response_type.as_str(),
            sentiment = analysis.sentiment.as_str(),
            urgency = analysis.urgency.as_str(),
            escalate,
            "Response analyzed"
        );

        ResponseDecision {
            response_type,
            analysis,
            escalate,
            force_hot,
            suggested_action,
        }
    }

    /// Capped engagement score; the early bonus needs a sequence position
    pub fn engagement_score(
        &self,
        opens: u32,
        clicks: u32,
        replies: u32,
        current_step: Option<u32>,
    ) -> u32 {
        let e = &self.response_config().engagement;
        let base = opens.saturating_mul(e.per_open).min(e.open_max)
            + clicks.saturating_mul(e.per_click).min(e.click_max)
            + replies.saturating_mul(e.per_reply).min(e.reply_max);

        let early = current_step.map_or(false, |step| step <= e.early_bonus_max_step);
        let bonus = if early && base >= e.early_bonus_threshold {
            e.early_bonus_points
        } else {
            0
        };

        (base + bonus).min(e.max_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> ResponseAnalyzer {
        ResponseAnalyzer::new(Arc::new(GrowthConfig::default()))
    }

    #[test]
    fn test_positive_reply() {
        let a = analyzer().analyze_text("Yes! Sounds good, I'd love to book.");
        assert_eq!(a.sentiment, Sentiment::Positive);
        assert_eq!(a.urgency, UrgencyLevel::Low);
    }

    #[test]
    fn test_negated_interest_is_negative() {
        let a = analyzer().analyze_text("Not interested, thanks");
        assert_eq!(a.negative_hits, 1);
        assert_eq!(a.positive_hits, 1);
        assert_eq!(a.sentiment, Sentiment::Neutral);

        let b = analyzer().analyze_text("I'm not interested. Please remove me.");
        assert_eq!(b.sentiment, Sentiment::Negative);
    }

    #[test]
    fn test_whole_word_matching() {
        let a = analyzer().analyze_text("I know the answer");
        assert_eq!(a.negative_hits, 0);
        assert_eq!(a.sentiment, Sentiment::Neutral);
    }

    #[test]
    fn test_urgency_levels() {
        let s = analyzer();
        assert_eq!(s.analyze_text("Can I come in today?").urgency, UrgencyLevel::Medium);
        assert_eq!(
            s.analyze_text("I'm in pain, need to be seen asap").urgency,
            UrgencyLevel::High
        );
        assert_eq!(s.analyze_text("hello").urgency, UrgencyLevel::Low);
    }

    #[test]
    fn test_every_reply_escalates() {
        let s = analyzer();
        let neutral = s.decide(ResponseType::Reply, Some("who is this"));
        assert!(neutral.escalate);
        assert!(!neutral.force_hot);
        assert_eq!(neutral.suggested_action, SuggestedAction::ReviewReply);

        let urgent = s.decide(ResponseType::Reply, Some("emergency, please call today"));
        assert!(urgent.force_hot);
        assert_eq!(urgent.suggested_action, SuggestedAction::CallNow);

        let open = s.decide(ResponseType::Open, None);
        assert!(!open.escalate);
    }

    #[test]
    fn test_engagement_caps_and_bonus() {
        let s = analyzer();
        assert_eq!(s.engagement_score(0, 0, 0, None), 0);
        assert_eq!(s.engagement_score(5, 0, 0, None), 30);
        assert_eq!(s.engagement_score(5, 5, 5, None), 100);
        assert_eq!(s.engagement_score(3, 0, 0, Some(2)), 40);
        assert_eq!(s.engagement_score(3, 0, 0, Some(3)), 30);
        assert_eq!(s.engagement_score(2, 0, 0, Some(1)), 20);
        assert_eq!(s.engagement_score(5, 5, 5, Some(1)), 100);
    }

    #[test]
    fn test_engagement_is_monotonic() {
        let s = analyzer();
        for step in [None, Some(1), Some(4)] {
            let mut last = 0;
            for n in 0..8 {
                let score = s.engagement_score(n, n, n, step);
                assert!(score >= last);
                last = score;
            }
        }
    }
}
