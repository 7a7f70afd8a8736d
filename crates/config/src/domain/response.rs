//! Reply classification keyword sets and engagement scoring caps

use serde::{Deserialize, Serialize};

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

/// Engagement score: capped contributions from opens, clicks and replies
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngagementScoringConfig {
    pub per_open: u32,
    pub open_max: u32,
    pub per_click: u32,
    pub click_max: u32,
    pub per_reply: u32,
    pub reply_max: u32,
    /// Bonus when `early_bonus_threshold` is reached by step `early_bonus_max_step`
    pub early_bonus_threshold: u32,
    pub early_bonus_max_step: u32,
    pub early_bonus_points: u32,
    pub max_score: u32,
}

impl Default for EngagementScoringConfig {
    fn default() -> Self {
        Self {
            per_open: 10,
            open_max: 30,
            per_click: 15,
            click_max: 40,
            per_reply: 20,
            reply_max: 30,
            early_bonus_threshold: 30,
            early_bonus_max_step: 2,
            early_bonus_points: 10,
            max_score: 100,
        }
    }
}

/// Response analyzer configuration loaded from the `response` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseConfig {
    pub positive_keywords: Vec<String>,
    pub negative_keywords: Vec<String>,
    pub urgency_keywords: Vec<String>,
    /// Urgency hits needed for HIGH (one hit is MEDIUM)
    pub high_urgency_min_hits: usize,
    pub engagement: EngagementScoringConfig,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            positive_keywords: words(&[
                "yes",
                "interested",
                "great",
                "thanks",
                "thank you",
                "sounds good",
                "love",
                "perfect",
                "book",
                "schedule",
                "appointment",
                "please call",
            ]),
            negative_keywords: words(&[
                "no",
                "not interested",
                "stop",
                "unsubscribe",
                "remove",
                "expensive",
                "too much",
                "never",
                "busy",
                "later",
            ]),
            urgency_keywords: words(&[
                "asap",
                "urgent",
                "today",
                "tomorrow",
                "immediately",
                "right away",
                "pain",
                "emergency",
                "soon",
                "this week",
            ]),
            high_urgency_min_hits: 2,
            engagement: EngagementScoringConfig::default(),
        }
    }
}
