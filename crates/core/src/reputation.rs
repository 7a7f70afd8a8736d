//! Review platform snapshots
//!
//! Snapshots are immutable: a new one is recorded for every capture and trend
//! is derived by comparing snapshots over time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Review platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewPlatform {
    Google,
    Yelp,
    Facebook,
    Healthgrades,
    Zocdoc,
    Other,
}

impl ReviewPlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Yelp => "yelp",
            Self::Facebook => "facebook",
            Self::Healthgrades => "healthgrades",
            Self::Zocdoc => "zocdoc",
            Self::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "google" => Self::Google,
            "yelp" => Self::Yelp,
            "facebook" => Self::Facebook,
            "healthgrades" => Self::Healthgrades,
            "zocdoc" => Self::Zocdoc,
            _ => Self::Other,
        }
    }
}

/// Count of reviews per star rating
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingBreakdown {
    #[serde(default)]
    pub five: u32,
    #[serde(default)]
    pub four: u32,
    #[serde(default)]
    pub three: u32,
    #[serde(default)]
    pub two: u32,
    #[serde(default)]
    pub one: u32,
}

impl RatingBreakdown {
    pub fn total(&self) -> u32 {
        self.five + self.four + self.three + self.two + self.one
    }
}

/// Dated metrics for one platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReputationMetric {
    pub id: Uuid,
    pub practice_id: Uuid,
    pub platform: ReviewPlatform,
    /// Average star rating, 0.0-5.0
    pub rating: f64,
    pub review_count: u32,
    #[serde(default)]
    pub breakdown: RatingBreakdown,
    /// Share of reviews the practice replied to, 0.0-1.0
    #[serde(default)]
    pub response_rate: f64,
    /// Mean review sentiment in [-1.0, 1.0]; absent when not analysed
    #[serde(default)]
    pub sentiment: Option<f64>,
    #[serde(default)]
    pub has_negative_review: bool,
    pub captured_at: DateTime<Utc>,
}
