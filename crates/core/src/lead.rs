//! Lead entity and the enums describing its funnel position
//!
//! A lead is created on first capture, mutated by every scoring, response and
//! nurture operation, and never hard-deleted: it only ever moves to a terminal
//! status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Acquisition channel a lead arrived through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadSource {
    Website,
    GoogleAds,
    Facebook,
    Instagram,
    Social,
    Referral,
    WalkIn,
    Phone,
    Email,
    Event,
    /// Unrecognised channels land here and score in the lowest tier
    Other,
}

impl LeadSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Website => "website",
            Self::GoogleAds => "google_ads",
            Self::Facebook => "facebook",
            Self::Instagram => "instagram",
            Self::Social => "social",
            Self::Referral => "referral",
            Self::WalkIn => "walk_in",
            Self::Phone => "phone",
            Self::Email => "email",
            Self::Event => "event",
            Self::Other => "other",
        }
    }

    /// Lenient parse used at the boundary; never fails
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "website" | "web" | "organic" => Self::Website,
            "google_ads" | "google" | "ppc" => Self::GoogleAds,
            "facebook" => Self::Facebook,
            "instagram" => Self::Instagram,
            "social" => Self::Social,
            "referral" => Self::Referral,
            "walk_in" | "walkin" => Self::WalkIn,
            "phone" | "call" => Self::Phone,
            "email" => Self::Email,
            "event" => Self::Event,
            _ => Self::Other,
        }
    }
}

/// Lifecycle status. `Converted` and `Lost` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadStatus {
    New,
    Scoring,
    Hot,
    Warm,
    Cold,
    Nurturing,
    Ready,
    Converted,
    Lost,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Scoring => "SCORING",
            Self::Hot => "HOT",
            Self::Warm => "WARM",
            Self::Cold => "COLD",
            Self::Nurturing => "NURTURING",
            Self::Ready => "READY",
            Self::Converted => "CONVERTED",
            Self::Lost => "LOST",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Converted | Self::Lost)
    }
}

impl std::fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Nurture sequence segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceType {
    Awareness,
    Consideration,
    Decision,
    ReEngagement,
}

impl SequenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Awareness => "awareness",
            Self::Consideration => "consideration",
            Self::Decision => "decision",
            Self::ReEngagement => "re_engagement",
        }
    }
}

/// Recommended next step for the practice team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    CallNow,
    ScheduleCall,
    BookConsultation,
    StartNurture,
    ContinueNurture,
    #[default]
    NoAction,
}

impl NextAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CallNow => "call_now",
            Self::ScheduleCall => "schedule_call",
            Self::BookConsultation => "book_consultation",
            Self::StartNurture => "start_nurture",
            Self::ContinueNurture => "continue_nurture",
            Self::NoAction => "no_action",
        }
    }
}

/// Contact fields captured with the lead
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl ContactInfo {
    /// Preferred recipient address for a channel-less lookup (email, else phone)
    pub fn primary_address(&self) -> Option<&str> {
        self.email.as_deref().or(self.phone.as_deref())
    }

    /// Trim every field; blank email or phone becomes absent
    pub fn normalized(self) -> Self {
        Self {
            first_name: self.first_name.trim().to_string(),
            last_name: non_blank(self.last_name),
            email: non_blank(self.email),
            phone: non_blank(self.phone),
        }
    }

    pub fn has_address(&self) -> bool {
        self.email.is_some() || self.phone.is_some()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Raw behavioural counters fed by site analytics and messaging
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BehaviorCounters {
    #[serde(default)]
    pub site_visits: u32,
    #[serde(default)]
    pub page_views: u32,
    #[serde(default)]
    pub time_on_site_secs: u32,
    #[serde(default)]
    pub form_abandoned: bool,
    #[serde(default)]
    pub emails_opened: u32,
    #[serde(default)]
    pub links_clicked: u32,
    #[serde(default)]
    pub replies_received: u32,
    #[serde(default)]
    pub last_page_viewed: Option<String>,
}

impl BehaviorCounters {
    /// Fold a newer observation into the stored counters.
    ///
    /// Counters only grow; the newest last-page wins.
    pub fn merge(&mut self, other: &BehaviorCounters) {
        self.site_visits = self.site_visits.max(other.site_visits);
        self.page_views = self.page_views.max(other.page_views);
        self.time_on_site_secs = self.time_on_site_secs.max(other.time_on_site_secs);
        self.form_abandoned |= other.form_abandoned;
        self.emails_opened = self.emails_opened.max(other.emails_opened);
        self.links_clicked = self.links_clicked.max(other.links_clicked);
        self.replies_received = self.replies_received.max(other.replies_received);
        if other.last_page_viewed.is_some() {
            self.last_page_viewed = other.last_page_viewed.clone();
        }
    }
}

/// Counters that can be bumped atomically by the repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadCounter {
    EmailsOpened,
    LinksClicked,
    RepliesReceived,
}

/// Point-in-time copy of a scoring result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSnapshot {
    pub at: DateTime<Utc>,
    pub quality: u32,
    pub urgency: u32,
    pub conversion_probability: f64,
}

/// Position inside a nurture sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NurtureState {
    pub sequence: SequenceType,
    /// Last step sent (1-based)
    pub step_number: u32,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub paused_at: Option<DateTime<Utc>>,
}

impl NurtureState {
    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }
}

/// Prospective patient tracked through the acquisition funnel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub practice_id: Uuid,
    pub contact: ContactInfo,
    pub source: LeadSource,
    pub behavior: BehaviorCounters,

    // Derived scoring fields
    pub quality_score: u32,
    pub urgency_score: u32,
    pub conversion_probability: f64,
    pub score_factors: BTreeMap<String, u32>,
    pub intent_signals: Vec<String>,
    pub score_history: Vec<ScoreSnapshot>,

    pub status: LeadStatus,
    pub nurture: Option<NurtureState>,

    // Assignment
    pub assigned_staff_id: Option<Uuid>,
    pub priority_rank: Option<u8>,
    pub next_action: NextAction,
    pub next_action_date: Option<DateTime<Utc>>,

    pub last_analyzed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub converted_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency token, bumped by the repository on every write
    pub version: u64,
}

impl Lead {
    pub fn new(
        practice_id: Uuid,
        source: LeadSource,
        contact: ContactInfo,
        behavior: BehaviorCounters,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            practice_id,
            contact,
            source,
            behavior,
            quality_score: 0,
            urgency_score: 0,
            conversion_probability: 0.01,
            score_factors: BTreeMap::new(),
            intent_signals: Vec::new(),
            score_history: Vec::new(),
            status: LeadStatus::New,
            nurture: None,
            assigned_staff_id: None,
            priority_rank: None,
            next_action: NextAction::NoAction,
            next_action_date: None,
            last_analyzed_at: None,
            created_at: now,
            updated_at: now,
            converted_at: None,
            version: 0,
        }
    }

    /// Whole days since capture, never negative
    pub fn days_since_created(&self, now: DateTime<Utc>) -> u32 {
        (now - self.created_at).num_days().max(0) as u32
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// True when email or phone matches (case-insensitive email, digits-only phone)
    pub fn matches_contact(&self, email: Option<&str>, phone: Option<&str>) -> bool {
        let email_match = match (self.contact.email.as_deref(), email) {
            (Some(a), Some(b)) => {
                let a = a.trim();
                !a.is_empty() && a.eq_ignore_ascii_case(b.trim())
            }
            _ => false,
        };
        let phone_match = match (self.contact.phone.as_deref(), phone) {
            (Some(a), Some(b)) => {
                let a = normalize_phone(a);
                !a.is_empty() && a == normalize_phone(b)
            }
            _ => false,
        };
        email_match || phone_match
    }

    /// Append a snapshot, keeping only the newest `cap` entries
    pub fn push_snapshot(&mut self, snapshot: ScoreSnapshot, cap: usize) {
        self.score_history.push(snapshot);
        if self.score_history.len() > cap {
            let excess = self.score_history.len() - cap;
            self.score_history.drain(..excess);
        }
    }
}

fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn lead() -> Lead {
        Lead::new(
            Uuid::new_v4(),
            LeadSource::Website,
            ContactInfo {
                first_name: "Ana".into(),
                email: Some("Ana@Example.com".into()),
                phone: Some("(555) 010-2000".into()),
                ..Default::default()
            },
            BehaviorCounters::default(),
            Utc::now(),
        )
    }

    #[test]
    fn test_source_parse_falls_back_to_other() {
        assert_eq!(LeadSource::parse("Referral"), LeadSource::Referral);
        assert_eq!(LeadSource::parse("google-ads"), LeadSource::GoogleAds);
        assert_eq!(LeadSource::parse("billboard"), LeadSource::Other);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(LeadStatus::Converted.is_terminal());
        assert!(LeadStatus::Lost.is_terminal());
        assert!(!LeadStatus::Hot.is_terminal());
        assert!(!LeadStatus::Nurturing.is_terminal());
    }

    #[test]
    fn test_matches_contact() {
        let lead = lead();
        assert!(lead.matches_contact(Some("ana@example.com"), None));
        assert!(lead.matches_contact(None, Some("555-010-2000")));
        assert!(!lead.matches_contact(Some("other@example.com"), Some("555 999 0000")));
        assert!(!lead.matches_contact(None, None));
    }

    #[test]
    fn test_blank_email_never_matches() {
        let mut lead = lead();
        lead.contact.email = Some(String::new());
        assert!(!lead.matches_contact(Some(""), None));
        assert!(!lead.matches_contact(Some("  "), Some("555-222-2222")));
    }

    #[test]
    fn test_normalized_drops_blank_addresses() {
        let contact = ContactInfo {
            first_name: " Bo ".into(),
            last_name: Some("".into()),
            email: Some("   ".into()),
            phone: Some(" 555-2222 ".into()),
        }
        .normalized();
        assert_eq!(contact.first_name, "Bo");
        assert_eq!(contact.last_name, None);
        assert_eq!(contact.email, None);
        assert_eq!(contact.phone.as_deref(), Some("555-2222"));
        assert!(contact.has_address());
        assert!(!ContactInfo::default().normalized().has_address());
    }

    #[test]
    fn test_score_history_is_bounded() {
        let mut lead = lead();
        let now = Utc::now();
        for i in 0..35 {
            lead.push_snapshot(
                ScoreSnapshot {
                    at: now + Duration::minutes(i),
                    quality: i as u32,
                    urgency: 0,
                    conversion_probability: 0.1,
                },
                30,
            );
        }
        assert_eq!(lead.score_history.len(), 30);
        assert_eq!(lead.score_history.first().map(|s| s.quality), Some(5));
        assert_eq!(lead.score_history.last().map(|s| s.quality), Some(34));
    }

    #[test]
    fn test_behavior_merge_keeps_maximum() {
        let mut stored = BehaviorCounters {
            site_visits: 4,
            page_views: 12,
            last_page_viewed: Some("/services".into()),
            ..Default::default()
        };
        stored.merge(&BehaviorCounters {
            site_visits: 6,
            page_views: 3,
            form_abandoned: true,
            last_page_viewed: Some("/pricing".into()),
            ..Default::default()
        });
        assert_eq!(stored.site_visits, 6);
        assert_eq!(stored.page_views, 12);
        assert!(stored.form_abandoned);
        assert_eq!(stored.last_page_viewed.as_deref(), Some("/pricing"));
    }
}
