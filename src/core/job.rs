//! Delivery job model and queue score encoding.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SchedulerError;

/// Weight applied to the priority tier when computing a queue score.
///
/// Dwarfs any clamped timestamp, so a higher tier always dequeues first.
pub const PRIORITY_WEIGHT: i64 = 1_000_000_000_000;

/// Destination publishing platform.
///
/// Unknown tags survive a decode so the dispatcher can report them as an
/// unsupported-platform failure instead of silently dropping the job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Platform {
    /// Facebook and Instagram via the Graph API.
    Meta,
    /// X (formerly Twitter).
    X,
    /// LinkedIn.
    LinkedIn,
    /// TikTok.
    TikTok,
    /// Any tag this build does not know about.
    Other(String),
}

impl Platform {
    /// Every platform with a known delivery capability.
    pub const KNOWN: [Self; 4] = [Self::Meta, Self::X, Self::LinkedIn, Self::TikTok];

    /// Wire tag for the platform.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Meta => "META",
            Self::X => "X",
            Self::LinkedIn => "LINKEDIN",
            Self::TikTok => "TIKTOK",
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for Platform {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "META" => Self::Meta,
            "X" => Self::X,
            "LINKEDIN" => Self::LinkedIn,
            "TIKTOK" => Self::TikTok,
            _ => Self::Other(tag),
        }
    }
}

impl From<&str> for Platform {
    fn from(tag: &str) -> Self {
        Self::from(tag.to_string())
    }
}

impl From<Platform> for String {
    fn from(platform: Platform) -> Self {
        match platform {
            Platform::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workspace subscription tier, the source of a job's priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkspaceTier {
    /// Free or starter plans.
    Free,
    /// Professional plan.
    Professional,
    /// Enterprise plan.
    Enterprise,
}

impl WorkspaceTier {
    /// Delivery priority granted by the tier.
    pub const fn priority(self) -> Priority {
        match self {
            Self::Enterprise => Priority::High,
            Self::Professional => Priority::Normal,
            Self::Free => Priority::Low,
        }
    }
}

/// Delivery priority tier (3 = highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Priority {
    /// Tier 1.
    Low = 1,
    /// Tier 2.
    Normal = 2,
    /// Tier 3.
    High = 3,
}

impl Priority {
    /// Numeric tier value.
    pub const fn value(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Priority {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Low),
            2 => Ok(Self::Normal),
            3 => Ok(Self::High),
            other => Err(format!("priority must be 1, 2 or 3, got {other}")),
        }
    }
}

impl From<Priority> for u8 {
    fn from(priority: Priority) -> Self {
        priority.value()
    }
}

/// Identity of a delivery obligation: one post fanned out to one platform config.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobKey {
    /// Source post identifier.
    pub post_id: String,
    /// Per-platform configuration identifier.
    pub platform_config_id: String,
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.post_id, self.platform_config_id)
    }
}

/// One post x platform-configuration delivery obligation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Source post; shared by every platform config of the post.
    pub post_id: String,
    /// Per-platform configuration this job delivers.
    pub platform_config_id: String,
    /// Destination platform.
    pub platform: Platform,
    /// Destination account.
    pub account_id: String,
    /// Text body after override resolution.
    pub content: String,
    /// Media references in attachment order.
    #[serde(default)]
    pub media_urls: Vec<String>,
    /// Hashtags from the platform config.
    #[serde(default)]
    pub hashtags: Vec<String>,
    /// Due time; drives eligibility and ordering.
    pub scheduled_at: DateTime<Utc>,
    /// Fixed at admission.
    pub priority: Priority,
    /// Failed delivery attempts so far.
    #[serde(default)]
    pub retry_count: u32,
}

impl Job {
    /// Identity used for admission claims.
    pub fn key(&self) -> JobKey {
        JobKey {
            post_id: self.post_id.clone(),
            platform_config_id: self.platform_config_id.clone(),
        }
    }

    /// Ordering score; higher dequeues first. Independent of `retry_count`.
    pub fn score(&self) -> i64 {
        score(self.priority, self.scheduled_at)
    }

    /// Encode the job as a queue member.
    pub fn encode(&self) -> Result<String, SchedulerError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a queue member.
    pub fn decode(raw: &str) -> Result<Self, SchedulerError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// `priority * 10^12 - scheduled_at` in unix seconds.
///
/// The timestamp term is clamped to `[0, PRIORITY_WEIGHT)` so a tier can never
/// be overtaken by a lower one, whatever the timestamp. Within a tier, all
/// pre-epoch times therefore share one score and dequeue in admission order.
pub fn score(priority: Priority, scheduled_at: DateTime<Utc>) -> i64 {
    let seconds = scheduled_at.timestamp().clamp(0, PRIORITY_WEIGHT - 1);
    i64::from(priority.value()) * PRIORITY_WEIGHT - seconds
}
