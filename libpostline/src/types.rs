//! Core types for Postline

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A post authored by a user, possibly AI-generated, possibly scheduled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub body: String,
    pub category: Option<String>,
    pub status: PostStatus,
    pub scheduled_for: Option<i64>,
    pub published_to_external: bool,
    pub external_id: Option<String>,
    pub image_url: Option<String>,
    pub ai_generated: bool,
    pub source_topic: Option<String>,
    pub error_message: Option<String>,
    pub claimed_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
    pub published_at: Option<i64>,
}

impl Post {
    /// Create a new draft owned by `owner_id`
    pub fn new_draft(owner_id: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            title: title.into(),
            body: body.into(),
            category: None,
            status: PostStatus::Draft,
            scheduled_for: None,
            published_to_external: false,
            external_id: None,
            image_url: None,
            ai_generated: false,
            source_topic: None,
            error_message: None,
            claimed_at: None,
            created_at: now,
            updated_at: now,
            published_at: None,
        }
    }

    /// True when the post is due for publication at `now`
    pub fn is_due(&self, now: i64) -> bool {
        self.status == PostStatus::Scheduled
            && !self.published_to_external
            && self.scheduled_for.is_some_and(|t| t <= now)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PostStatus {
    Draft,
    Scheduled,
    Published,
    Failed,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Scheduled => "scheduled",
            Self::Published => "published",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "scheduled" => Some(Self::Scheduled),
            "published" => Some(Self::Published),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stored OAuth credential granting publish access on behalf of a user.
///
/// At most one active row exists per user; disconnecting deactivates the row
/// rather than deleting it, so the connection history stays auditable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub id: Option<i64>,
    pub user_id: String,
    /// The social network's member identifier for this user
    pub external_id: String,
    pub access_token: String,
    pub scope: String,
    pub expires_at: i64,
    pub is_active: bool,
    pub display_name: Option<String>,
    pub picture_url: Option<String>,
    pub connected_at: i64,
    pub disconnected_at: Option<i64>,
}

impl Credential {
    /// True when `now` has reached the token expiry. Equality counts as expired.
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

/// Engagement metrics for one published post (1:1 via post id)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analytics {
    pub post_id: String,
    pub impressions: i64,
    pub clicks: i64,
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
    pub engagement_rate: f64,
    pub last_refreshed: i64,
}

impl Analytics {
    /// A zero-valued record, created at publish time
    pub fn zeroed(post_id: impl Into<String>, now: i64) -> Self {
        Self {
            post_id: post_id.into(),
            impressions: 0,
            clicks: 0,
            likes: 0,
            comments: 0,
            shares: 0,
            engagement_rate: 0.0,
            last_refreshed: now,
        }
    }

    /// Recompute the engagement rate from the current counts.
    ///
    /// Exactly 0.0 when there are no impressions; clamped to [0, 1].
    pub fn recompute_rate(&mut self) {
        self.engagement_rate = if self.impressions <= 0 {
            0.0
        } else {
            let reactions = (self.likes + self.comments + self.shares) as f64;
            (reactions / self.impressions as f64).clamp(0.0, 1.0)
        };
    }
}
