//! Social network abstraction
//!
//! The downstream social network is reached through the [`SocialNetwork`]
//! trait so the publication pipeline can be exercised against a test double.
//! `rest` implements the trait over the real REST API; `mock` provides a
//! configurable double for tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub mod mock;
pub mod rest;

/// Token payload returned by the OAuth code exchange
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
    pub scope: String,
}

/// Minimal profile of the connected member
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    pub id: String,
    pub display_name: Option<String>,
    pub picture_url: Option<String>,
}

/// Engagement counts for one published share
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EngagementCounts {
    pub impressions: i64,
    pub clicks: i64,
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
}

/// Media category field of the share payload. The downstream API requires
/// this field to reflect whether media is attached; it is not optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaCategory {
    #[serde(rename = "NONE")]
    None,
    #[serde(rename = "IMAGE")]
    Image,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareMedia {
    pub status: String,
    #[serde(rename = "originalUrl")]
    pub original_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareCommentary {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareContent {
    #[serde(rename = "shareCommentary")]
    pub share_commentary: ShareCommentary,
    #[serde(rename = "shareMediaCategory")]
    pub share_media_category: MediaCategory,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<ShareMedia>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecificContent {
    #[serde(rename = "shareContent")]
    pub share_content: ShareContent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Visibility {
    #[serde(rename = "memberNetworkVisibility")]
    pub member_network_visibility: String,
}

/// The nested body the downstream "create share" endpoint expects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharePayload {
    pub author: String,
    #[serde(rename = "lifecycleState")]
    pub lifecycle_state: String,
    #[serde(rename = "specificContent")]
    pub specific_content: SpecificContent,
    pub visibility: Visibility,
}

impl SharePayload {
    /// Build a public share for `author_urn`.
    ///
    /// `share_media_category` must be IMAGE exactly when an image is
    /// attached and NONE otherwise; `media` is omitted entirely when there
    /// is no image.
    pub fn new(author_urn: &str, text: &str, image_url: Option<&str>) -> Self {
        let (category, media) = match image_url {
            Some(url) => (
                MediaCategory::Image,
                vec![ShareMedia {
                    status: "READY".to_string(),
                    original_url: url.to_string(),
                }],
            ),
            None => (MediaCategory::None, Vec::new()),
        };

        Self {
            author: author_urn.to_string(),
            lifecycle_state: "PUBLISHED".to_string(),
            specific_content: SpecificContent {
                share_content: ShareContent {
                    share_commentary: ShareCommentary {
                        text: text.to_string(),
                    },
                    share_media_category: category,
                    media,
                },
            },
            visibility: Visibility {
                member_network_visibility: "PUBLIC".to_string(),
            },
        }
    }
}

/// Unified interface to the downstream social network.
///
/// Implementations are stateless: the access token is a parameter of every
/// authenticated call, never held by the client.
#[async_trait]
pub trait SocialNetwork: Send + Sync {
    /// Exchange a one-time authorization code for an access token
    async fn exchange_code(&self, code: &str) -> Result<TokenResponse>;

    /// Fetch the minimal profile of the token's owner
    async fn fetch_profile(&self, access_token: &str) -> Result<Profile>;

    /// Create a share; returns the externally assigned post identifier
    async fn create_share(&self, access_token: &str, payload: &SharePayload) -> Result<String>;

    /// Fetch engagement counts for a published share.
    ///
    /// Returns `Ok(None)` when the network offers no statistics endpoint
    /// for the share; callers fall back to placeholder metrics.
    async fn fetch_share_stats(
        &self,
        access_token: &str,
        external_id: &str,
    ) -> Result<Option<EngagementCounts>>;
}
