//! Due-post sweep: find scheduled posts whose time has come and drive each
//! through the publication engine
//!
//! One sweep is a single bounded batch, processed sequentially (the
//! downstream API throttles per account, so fanning out buys nothing) with
//! per-post failure isolation: one bad post never blocks the rest.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::SchedulerConfig;
use crate::credentials::CredentialStore;
use crate::error::Result;
use crate::posts::PostRepository;
use crate::publisher::Publisher;
use crate::types::Post;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepStatus {
    Published,
    Failed,
}

/// Result of one post's trip through the sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepOutcome {
    pub post_id: String,
    pub status: SweepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate report for one sweep, for observability only: all state
/// changes live on the post rows themselves
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepReport {
    pub scanned: usize,
    pub published: usize,
    pub failed: usize,
    pub outcomes: Vec<SweepOutcome>,
}

impl SweepReport {
    fn record(&mut self, outcome: SweepOutcome) {
        match outcome.status {
            SweepStatus::Published => self.published += 1,
            SweepStatus::Failed => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }
}

pub struct Sweeper {
    posts: Arc<PostRepository>,
    credentials: Arc<CredentialStore>,
    publisher: Arc<Publisher>,
    batch_size: usize,
    claim_lease_secs: i64,
}

impl Sweeper {
    pub fn new(
        posts: Arc<PostRepository>,
        credentials: Arc<CredentialStore>,
        publisher: Arc<Publisher>,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            posts,
            credentials,
            publisher,
            batch_size: config.batch_size,
            claim_lease_secs: config.claim_lease_secs,
        }
    }

    /// Run one sweep at `now`.
    ///
    /// Only the due-post claim itself can fail the sweep; everything after
    /// is caught per post and lands on the post row as a failed status with
    /// a stored reason.
    pub async fn run_sweep(&self, now: i64) -> Result<SweepReport> {
        let due = self
            .posts
            .claim_due(now, self.batch_size, self.claim_lease_secs)
            .await?;

        let mut report = SweepReport {
            scanned: due.len(),
            ..Default::default()
        };

        if due.is_empty() {
            return Ok(report);
        }

        info!("Sweep found {} due post(s)", due.len());

        for post in due {
            let outcome = self.process_post(&post, now).await;
            report.record(outcome);
        }

        info!(
            "Sweep done: {} published, {} failed of {} scanned",
            report.published, report.failed, report.scanned
        );
        Ok(report)
    }

    /// Publish one claimed post. Infallible by contract: every error path
    /// becomes a failed outcome.
    async fn process_post(&self, post: &Post, now: i64) -> SweepOutcome {
        let credential = match self.credentials.get_active_credential(&post.owner_id).await {
            Ok(Some(cred)) => cred,
            Ok(None) => {
                return self.fail_post(post, "no linked account", now).await;
            }
            Err(e) => {
                return self.fail_post(post, &e.to_string(), now).await;
            }
        };

        if credential.is_expired(now) {
            return self.fail_post(post, "token expired", now).await;
        }

        match self.publisher.publish_and_record(post, &credential, now).await {
            Ok(external_id) => SweepOutcome {
                post_id: post.id.clone(),
                status: SweepStatus::Published,
                external_id: Some(external_id),
                error: None,
            },
            Err(e) => {
                // publish_and_record already marked the post failed
                SweepOutcome {
                    post_id: post.id.clone(),
                    status: SweepStatus::Failed,
                    external_id: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn fail_post(&self, post: &Post, reason: &str, now: i64) -> SweepOutcome {
        warn!("Post {} failed: {}", post.id, reason);
        if let Err(e) = self.posts.mark_failed(&post.id, reason, now).await {
            warn!("Could not record failure for post {}: {}", post.id, e);
        }
        SweepOutcome {
            post_id: post.id.clone(),
            status: SweepStatus::Failed,
            external_id: None,
            error: Some(reason.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::AnalyticsStore;
    use crate::config::Config;
    use crate::db::Database;
    use crate::network::mock::MockNetwork;
    use tempfile::TempDir;

    async fn setup(network: MockNetwork, batch_size: usize) -> (TempDir, Sweeper, Arc<PostRepository>) {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("test.db");
        let db = Arc::new(Database::new(db_path.to_str().unwrap()).await.unwrap());
        let posts = Arc::new(PostRepository::new(Arc::clone(&db)));
        let analytics = Arc::new(AnalyticsStore::new(Arc::clone(&db)));
        let network: Arc<dyn crate::network::SocialNetwork> = Arc::new(network);
        let credentials = Arc::new(CredentialStore::new(
            Arc::clone(&db),
            Arc::clone(&network),
            Config::default_config().network,
        ));
        let publisher = Arc::new(Publisher::new(
            network,
            Arc::clone(&posts),
            analytics,
        ));
        let config = SchedulerConfig {
            batch_size,
            poll_interval: 60,
            claim_lease_secs: 600,
        };
        let sweeper = Sweeper::new(Arc::clone(&posts), credentials, publisher, &config);
        (tmp, sweeper, posts)
    }

    #[tokio::test]
    async fn test_empty_sweep() {
        let (_tmp, sweeper, _posts) = setup(MockNetwork::healthy(), 10).await;
        let report = sweeper.run_sweep(1_700_000_000).await.unwrap();

        assert_eq!(report.scanned, 0);
        assert_eq!(report.published, 0);
        assert_eq!(report.failed, 0);
        assert!(report.outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_sweep_without_credentials_marks_failed() {
        let (_tmp, sweeper, posts) = setup(MockNetwork::healthy(), 10).await;
        let now = 1_700_000_000;

        let mut post = crate::types::Post::new_draft("user-1", "t", "b");
        post.status = crate::types::PostStatus::Scheduled;
        post.scheduled_for = Some(now - 10);
        posts.create(&post).await.unwrap();

        let report = sweeper.run_sweep(now).await.unwrap();
        assert_eq!(report.scanned, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.outcomes[0].error.as_deref(), Some("no linked account"));

        let stored = posts.get_by_id(&post.id).await.unwrap().unwrap();
        assert_eq!(stored.status, crate::types::PostStatus::Failed);
        assert_eq!(stored.error_message.as_deref(), Some("no linked account"));
    }

    #[tokio::test]
    async fn test_report_serializes_to_json() {
        let report = SweepReport {
            scanned: 2,
            published: 1,
            failed: 1,
            outcomes: vec![
                SweepOutcome {
                    post_id: "a".to_string(),
                    status: SweepStatus::Published,
                    external_id: Some("urn:1".to_string()),
                    error: None,
                },
                SweepOutcome {
                    post_id: "b".to_string(),
                    status: SweepStatus::Failed,
                    external_id: None,
                    error: Some("token expired".to_string()),
                },
            ],
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["scanned"], 2);
        assert_eq!(json["outcomes"][0]["status"], "published");
        assert_eq!(json["outcomes"][1]["error"], "token expired");
        // Success rows carry no error field at all
        assert!(json["outcomes"][0].get("error").is_none());
    }
}
