//! Mock social network for testing
//!
//! A configurable [`SocialNetwork`] double that can simulate exchange,
//! profile, and publish failures, script per-call publish outcomes, and
//! record the payloads it was handed. Available in all builds so
//! integration tests can wire it into the real pipeline.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::error::{NetworkError, Result};

use super::{EngagementCounts, Profile, SharePayload, SocialNetwork, TokenResponse};

/// One scripted outcome for a `create_share` call
#[derive(Debug, Clone)]
pub enum PublishOutcome {
    /// Succeed with this external id
    Id(String),
    /// Fail with this error
    Error(NetworkError),
}

#[derive(Clone)]
pub struct MockNetwork {
    exchange_result: Option<NetworkError>,
    profile_result: Option<NetworkError>,
    profile: Profile,
    token: TokenResponse,
    stats: Option<EngagementCounts>,
    /// Outcomes consumed per publish call; when empty, publishing succeeds
    /// with a generated id
    publish_script: Arc<Mutex<VecDeque<PublishOutcome>>>,
    exchange_calls: Arc<Mutex<usize>>,
    profile_calls: Arc<Mutex<usize>>,
    publish_calls: Arc<Mutex<usize>>,
    published_payloads: Arc<Mutex<Vec<SharePayload>>>,
}

impl MockNetwork {
    /// A network where every operation succeeds
    pub fn healthy() -> Self {
        Self {
            exchange_result: None,
            profile_result: None,
            profile: Profile {
                id: "member-1".to_string(),
                display_name: Some("Test Member".to_string()),
                picture_url: Some("https://cdn.example.com/avatar.png".to_string()),
            },
            token: TokenResponse {
                access_token: "mock-token".to_string(),
                expires_in: 5_184_000,
                scope: "w_member_social".to_string(),
            },
            stats: None,
            publish_script: Arc::new(Mutex::new(VecDeque::new())),
            exchange_calls: Arc::new(Mutex::new(0)),
            profile_calls: Arc::new(Mutex::new(0)),
            publish_calls: Arc::new(Mutex::new(0)),
            published_payloads: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fail the code exchange
    pub fn exchange_failure(reason: &str) -> Self {
        let mut network = Self::healthy();
        network.exchange_result = Some(NetworkError::AuthExchange(reason.to_string()));
        network
    }

    /// Exchange succeeds, profile fetch fails
    pub fn profile_failure(reason: &str) -> Self {
        let mut network = Self::healthy();
        network.profile_result = Some(NetworkError::ProfileFetch(reason.to_string()));
        network
    }

    /// Every publish call is rejected with this status and body
    pub fn publish_rejected(status: u16, body: &str) -> Self {
        let network = Self::healthy();
        network.publish_script.lock().unwrap().push_back(PublishOutcome::Error(
            NetworkError::PublishRejected {
                status,
                body: body.to_string(),
            },
        ));
        network
    }

    /// Script the outcomes of successive publish calls
    pub fn with_publish_script(outcomes: Vec<PublishOutcome>) -> Self {
        let network = Self::healthy();
        *network.publish_script.lock().unwrap() = outcomes.into();
        network
    }

    /// Serve these engagement counts from `fetch_share_stats`
    pub fn with_stats(mut self, stats: EngagementCounts) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Override the profile returned by `fetch_profile`
    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    pub fn exchange_call_count(&self) -> usize {
        *self.exchange_calls.lock().unwrap()
    }

    pub fn profile_call_count(&self) -> usize {
        *self.profile_calls.lock().unwrap()
    }

    pub fn publish_call_count(&self) -> usize {
        *self.publish_calls.lock().unwrap()
    }

    /// Payloads handed to `create_share`, in call order
    pub fn published_payloads(&self) -> Vec<SharePayload> {
        self.published_payloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl SocialNetwork for MockNetwork {
    async fn exchange_code(&self, _code: &str) -> Result<TokenResponse> {
        *self.exchange_calls.lock().unwrap() += 1;
        match &self.exchange_result {
            Some(err) => Err(err.clone().into()),
            None => Ok(self.token.clone()),
        }
    }

    async fn fetch_profile(&self, _access_token: &str) -> Result<Profile> {
        *self.profile_calls.lock().unwrap() += 1;
        match &self.profile_result {
            Some(err) => Err(err.clone().into()),
            None => Ok(self.profile.clone()),
        }
    }

    async fn create_share(&self, _access_token: &str, payload: &SharePayload) -> Result<String> {
        *self.publish_calls.lock().unwrap() += 1;
        self.published_payloads.lock().unwrap().push(payload.clone());

        let scripted = self.publish_script.lock().unwrap().pop_front();
        match scripted {
            Some(PublishOutcome::Id(id)) => Ok(id),
            Some(PublishOutcome::Error(err)) => Err(err.into()),
            None => Ok(format!("urn:share:mock-{}", uuid::Uuid::new_v4())),
        }
    }

    async fn fetch_share_stats(
        &self,
        _access_token: &str,
        _external_id: &str,
    ) -> Result<Option<EngagementCounts>> {
        Ok(self.stats.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_healthy_mock_round_trip() {
        let network = MockNetwork::healthy();

        let token = network.exchange_code("code-1").await.unwrap();
        assert_eq!(token.access_token, "mock-token");
        assert_eq!(network.exchange_call_count(), 1);

        let profile = network.fetch_profile(&token.access_token).await.unwrap();
        assert_eq!(profile.id, "member-1");

        let payload = SharePayload::new("urn:li:person:member-1", "hi", None);
        let id = network.create_share(&token.access_token, &payload).await.unwrap();
        assert!(id.starts_with("urn:share:mock-"));
        assert_eq!(network.publish_call_count(), 1);
        assert_eq!(network.published_payloads().len(), 1);
    }

    #[tokio::test]
    async fn test_exchange_failure() {
        let network = MockNetwork::exchange_failure("invalid code");
        let err = network.exchange_code("bad").await.unwrap_err();
        assert!(err.to_string().contains("invalid code"));
    }

    #[tokio::test]
    async fn test_publish_script_consumed_in_order() {
        let network = MockNetwork::with_publish_script(vec![
            PublishOutcome::Error(NetworkError::Transport("connection reset".to_string())),
            PublishOutcome::Id("urn:share:second".to_string()),
        ]);

        let payload = SharePayload::new("urn:li:person:x", "one", None);
        assert!(network.create_share("t", &payload).await.is_err());
        assert_eq!(
            network.create_share("t", &payload).await.unwrap(),
            "urn:share:second"
        );
        // Script exhausted: falls back to generated ids
        assert!(network.create_share("t", &payload).await.is_ok());
    }

    #[tokio::test]
    async fn test_stats_passthrough() {
        let network = MockNetwork::healthy().with_stats(EngagementCounts {
            impressions: 100,
            clicks: 5,
            likes: 10,
            comments: 2,
            shares: 1,
        });

        let stats = network.fetch_share_stats("t", "urn:1").await.unwrap().unwrap();
        assert_eq!(stats.impressions, 100);

        let bare = MockNetwork::healthy();
        assert!(bare.fetch_share_stats("t", "urn:1").await.unwrap().is_none());
    }
}
