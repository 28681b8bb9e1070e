//! REST implementation of [`SocialNetwork`]

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::config::NetworkConfig;
use crate::error::{NetworkError, Result};

use super::{EngagementCounts, Profile, SharePayload, SocialNetwork, TokenResponse};

pub struct RestNetwork {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    token_url: String,
    api_base: String,
    http: Client,
}

impl RestNetwork {
    pub fn new(config: &NetworkConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| NetworkError::Transport(e.to_string()))?;

        Ok(Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
            token_url: config.token_url.clone(),
            api_base: config.api_base.clone(),
            http,
        })
    }
}

#[derive(Deserialize)]
struct ProfilePicture {
    #[serde(rename = "displayImage")]
    display_image: Option<String>,
}

#[derive(Deserialize)]
struct ProfileResponse {
    id: String,
    #[serde(rename = "localizedFirstName")]
    first_name: Option<String>,
    #[serde(rename = "localizedLastName")]
    last_name: Option<String>,
    #[serde(rename = "profilePicture")]
    profile_picture: Option<ProfilePicture>,
}

#[derive(Deserialize)]
struct ShareResponse {
    id: String,
}

#[async_trait]
impl SocialNetwork for RestNetwork {
    async fn exchange_code(&self, code: &str) -> Result<TokenResponse> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", &self.redirect_uri),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
        ];

        let resp = self
            .http
            .post(&self.token_url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .form(&params)
            .send()
            .await
            .map_err(|e| NetworkError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(NetworkError::AuthExchange(format!("status {}: {}", status, body)).into());
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| NetworkError::AuthExchange(format!("malformed token response: {}", e)))?;
        Ok(token)
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<Profile> {
        let url = format!("{}/me", self.api_base);

        let resp = self
            .http
            .get(&url)
            .header("Authorization", format!("Bearer {}", access_token))
            .send()
            .await
            .map_err(|e| NetworkError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(NetworkError::ProfileFetch(format!("status {}: {}", status, body)).into());
        }

        let profile: ProfileResponse = resp
            .json()
            .await
            .map_err(|e| NetworkError::ProfileFetch(format!("malformed profile: {}", e)))?;

        let display_name = match (profile.first_name, profile.last_name) {
            (Some(first), Some(last)) => Some(format!("{} {}", first, last)),
            (Some(first), None) => Some(first),
            (None, Some(last)) => Some(last),
            (None, None) => None,
        };

        Ok(Profile {
            id: profile.id,
            display_name,
            picture_url: profile.profile_picture.and_then(|p| p.display_image),
        })
    }

    async fn create_share(&self, access_token: &str, payload: &SharePayload) -> Result<String> {
        let url = format!("{}/ugcPosts", self.api_base);

        let resp = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", access_token))
            .header("Content-Type", "application/json")
            .header("X-Restli-Protocol-Version", "2.0.0")
            .json(payload)
            .send()
            .await
            .map_err(|e| NetworkError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NetworkError::PublishRejected {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let share: ShareResponse = resp.json().await.map_err(|e| {
            NetworkError::PublishRejected {
                status: status.as_u16(),
                body: format!("malformed share response: {}", e),
            }
        })?;
        Ok(share.id)
    }

    async fn fetch_share_stats(
        &self,
        _access_token: &str,
        _external_id: &str,
    ) -> Result<Option<EngagementCounts>> {
        // The API exposes no stable statistics endpoint for member shares;
        // callers substitute placeholder metrics until one exists.
        Ok(None)
    }
}
