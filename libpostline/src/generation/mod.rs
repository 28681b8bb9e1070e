//! Content generation gateway
//!
//! Thin authenticated proxy over external text/image generation services.
//! Providers implement [`GenerationProvider`] and are tried in configured
//! order: text generation falls through to the next provider on failure,
//! image generation uses the primary only. Calls are rate-limited per user.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::config::GenerationConfig;
use crate::error::{GenerationError, Result};
use crate::rate_limiter::RateLimiter;

pub mod http;
pub mod mock;

/// Options forwarded verbatim to the provider endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_words: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

/// One external generation service
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Generate post text for a prompt
    async fn generate_text(&self, prompt: &str, options: &GenerationOptions) -> Result<String>;

    /// Generate an image for a prompt; returns the hosted image URL
    async fn generate_image(&self, prompt: &str, options: &GenerationOptions) -> Result<String>;
}

/// Result of [`Gateway::generate_complete_post`]
#[derive(Debug, Clone)]
pub struct GeneratedPost {
    pub title: String,
    pub body: String,
    /// None when image generation failed or no provider is configured
    pub image_url: Option<String>,
    pub topic: String,
}

pub struct Gateway {
    providers: Vec<Box<dyn GenerationProvider>>,
    limiter: Arc<RateLimiter>,
}

impl Gateway {
    pub fn new(providers: Vec<Box<dyn GenerationProvider>>, limiter: Arc<RateLimiter>) -> Self {
        Self { providers, limiter }
    }

    /// Build HTTP providers from configuration, preserving file order
    pub fn from_config(
        config: &GenerationConfig,
        request_timeout_secs: u64,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self> {
        let mut providers: Vec<Box<dyn GenerationProvider>> = Vec::new();
        for provider in &config.providers {
            providers.push(Box::new(http::HttpGenerationProvider::new(
                provider,
                request_timeout_secs,
            )?));
        }
        Ok(Self::new(providers, limiter))
    }

    /// Generate post text, falling through the provider list in order.
    ///
    /// Each provider gets exactly one attempt; there is no retry loop beyond
    /// the fallback sequence, which bounds worst-case latency.
    pub async fn generate_text(
        &self,
        user_id: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String> {
        let now = chrono::Utc::now().timestamp();
        self.limiter.enforce("generate.text", user_id, now)?;

        if self.providers.is_empty() {
            return Err(GenerationError::Exhausted("no providers configured".to_string()).into());
        }

        let mut failures = Vec::new();
        for provider in &self.providers {
            match provider.generate_text(prompt, options).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    warn!("Text generation via {} failed: {}", provider.name(), e);
                    failures.push(format!("{}: {}", provider.name(), e));
                }
            }
        }

        Err(GenerationError::Exhausted(failures.join("; ")).into())
    }

    /// Generate an image via the primary provider. No fallback.
    pub async fn generate_image(
        &self,
        user_id: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String> {
        let now = chrono::Utc::now().timestamp();
        self.limiter.enforce("generate.image", user_id, now)?;

        let provider = self.providers.first().ok_or_else(|| {
            GenerationError::Exhausted("no providers configured".to_string())
        })?;

        provider.generate_image(prompt, options).await
    }

    /// Generate a complete post (text plus image) from a topic.
    ///
    /// Text failure propagates; image failure degrades to a text-only post.
    pub async fn generate_complete_post(&self, user_id: &str, topic: &str) -> Result<GeneratedPost> {
        let text_prompt = format!(
            "Write an engaging social media post about \"{}\". \
             Keep it professional and under 200 words.",
            topic
        );
        let image_prompt = format!(
            "A clean, modern illustration representing \"{}\", suitable as a social media header.",
            topic
        );

        let body = self
            .generate_text(user_id, &text_prompt, &GenerationOptions::default())
            .await?;

        let image_url = match self
            .generate_image(user_id, &image_prompt, &GenerationOptions::default())
            .await
        {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("Image generation for topic \"{}\" failed: {}", topic, e);
                None
            }
        };

        Ok(GeneratedPost {
            title: title_from_topic(topic),
            body,
            image_url,
            topic: topic.to_string(),
        })
    }
}

/// Derive a presentable title from a raw topic string
fn title_from_topic(topic: &str) -> String {
    let trimmed = topic.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => trimmed.to_string(),
    }
}
