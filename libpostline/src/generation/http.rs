//! HTTP implementation of [`GenerationProvider`]

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::config::ProviderConfig;
use crate::error::{GenerationError, Result};

use super::{GenerationOptions, GenerationProvider};

pub struct HttpGenerationProvider {
    name: String,
    text_url: String,
    image_url: String,
    api_key: String,
    http: Client,
}

impl HttpGenerationProvider {
    pub fn new(config: &ProviderConfig, request_timeout_secs: u64) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(request_timeout_secs))
            .build()
            .map_err(|e| GenerationError::Provider {
                name: config.name.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            name: config.name.clone(),
            text_url: config.text_url.clone(),
            image_url: config.image_url.clone(),
            api_key: config.api_key.clone(),
            http,
        })
    }

    async fn post_prompt(
        &self,
        url: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<serde_json::Value> {
        let body = json!({
            "prompt": prompt,
            "options": options,
        });

        let resp = self
            .http
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Provider {
                name: self.name.clone(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Provider {
                name: self.name.clone(),
                reason: format!("status {}: {}", status.as_u16(), text),
            }
            .into());
        }

        resp.json().await.map_err(|e| {
            GenerationError::Provider {
                name: self.name.clone(),
                reason: format!("malformed response: {}", e),
            }
            .into()
        })
    }
}

#[derive(Deserialize)]
struct TextResponse {
    content: String,
}

#[derive(Deserialize)]
struct ImageResponse {
    #[serde(rename = "imageUrl")]
    image_url: String,
}

#[async_trait]
impl GenerationProvider for HttpGenerationProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_text(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        let value = self.post_prompt(&self.text_url, prompt, options).await?;
        let parsed: TextResponse =
            serde_json::from_value(value).map_err(|e| GenerationError::Provider {
                name: self.name.clone(),
                reason: format!("missing content field: {}", e),
            })?;
        Ok(parsed.content)
    }

    async fn generate_image(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        let value = self.post_prompt(&self.image_url, prompt, options).await?;
        let parsed: ImageResponse =
            serde_json::from_value(value).map_err(|e| GenerationError::Provider {
                name: self.name.clone(),
                reason: format!("missing imageUrl field: {}", e),
            })?;
        Ok(parsed.image_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_wire_shapes() {
        let text: TextResponse = serde_json::from_str(r#"{"content":"hello"}"#).unwrap();
        assert_eq!(text.content, "hello");

        let image: ImageResponse =
            serde_json::from_str(r#"{"imageUrl":"https://img.example.com/1.png"}"#).unwrap();
        assert_eq!(image.image_url, "https://img.example.com/1.png");
    }

    #[test]
    fn test_provider_construction() {
        let config = ProviderConfig {
            name: "primary".to_string(),
            text_url: "https://gen.example.com/text".to_string(),
            image_url: "https://gen.example.com/image".to_string(),
            api_key: "key".to_string(),
        };
        let provider = HttpGenerationProvider::new(&config, 10).unwrap();
        assert_eq!(provider.name(), "primary");
    }
}
