//! Mock generation provider for testing

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::error::{GenerationError, Result};

use super::{GenerationOptions, GenerationProvider};

#[derive(Clone)]
pub struct MockProvider {
    name: String,
    text_error: Option<String>,
    image_error: Option<String>,
    text_calls: Arc<Mutex<usize>>,
    image_calls: Arc<Mutex<usize>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockProvider {
    pub fn healthy(name: &str) -> Self {
        Self {
            name: name.to_string(),
            text_error: None,
            image_error: None,
            text_calls: Arc::new(Mutex::new(0)),
            image_calls: Arc::new(Mutex::new(0)),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn text_failure(name: &str, reason: &str) -> Self {
        let mut provider = Self::healthy(name);
        provider.text_error = Some(reason.to_string());
        provider
    }

    pub fn image_failure(name: &str, reason: &str) -> Self {
        let mut provider = Self::healthy(name);
        provider.image_error = Some(reason.to_string());
        provider
    }

    pub fn text_call_count(&self) -> usize {
        *self.text_calls.lock().unwrap()
    }

    pub fn image_call_count(&self) -> usize {
        *self.image_calls.lock().unwrap()
    }

    /// Prompts received by either endpoint, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_text(&self, prompt: &str, _options: &GenerationOptions) -> Result<String> {
        *self.text_calls.lock().unwrap() += 1;
        self.prompts.lock().unwrap().push(prompt.to_string());

        match &self.text_error {
            Some(reason) => Err(GenerationError::Provider {
                name: self.name.clone(),
                reason: reason.clone(),
            }
            .into()),
            None => Ok(format!("[{}] generated text for: {}", self.name, prompt)),
        }
    }

    async fn generate_image(&self, prompt: &str, _options: &GenerationOptions) -> Result<String> {
        *self.image_calls.lock().unwrap() += 1;
        self.prompts.lock().unwrap().push(prompt.to_string());

        match &self.image_error {
            Some(reason) => Err(GenerationError::Provider {
                name: self.name.clone(),
                reason: reason.clone(),
            }
            .into()),
            None => Ok(format!("https://images.example.com/{}.png", self.name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_healthy_mock() {
        let provider = MockProvider::healthy("test");

        let text = provider
            .generate_text("a prompt", &GenerationOptions::default())
            .await
            .unwrap();
        assert!(text.contains("a prompt"));
        assert_eq!(provider.text_call_count(), 1);

        let url = provider
            .generate_image("an image", &GenerationOptions::default())
            .await
            .unwrap();
        assert!(url.starts_with("https://"));
        assert_eq!(provider.image_call_count(), 1);

        assert_eq!(provider.prompts(), vec!["a prompt", "an image"]);
    }

    #[tokio::test]
    async fn test_failures_carry_provider_name() {
        let provider = MockProvider::text_failure("primary", "quota exceeded");
        let err = provider
            .generate_text("p", &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("primary"));
        assert!(err.to_string().contains("quota exceeded"));
    }
}
