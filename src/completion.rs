use crate::config::CompletionConfig;
use crate::error::{Result, FinbotError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Text-completion backend: one prompt in, one reply out.
pub trait Completer {
    fn complete(&self, prompt: &str) -> impl Future<Output = Result<String>> + Send;
}

/// Request body for an Ollama-style `/api/generate` endpoint
#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

/// Completion client for an Ollama-compatible generate endpoint
///
/// Non-streaming, one request per prompt, bounded by the configured timeout.
pub struct OllamaClient {
    client: Client,
    url: String,
    model: String,
}

impl OllamaClient {
    /// Create a client for `url` (the full generate endpoint) and `model`
    pub fn new(url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FinbotError::Completion(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
            model: model.into(),
        })
    }

    pub fn from_config(config: &CompletionConfig) -> Result<Self> {
        Self::new(
            config.url.clone(),
            config.model.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Completer for OllamaClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let start = std::time::Instant::now();
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| FinbotError::Completion(format!("Network error: {}", e)))?;

        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            return Err(FinbotError::Completion(format!(
                "Backend error {}: {}",
                status, body
            )));
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| FinbotError::Completion(format!("Failed to parse response: {}", e)))?;

        log::debug!("Completion call took {:?}", start.elapsed());

        result
            .response
            .ok_or_else(|| FinbotError::Completion("No response from model".to_string()))
    }
}
