use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

use crate::config::LlmConfig;
use crate::services::{Completion, OperationResult};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

/// Client for an Ollama-style `/api/generate` endpoint.
pub struct LlmClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build LLM HTTP client")?;
        Ok(Self { client, config })
    }

    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
        };

        debug!("Sending request to model endpoint: {}", self.config.api_url);

        let response = self
            .client
            .post(&self.config.api_url)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to model endpoint")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Model API error ({}): {}", status, error_body);
        }

        let body: GenerateResponse = response
            .json()
            .await
            .context("Failed to parse model response")?;

        Ok(body
            .response
            .unwrap_or_else(|| "No response from model.".to_string()))
    }
}

#[async_trait]
impl Completion for LlmClient {
    async fn complete(&self, prompt: &str) -> OperationResult {
        match self.generate(prompt).await {
            Ok(text) => OperationResult::success(text),
            Err(e) => {
                error!("AI model error: {:#}", e);
                OperationResult::failure("AI Error", &e)
            }
        }
    }
}
