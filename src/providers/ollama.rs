//! Ollama-backed draft generation

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::error::{ProviderError, Result};
use super::{DraftGenerator, prompt};
use crate::config::GeneratorConfig;
use crate::models::GenerationConstraints;

pub struct OllamaGenerator {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    stream: bool,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaGenerator {
    pub fn new(config: &GeneratorConfig) -> Result<Self> {
        // Model inference takes as long as it takes; the timeout here is a
        // generous upper bound, not a responsiveness target
        let client = Client::builder()
            .timeout(Duration::from_secs(u64::from(config.timeout_seconds)))
            .user_agent(concat!("tripsmith/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl DraftGenerator for OllamaGenerator {
    #[instrument(skip(self, constraints), fields(model = %self.model))]
    async fn generate_draft(&self, constraints: &GenerationConstraints) -> Result<String> {
        let prompt = prompt::build_prompt(constraints);
        tracing::debug!(prompt_len = prompt.len(), "requesting draft");

        let payload = GenerateRequest {
            model: &self.model,
            stream: false,
            prompt: &prompt,
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let data: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("Bad Ollama response: {e}")))?;

        tracing::debug!(response_len = data.response.len(), "draft received");
        Ok(data.response)
    }
}
