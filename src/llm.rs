//! Language-model collaborator boundary.
//!
//! Defines the [`LanguageModel`] trait and the concrete [`OllamaGenerator`],
//! which calls a local Ollama server's generate endpoint. Structured calls
//! request Ollama's JSON output format so the response parses as a single
//! JSON object; free-form calls return plain text. Both use the same bounded
//! backoff as the embedding client.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::LlmConfig;

/// Prompt → text, or prompt → structured JSON, or failure.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Free-form completion.
    async fn complete(&self, prompt: &str) -> Result<String>;
    /// Completion constrained to a single JSON object.
    async fn complete_json(&self, prompt: &str) -> Result<serde_json::Value>;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Generation client backed by a local Ollama server.
pub struct OllamaGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    max_retries: u32,
}

impl OllamaGenerator {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_retries: config.max_retries,
        })
    }

    async fn generate(&self, prompt: &str, format: Option<&str>) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            format,
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self.client.post(&url).json(&request).send().await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let parsed: GenerateResponse = response.json().await?;
                        return Ok(parsed.response);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err =
                            Some(anyhow::anyhow!("Ollama API error {}: {}", status, body_text));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("Ollama API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Generation failed after retries")))
    }
}

#[async_trait]
impl LanguageModel for OllamaGenerator {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.generate(prompt, None).await
    }

    async fn complete_json(&self, prompt: &str) -> Result<serde_json::Value> {
        let text = self.generate(prompt, Some("json")).await?;
        serde_json::from_str(&text)
            .map_err(|e| anyhow::anyhow!("model returned invalid JSON: {}", e))
    }
}
