//! Ollama API client.
//!
//! Defaults: `http://localhost:11434`, model `qwen2.5:7b`, 300s timeout.
//! `OLLAMA_HOST`, `OLLAMA_MODEL` and `OLLAMA_TIMEOUT` override them through
//! the configuration layer.

use super::AiBackend;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "qwen2.5:7b";
// CPU 推理 7B 模型可能需要 3-5 分钟，设置足够长的超时
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Ollama client configuration.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

/// Ollama API client.
pub struct OllamaClient {
    config: OllamaConfig,
    client: reqwest::Client,
}

/// Options for generation.
#[derive(Debug, Serialize)]
struct GenerateOptions {
    /// Temperature for sampling (0 = deterministic, 1 = creative)
    temperature: f32,
    /// Random seed for reproducibility
    seed: u32,
}

/// Generate request payload.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
    options: GenerateOptions,
}

/// Generate response.
#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub done: bool,
}

/// Models list response.
#[derive(Debug, Deserialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelInfo>,
}

/// Model information.
#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

impl OllamaClient {
    /// Create a new Ollama client with custom configuration.
    pub fn with_config(config: OllamaConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    /// Model used for generation.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Check if Ollama service is available.
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/api/tags", self.config.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// List available models.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = format!("{}/api/tags", self.config.base_url);
        let resp: ModelsResponse = self.client.get(&url).send().await?.json().await?;
        Ok(resp.models)
    }

    /// Generate text with specified format (e.g., "json").
    pub async fn generate_with_format(
        &self,
        prompt: &str,
        format: Option<&str>,
    ) -> Result<GenerateResponse> {
        let url = format!("{}/api/generate", self.config.base_url);

        // temperature=0 and a fixed seed: same input, same output
        let request = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            format,
            options: GenerateOptions {
                temperature: 0.0,
                seed: 42,
            },
        };

        let resp = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| crate::Error::AiBackend(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(crate::Error::AiBackend(format!(
                "Ollama returned status {}",
                status
            )));
        }

        // Body that is not the expected envelope is malformed output, not a transport error
        let body = resp
            .text()
            .await
            .map_err(|e| crate::Error::AiBackend(e.to_string()))?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl AiBackend for OllamaClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let resp = self.generate_with_format(prompt, Some("json")).await?;
        tracing::debug!("Ollama ({}) answered: {}", resp.model, resp.response);
        Ok(resp.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = GenerateRequest {
            model: "qwen2.5:7b",
            prompt: "hi",
            stream: false,
            format: Some("json"),
            options: GenerateOptions {
                temperature: 0.0,
                seed: 42,
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["stream"], false);
        assert_eq!(value["format"], "json");
        assert_eq!(value["options"]["seed"], 42);
    }

    #[test]
    fn test_response_envelope() {
        let resp: GenerateResponse =
            serde_json::from_str(r#"{"response":"{}","model":"m","done":true}"#).unwrap();
        assert_eq!(resp.response, "{}");
        assert!(resp.done);
    }
}
