//! Ollama backend implementation.
//!
//! Talks to a local Ollama server over its native HTTP API. Two
//! endpoints are used: `/api/chat` for the conversation exchange (long
//! timeout) and `/api/tags` for the model list, which doubles as the
//! health check (short timeout).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::backend::ChatBackend;
use crate::error::{LlmError, Result};
use crate::types::{ChatRequest, ChatResponse};

/// Default Ollama base URL.
const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Chat endpoint path.
const API_CHAT: &str = "/api/chat";

/// Model list endpoint path.
const API_TAGS: &str = "/api/tags";

/// Default timeout for a full chat exchange, tool round-trips included.
const DEFAULT_CHAT_TIMEOUT_SECS: u64 = 120;

/// Default timeout for the lightweight model-list call.
const DEFAULT_HEALTH_TIMEOUT_SECS: u64 = 5;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for the Ollama backend.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Base URL of the Ollama server.
    pub base_url: String,

    /// Model to run (e.g. `qwen3`, `gemma3`).
    pub model: String,

    /// Timeout for chat requests.
    pub chat_timeout: Duration,

    /// Timeout for the model-list/health request.
    pub health_timeout: Duration,
}

impl OllamaConfig {
    /// Create a config for a local Ollama server with the given model.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
            chat_timeout: Duration::from_secs(DEFAULT_CHAT_TIMEOUT_SECS),
            health_timeout: Duration::from_secs(DEFAULT_HEALTH_TIMEOUT_SECS),
        }
    }

    /// Create a config from the `OLLAMA_HOST` environment variable,
    /// falling back to localhost.
    pub fn from_env(model: impl Into<String>) -> Self {
        let mut config = Self::new(model);
        if let Ok(host) = std::env::var("OLLAMA_HOST") {
            config.base_url = host;
        }
        config
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the chat request timeout.
    pub fn with_chat_timeout(mut self, timeout: Duration) -> Self {
        self.chat_timeout = timeout;
        self
    }

    /// Set the health check timeout.
    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Model list
// ─────────────────────────────────────────────────────────────────────────────

/// An installed model reported by `/api/tags`.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelInfo {
    /// Model name including tag (e.g. `qwen3:8b`).
    pub name: String,
    /// On-disk size in bytes.
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Ollama Backend
// ─────────────────────────────────────────────────────────────────────────────

/// Chat backend for a local Ollama server.
pub struct OllamaBackend {
    client: Client,
    config: OllamaConfig,
}

impl OllamaBackend {
    /// Create a new backend with the given configuration.
    pub fn new(config: OllamaConfig) -> Result<Self> {
        if config.model.trim().is_empty() {
            return Err(LlmError::Config("model name must not be empty".to_string()));
        }

        // Per-request timeouts are applied below; the client itself has none.
        let client = Client::builder()
            .build()
            .map_err(|e| LlmError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Get the configuration.
    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    /// List the models installed on the server.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), API_TAGS);

        let response = self
            .client
            .get(&url)
            .timeout(self.config.health_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Backend(format!(
                "Ollama API returned {}: {}",
                status,
                snippet(&body)
            )));
        }

        let tags: TagsResponse = response.json().await.map_err(|e| {
            LlmError::Serialization(format!("Failed to parse model list: {}", e))
        })?;
        Ok(tags.models)
    }
}

#[async_trait]
impl ChatBackend for OllamaBackend {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), API_CHAT);

        tracing::debug!(
            url = %url,
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.as_ref().map(|t| t.len()).unwrap_or(0),
            "Sending chat request"
        );

        let response = self
            .client
            .post(&url)
            .timeout(self.config.chat_timeout)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(status = %status, body_len = body.len(), "Chat response received");

        if !status.is_success() {
            return Err(LlmError::Backend(format!(
                "Ollama API returned {}: {}",
                status,
                snippet(&body)
            )));
        }

        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, body = %snippet(&body), "Failed to parse chat response");
            LlmError::Serialization(format!("Failed to parse chat response: {}", e))
        })?;

        Ok(parsed)
    }

    async fn health_check(&self) -> Result<()> {
        self.list_models().await.map(|_| ())
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// First 200 chars of a body, for error messages and logs.
fn snippet(body: &str) -> &str {
    let end = body
        .char_indices()
        .nth(200)
        .map(|(i, _)| i)
        .unwrap_or(body.len());
    &body[..end]
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = OllamaConfig::new("qwen3");
        assert_eq!(config.base_url, "http://localhost:11434");
        assert_eq!(config.model, "qwen3");
        assert_eq!(config.chat_timeout, Duration::from_secs(120));
        assert_eq!(config.health_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_config_builder() {
        let config = OllamaConfig::new("gemma3")
            .with_base_url("http://sanctuarymoon.local:11434")
            .with_chat_timeout(Duration::from_secs(60))
            .with_health_timeout(Duration::from_secs(2));

        assert_eq!(config.base_url, "http://sanctuarymoon.local:11434");
        assert_eq!(config.chat_timeout, Duration::from_secs(60));
        assert_eq!(config.health_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_backend_rejects_empty_model() {
        let result = OllamaBackend::new(OllamaConfig::new(""));
        assert!(matches!(result, Err(LlmError::Config(_))));
    }

    #[test]
    fn test_backend_name() {
        let backend = OllamaBackend::new(OllamaConfig::new("qwen3")).unwrap();
        assert_eq!(backend.name(), "ollama");
    }

    #[test]
    fn test_snippet_truncates() {
        let long = "x".repeat(500);
        assert_eq!(snippet(&long).len(), 200);
        assert_eq!(snippet("short"), "short");
    }

    #[test]
    fn test_tags_response_parses() {
        let raw = r#"{"models": [{"name": "qwen3:8b", "size": 5000000000}, {"name": "gemma3"}]}"#;
        let tags: TagsResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(tags.models.len(), 2);
        assert_eq!(tags.models[0].name, "qwen3:8b");
        assert_eq!(tags.models[1].size, 0);
    }
}
