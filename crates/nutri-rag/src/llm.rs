//! LLM Client implementations
//!
//! Provides OpenAI-compatible chat completions (Upstage Solar, OpenAI) and
//! Ollama clients behind the `LlmClient` trait.
//!
//! Author: hephaex@gmail.com

use std::sync::Arc;

use async_trait::async_trait;
use nutri_core::{LlmClient, LlmConfig, LlmProvider, NutriError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Default system instruction for the fallback model
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a pregnancy nutrition assistant. \
Provide concise, non-diagnostic guidance. Keep responses brief and practical. \
Include a short medical disclaimer.";

const UPSTAGE_BASE_URL: &str = "https://api.upstage.ai/v1";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

// ============================================================================
// OpenAI-compatible Client
// ============================================================================

/// OpenAI-compatible chat completions client (Upstage Solar, OpenAI)
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    system_prompt: Option<String>,
}

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Choice {
    message: Message,
    finish_reason: Option<String>,
}

impl OpenAiClient {
    /// Create a new client against the Upstage endpoint
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
        temperature: f32,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: UPSTAGE_BASE_URL.to_string(),
            model: model.into(),
            max_tokens,
            temperature,
            system_prompt: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
        }
    }

    /// Create from config
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_ref()
            .ok_or_else(|| NutriError::LlmError("API key required".to_string()))?;

        let base_url = if config.provider == LlmProvider::OpenAI
            && config.base_url == UPSTAGE_BASE_URL
        {
            OPENAI_BASE_URL.to_string()
        } else {
            config.base_url.clone()
        };

        Ok(Self::new(
            api_key.clone(),
            config.model.clone(),
            config.max_tokens,
            config.temperature,
        )
        .with_base_url(base_url))
    }

    /// Set custom base URL
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Replace or remove the system instruction
    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt;
        self
    }

    fn messages(&self, prompt: &str) -> Vec<Message> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system_prompt {
            messages.push(Message {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(Message {
            role: "user".to_string(),
            content: prompt.to_string(),
        });
        messages
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = OpenAiRequest {
            model: self.model.clone(),
            messages: self.messages(prompt),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| NutriError::LlmError(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(NutriError::LlmError(format!(
                "Chat completion error ({status}): {error_text}"
            )));
        }

        let result: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| NutriError::LlmError(format!("Failed to parse response: {e}")))?;

        result
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| NutriError::LlmError("No response generated".to_string()))
    }

    fn name(&self) -> &str {
        "openai-compatible"
    }
}

// ============================================================================
// Ollama Client
// ============================================================================

/// Ollama API client
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct OllamaResponse {
    response: String,
    done: bool,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    /// Create from config
    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(config.ollama_url.clone(), config.model.clone())
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = OllamaRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            system: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
            stream: Some(false),
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| NutriError::LlmError(format!("Ollama request failed: {e}")))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(NutriError::LlmError(format!("Ollama error: {error_text}")));
        }

        let result: OllamaResponse = response
            .json()
            .await
            .map_err(|e| NutriError::LlmError(format!("Failed to parse Ollama response: {e}")))?;

        Ok(result.response)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

// ============================================================================
// Factory function
// ============================================================================

/// Create an LLM client from config
///
/// Returns `None` for key-based providers when no API key is configured;
/// the fallback tier is then unavailable.
pub fn create_llm_client(config: &LlmConfig) -> Option<Arc<dyn LlmClient>> {
    match config.provider {
        LlmProvider::Upstage | LlmProvider::OpenAI => match OpenAiClient::from_config(config) {
            Ok(client) => Some(Arc::new(client)),
            Err(_) => {
                info!("No API key configured; external model fallback disabled");
                None
            }
        },
        LlmProvider::Ollama => Some(Arc::new(OllamaClient::from_config(config))),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_client_creation() {
        let client = OpenAiClient::new("test-key", "solar-pro3", 300, 0.7);
        assert_eq!(client.model, "solar-pro3");
        assert_eq!(client.base_url, UPSTAGE_BASE_URL);
    }

    #[test]
    fn test_openai_provider_default_url() {
        let config = LlmConfig {
            provider: LlmProvider::OpenAI,
            api_key: Some("k".to_string()),
            ..Default::default()
        };
        let client = OpenAiClient::from_config(&config).unwrap();
        assert_eq!(client.base_url, OPENAI_BASE_URL);
    }

    #[test]
    fn test_messages_include_system() {
        let client = OpenAiClient::new("k", "m", 10, 0.0);
        let messages = client.messages("Is tea ok?");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");

        let bare = client.with_system_prompt(None).messages("Is tea ok?");
        assert_eq!(bare.len(), 1);
        assert_eq!(bare[0].content, "Is tea ok?");
    }

    #[test]
    fn test_ollama_client_creation() {
        let client = OllamaClient::new("http://localhost:11434/", "llama3");
        assert_eq!(client.model, "llama3");
        assert_eq!(client.base_url, "http://localhost:11434");
    }

    #[test]
    fn test_factory_without_key() {
        assert!(create_llm_client(&LlmConfig::default()).is_none());

        let ollama = LlmConfig {
            provider: LlmProvider::Ollama,
            ..Default::default()
        };
        assert_eq!(create_llm_client(&ollama).unwrap().name(), "ollama");
    }
}
