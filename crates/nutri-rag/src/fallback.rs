//! External fallback adapter
//!
//! One time-boxed attempt against the external model. Every failure
//! (timeout, transport, empty reply) degrades to an empty answer so the
//! caller can fall through to the static tier. A call that outlives the
//! deadline keeps running detached and its late reply is dropped.
//!
//! Author: hephaex@gmail.com

use std::sync::Arc;
use std::time::Duration;

use nutri_core::LlmClient;
use thiserror::Error;
use tracing::{debug, warn};

/// Fallback call failures, recovered inside the adapter
#[derive(Error, Debug)]
pub enum FallbackError {
    #[error("External model timed out after {0:?}")]
    Timeout(Duration),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("External model not configured")]
    Unavailable,
}

/// Wraps an optional LLM client with a hard wall-clock timeout
#[derive(Clone)]
pub struct FallbackAdapter {
    client: Option<Arc<dyn LlmClient>>,
    timeout: Duration,
}

impl FallbackAdapter {
    pub fn new(client: Arc<dyn LlmClient>, timeout: Duration) -> Self {
        Self {
            client: Some(client),
            timeout,
        }
    }

    /// Adapter with no client; every call returns empty
    pub fn disabled() -> Self {
        Self {
            client: None,
            timeout: Duration::ZERO,
        }
    }

    pub fn from_client(client: Option<Arc<dyn LlmClient>>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn is_available(&self) -> bool {
        self.client.is_some()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Single attempt, typed error
    ///
    /// The call runs in its own task; past the deadline the task is left to
    /// finish on its own and its result discarded.
    pub async fn try_ask(&self, prompt: &str) -> Result<String, FallbackError> {
        let client = self.client.clone().ok_or(FallbackError::Unavailable)?;
        let prompt = prompt.to_string();

        let handle = tokio::spawn(async move { client.generate(&prompt).await });

        match tokio::time::timeout(self.timeout, handle).await {
            Err(_) => Err(FallbackError::Timeout(self.timeout)),
            Ok(Err(join_error)) => Err(FallbackError::Protocol(join_error.to_string())),
            Ok(Ok(Err(e))) => Err(FallbackError::Transport(e.to_string())),
            Ok(Ok(Ok(text))) => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    Err(FallbackError::Protocol("empty response".to_string()))
                } else {
                    Ok(text)
                }
            }
        }
    }

    /// Single attempt; empty string on any failure
    pub async fn ask(&self, prompt: &str) -> String {
        match self.try_ask(prompt).await {
            Ok(text) => text,
            Err(FallbackError::Unavailable) => {
                debug!("Fallback skipped: no external model configured");
                String::new()
            }
            Err(e) => {
                warn!("Fallback failed: {}", e);
                String::new()
            }
        }
    }
}
