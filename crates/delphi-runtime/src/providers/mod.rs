//! LLM Provider abstractions for delphi-runtime.
//!
//! This module defines the trait for LLM providers used by the LLM-backed
//! experts and facilitator, a factory registry for building providers from
//! configuration, and the Ollama implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

mod factory;
pub mod ollama;

pub use factory::{ProviderFactory, ProviderRegistry};
pub use ollama::{OllamaProvider, OllamaProviderFactory};

/// Errors from LLM providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    ParseError(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("{0}")]
    ModelUnavailable(String),
}

/// Configuration for a completion request.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Model to use
    pub model: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Request timeout
    pub timeout: Duration,

    /// Sampling seed, for backends that support reproducible output
    pub seed: Option<i64>,

    /// Ask the backend to constrain output to a JSON object
    pub json_output: bool,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: "qwen3:4b".to_string(),
            max_tokens: 500,
            temperature: 0.2,
            timeout: Duration::from_secs(120),
            seed: None,
            json_output: false,
        }
    }
}

impl CompletionConfig {
    /// Copy of this config with a sampling seed.
    pub fn with_seed(&self, seed: i64) -> Self {
        Self {
            seed: Some(seed),
            ..self.clone()
        }
    }

    /// Copy of this config requesting JSON output.
    pub fn json(mut self) -> Self {
        self.json_output = true;
        self
    }
}

/// A chat message for LLM completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role: "system" or "user"
    pub role: String,

    /// Message content
    pub content: String,
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Response from an LLM completion.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Generated content
    pub content: String,

    /// Token usage
    pub usage: TokenUsage,

    /// Model used
    pub model: String,

    /// Stop reason
    pub stop_reason: Option<String>,
}

/// Token usage from a completion.
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    /// Tokens in the prompt
    pub prompt_tokens: u32,

    /// Tokens in the completion
    pub completion_tokens: u32,
}

impl TokenUsage {
    /// Total tokens used.
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Provider abstraction allows swapping LLM backends.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Execute a chat completion.
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError>;

    /// Check if provider is healthy.
    async fn health_check(&self) -> bool;

    /// Get provider name for logs.
    fn name(&self) -> &str;

    /// Fail early when `model` cannot be served.
    async fn ensure_model_available(&self, _model: &str) -> Result<(), ProviderError> {
        Ok(())
    }
}
