//! LLM provider abstractions for fandom-bench-runtime.
//!
//! This module defines the trait every chat backend implements, the
//! registry that maps provider keys to factories, and the concrete HTTP
//! providers compiled in through cargo features.
//!
//! ## Security
//!
//! All providers use the [`secrets`] module for credential handling.
//! See [`ApiCredential`] for the recommended patterns.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;
use thiserror::Error;

pub mod catalog;
mod factory;
pub mod secrets;

#[cfg(any(feature = "anthropic", feature = "openai", feature = "cohere"))]
mod http;

#[cfg(feature = "anthropic")]
mod anthropic;

#[cfg(feature = "cohere")]
mod cohere;

#[cfg(feature = "openai")]
mod openai;

pub use catalog::ProviderSpec;
pub use factory::{ProviderFactory, ProviderRegistry};
pub use secrets::{ApiCredential, CredentialSource};

#[cfg(feature = "anthropic")]
pub use anthropic::{AnthropicProvider, AnthropicProviderFactory};

#[cfg(feature = "cohere")]
pub use cohere::{CohereProvider, CohereProviderFactory};

#[cfg(feature = "openai")]
pub use openai::{OpenAiCompatibleFactory, OpenAiCompatibleProvider};

/// Errors from LLM providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    ParseError(String),

    #[error("Authentication failed")]
    AuthError,

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("{name} required: set '{config_key}' in options or the {env_var} environment variable")]
    MissingCredential {
        name: &'static str,
        config_key: &'static str,
        env_var: String,
    },
}

/// Default completion budget when the provider options do not set one.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Default request timeout when the provider options do not set one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for a completion request.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Model to use
    pub model: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Sampling temperature; `None` leaves the provider default
    pub temperature: Option<f32>,

    /// Request timeout
    pub timeout: Duration,

    /// JSON Schema the response must follow, for providers that support it
    pub response_schema: Option<JsonValue>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: Some(0.0),
            timeout: DEFAULT_TIMEOUT,
            response_schema: None,
        }
    }
}

impl CompletionConfig {
    /// Create a config for `model` with default limits.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Build from merged provider options.
    ///
    /// Recognized keys: `temperature` (number, or null to omit),
    /// `max_tokens` (integer) and `timeout` (seconds, or a humantime string
    /// such as `"30s"`).
    pub fn from_options(model: impl Into<String>, options: &JsonValue) -> Result<Self, ProviderError> {
        let mut config = Self::new(model);

        config.temperature = match options.get("temperature") {
            None | Some(JsonValue::Null) => None,
            Some(value) => Some(value.as_f64().ok_or_else(|| {
                ProviderError::NotConfigured(format!("temperature must be a number, got {}", value))
            })? as f32),
        };

        if let Some(value) = options.get("max_tokens") {
            let max_tokens = value
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .filter(|&n| n > 0)
                .ok_or_else(|| {
                    ProviderError::NotConfigured(format!(
                        "max_tokens must be a positive integer, got {}",
                        value
                    ))
                })?;
            config.max_tokens = max_tokens;
        }

        if let Some(value) = options.get("timeout") {
            config.timeout = parse_timeout(value)?;
        }

        Ok(config)
    }
}

fn parse_timeout(value: &JsonValue) -> Result<Duration, ProviderError> {
    match value {
        JsonValue::Number(n) => n
            .as_f64()
            .filter(|secs| *secs > 0.0)
            .map(Duration::from_secs_f64)
            .ok_or_else(|| ProviderError::NotConfigured(format!("timeout must be positive, got {}", n))),
        JsonValue::String(s) => humantime::parse_duration(s)
            .map_err(|e| ProviderError::NotConfigured(format!("invalid timeout '{}': {}", s, e))),
        other => Err(ProviderError::NotConfigured(format!(
            "timeout must be seconds or a duration string, got {}",
            other
        ))),
    }
}

/// A chat message for LLM completion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// Role: "system", "user", or "assistant"
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

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
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

/// Chat backend abstraction.
///
/// The orchestrator and the grader only ever talk to providers through this
/// trait, wrapped in a [`ChatClient`](crate::ChatClient).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Execute a chat completion.
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError>;

    /// Provider name for logs.
    fn name(&self) -> &str;
}
