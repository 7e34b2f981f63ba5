//! Cohere v2 Chat provider.

use super::{
    factory::ProviderFactory,
    http,
    secrets::{ApiCredential, CredentialSource},
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError, TokenUsage,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Environment variable name for Cohere API key.
pub const COHERE_API_KEY_ENV: &str = "COHERE_API_KEY";

const DEFAULT_BASE_URL: &str = "https://api.cohere.com/v2";

/// Cohere chat provider.
pub struct CohereProvider {
    credential: ApiCredential,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for CohereProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CohereProvider")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl CohereProvider {
    /// Create a provider with an explicit API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            credential: ApiCredential::new(api_key, CredentialSource::Programmatic, "Cohere API key"),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: http::build_client()?,
        })
    }

    /// Create from provider options, falling back to `COHERE_API_KEY`.
    pub fn from_config(config: &JsonValue) -> Result<Self, ProviderError> {
        let credential = ApiCredential::from_config_or_env(
            config,
            "api_key",
            COHERE_API_KEY_ENV,
            "Cohere API key",
        )?;

        Ok(Self {
            credential,
            base_url: http::base_url(config, DEFAULT_BASE_URL),
            client: http::build_client()?,
        })
    }
}

#[derive(Debug, Serialize)]
struct CohereRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
struct CohereResponse {
    message: CohereMessage,
    finish_reason: Option<String>,
    usage: Option<CohereUsage>,
}

#[derive(Debug, Deserialize)]
struct CohereMessage {
    #[serde(default)]
    content: Vec<CohereContent>,
}

#[derive(Debug, Deserialize)]
struct CohereContent {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CohereUsage {
    tokens: Option<CohereTokens>,
}

#[derive(Debug, Deserialize)]
struct CohereTokens {
    #[serde(default)]
    input_tokens: f64,
    #[serde(default)]
    output_tokens: f64,
}

#[async_trait]
impl LlmProvider for CohereProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        let request = CohereRequest {
            model: &config.model,
            messages,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            response_format: config.response_schema.as_ref().map(|schema| {
                serde_json::json!({"type": "json_object", "json_schema": schema})
            }),
        };

        let builder = self
            .client
            .post(format!("{}/chat", self.base_url))
            .bearer_auth(self.credential.expose());

        let body: CohereResponse = http::post_json(builder, &request, config.timeout).await?;

        let content = body
            .message
            .content
            .into_iter()
            .filter_map(|c| c.text)
            .collect::<Vec<_>>()
            .join("");

        let usage = body
            .usage
            .and_then(|u| u.tokens)
            .map(|t| TokenUsage {
                prompt_tokens: t.input_tokens as u32,
                completion_tokens: t.output_tokens as u32,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            content,
            usage,
            model: config.model.clone(),
            stop_reason: body.finish_reason,
        })
    }

    fn name(&self) -> &str {
        "cohere"
    }
}

/// Factory for creating Cohere providers from configuration.
pub struct CohereProviderFactory;

impl ProviderFactory for CohereProviderFactory {
    fn provider_type(&self) -> &'static str {
        "cohere"
    }

    fn create(&self, config: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        Ok(Arc::new(CohereProvider::from_config(config)?))
    }

    fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError> {
        http::validate_base_url(config)
    }

    fn description(&self) -> &'static str {
        "Cohere v2 Chat"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_parsing() {
        let raw = serde_json::json!({
            "id": "abc",
            "finish_reason": "COMPLETE",
            "message": {"role": "assistant", "content": [{"type": "text", "text": "Paris"}]},
            "usage": {"tokens": {"input_tokens": 12.0, "output_tokens": 3.0}}
        });
        let parsed: CohereResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.message.content[0].text.as_deref(), Some("Paris"));
        assert_eq!(parsed.finish_reason.as_deref(), Some("COMPLETE"));
    }

    #[test]
    fn test_request_shape() {
        let request = CohereRequest {
            model: "command-r",
            messages: vec![ChatMessage::system("s"), ChatMessage::user("u")],
            max_tokens: 50,
            temperature: None,
            response_format: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert!(json.get("temperature").is_none());
        assert!(json.get("response_format").is_none());
    }

    #[test]
    fn test_api_key_not_in_debug_output() {
        let provider = CohereProvider::new("co-secret-123").unwrap();
        let debug = format!("{:?}", provider);
        assert!(!debug.contains("co-secret-123"));
        assert_eq!(provider.name(), "cohere");
    }
}
