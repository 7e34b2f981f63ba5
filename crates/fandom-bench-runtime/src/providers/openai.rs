//! OpenAI Chat Completions provider.
//!
//! Mistral and Groq expose the same wire format, so one provider type
//! serves all three keys; the factories differ only in endpoint,
//! credential variable and a couple of request quirks.

use super::{
    factory::ProviderFactory,
    http,
    secrets::ApiCredential,
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError, TokenUsage,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// How a dialect asks for structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JsonMode {
    /// `response_format: {type: json_schema, ...}`
    Schema,
    /// `response_format: {type: json_object}`
    Object,
}

/// Per-endpoint differences of the OpenAI-compatible family.
#[derive(Debug, Clone, Copy)]
struct Dialect {
    key: &'static str,
    env_var: &'static str,
    credential_name: &'static str,
    base_url: &'static str,
    /// Newer OpenAI models reject `max_tokens`
    max_tokens_field: &'static str,
    json_mode: JsonMode,
    description: &'static str,
}

const OPENAI: Dialect = Dialect {
    key: "openai",
    env_var: "OPENAI_API_KEY",
    credential_name: "OpenAI API key",
    base_url: "https://api.openai.com/v1",
    max_tokens_field: "max_completion_tokens",
    json_mode: JsonMode::Schema,
    description: "OpenAI Chat Completions",
};

const MISTRAL: Dialect = Dialect {
    key: "mistral",
    env_var: "MISTRAL_API_KEY",
    credential_name: "Mistral API key",
    base_url: "https://api.mistral.ai/v1",
    max_tokens_field: "max_tokens",
    json_mode: JsonMode::Object,
    description: "Mistral (OpenAI-compatible endpoint)",
};

const GROQ: Dialect = Dialect {
    key: "groq",
    env_var: "GROQ_API_KEY",
    credential_name: "Groq API key",
    base_url: "https://api.groq.com/openai/v1",
    max_tokens_field: "max_tokens",
    json_mode: JsonMode::Object,
    description: "Groq (OpenAI-compatible endpoint)",
};

/// Provider speaking the OpenAI Chat Completions wire format.
pub struct OpenAiCompatibleProvider {
    dialect: Dialect,
    credential: ApiCredential,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiCompatibleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleProvider")
            .field("provider", &self.dialect.key)
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl OpenAiCompatibleProvider {
    fn from_config(dialect: Dialect, config: &JsonValue) -> Result<Self, ProviderError> {
        let credential = ApiCredential::from_config_or_env(
            config,
            "api_key",
            dialect.env_var,
            dialect.credential_name,
        )?;

        Ok(Self {
            dialect,
            credential,
            base_url: http::base_url(config, dialect.base_url),
            client: http::build_client()?,
        })
    }

    fn request_body(&self, messages: Vec<ChatMessage>, config: &CompletionConfig) -> JsonValue {
        let mut body = serde_json::json!({
            "model": config.model,
            "messages": messages,
        });
        body[self.dialect.max_tokens_field] = JsonValue::from(config.max_tokens);
        if let Some(temperature) = config.temperature {
            body["temperature"] = JsonValue::from(temperature);
        }
        if let Some(schema) = &config.response_schema {
            body["response_format"] = match self.dialect.json_mode {
                JsonMode::Schema => serde_json::json!({
                    "type": "json_schema",
                    "json_schema": {
                        "name": "structured_output",
                        "schema": schema,
                        "strict": false
                    }
                }),
                JsonMode::Object => serde_json::json!({"type": "json_object"}),
            };
        }
        body
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    model: String,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Default)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        let request = self.request_body(messages, config);

        let builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.credential.expose());

        let body: ChatCompletionResponse = http::post_json(builder, &request, config.timeout).await?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ParseError("response has no choices".to_string()))?;

        let usage = body.usage.unwrap_or_default();
        Ok(CompletionResponse {
            content: choice.message.content.unwrap_or_default(),
            usage: TokenUsage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
            },
            model: body.model,
            stop_reason: choice.finish_reason,
        })
    }

    fn name(&self) -> &str {
        self.dialect.key
    }
}

/// Factory for one OpenAI-compatible provider key.
///
/// ## Configuration Format
/// ```json
/// {
///   "api_key": "sk-...",         // Optional, falls back to the key's env variable
///   "base_url": "https://..."    // Optional, custom API endpoint
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct OpenAiCompatibleFactory {
    dialect: Dialect,
}

impl OpenAiCompatibleFactory {
    pub fn openai() -> Self {
        Self { dialect: OPENAI }
    }

    pub fn mistral() -> Self {
        Self { dialect: MISTRAL }
    }

    pub fn groq() -> Self {
        Self { dialect: GROQ }
    }

    /// Factories for every OpenAI-compatible key.
    pub fn all() -> [Self; 3] {
        [Self::openai(), Self::mistral(), Self::groq()]
    }
}

impl ProviderFactory for OpenAiCompatibleFactory {
    fn provider_type(&self) -> &'static str {
        self.dialect.key
    }

    fn create(&self, config: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        let provider = OpenAiCompatibleProvider::from_config(self.dialect, config)?;
        Ok(Arc::new(provider))
    }

    fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError> {
        http::validate_base_url(config)
    }

    fn description(&self) -> &'static str {
        self.dialect.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(factory: OpenAiCompatibleFactory) -> OpenAiCompatibleProvider {
        OpenAiCompatibleProvider::from_config(factory.dialect, &serde_json::json!({"api_key": "k"}))
            .unwrap()
    }

    #[test]
    fn test_factories_cover_keys() {
        let keys: Vec<&str> = OpenAiCompatibleFactory::all()
            .iter()
            .map(|f| f.provider_type())
            .collect();
        assert_eq!(keys, vec!["openai", "mistral", "groq"]);
    }

    #[test]
    fn test_openai_request_uses_completion_tokens_and_schema() {
        let p = provider(OpenAiCompatibleFactory::openai());
        let mut config = CompletionConfig::new("gpt-5");
        config.temperature = None;
        config.response_schema = Some(serde_json::json!({"type": "object"}));

        let body = p.request_body(vec![ChatMessage::user("hi")], &config);
        assert_eq!(body["max_completion_tokens"], 1024);
        assert!(body.get("max_tokens").is_none());
        assert!(body.get("temperature").is_none());
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["strict"], false);
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn test_groq_request_uses_max_tokens_and_json_object() {
        let p = provider(OpenAiCompatibleFactory::groq());
        let mut config = CompletionConfig::new("llama");
        config.response_schema = Some(serde_json::json!({"type": "object"}));

        let body = p.request_body(vec![ChatMessage::user("hi")], &config);
        assert_eq!(body["max_tokens"], 1024);
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_base_url_override() {
        let config = serde_json::json!({"api_key": "k", "base_url": "http://localhost:11434/v1"});
        let p = OpenAiCompatibleProvider::from_config(MISTRAL, &config).unwrap();
        assert_eq!(p.base_url, "http://localhost:11434/v1");
        assert_eq!(p.name(), "mistral");
    }

    #[test]
    fn test_api_key_not_in_debug_output() {
        let config = serde_json::json!({"api_key": "sk-very-secret"});
        let p = OpenAiCompatibleProvider::from_config(OPENAI, &config).unwrap();
        let debug = format!("{:?}", p);
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
