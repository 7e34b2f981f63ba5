//! Chat client handle used by the runner and the grader.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::providers::{ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError};

/// A ready provider bound to its completion settings.
///
/// Cheap to clone; every unit of work gets its own handle.
#[derive(Clone)]
pub struct ChatClient {
    provider: Arc<dyn LlmProvider>,
    config: CompletionConfig,
}

impl ChatClient {
    pub fn new(provider: Arc<dyn LlmProvider>, config: CompletionConfig) -> Self {
        Self { provider, config }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }

    /// Send `prompt` as a single user message and return the answer text.
    pub async fn invoke(&self, prompt: &str) -> Result<String, ProviderError> {
        let response = self.complete(vec![ChatMessage::user(prompt)]).await?;
        Ok(response.content)
    }

    /// Run a chat completion with this client's settings.
    pub async fn complete(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<CompletionResponse, ProviderError> {
        self.provider.complete(messages, &self.config).await
    }

    /// Ask for a JSON answer following `schema` and parse it.
    ///
    /// The schema is passed to providers that support structured output;
    /// the reply is parsed as JSON either way, with a surrounding markdown
    /// code fence tolerated.
    pub async fn complete_json(
        &self,
        messages: Vec<ChatMessage>,
        schema: &JsonValue,
    ) -> Result<JsonValue, ProviderError> {
        let mut config = self.config.clone();
        config.response_schema = Some(schema.clone());

        let response = self.provider.complete(messages, &config).await?;
        serde_json::from_str(strip_code_fence(&response.content))
            .map_err(|e| ProviderError::ParseError(format!("response is not valid JSON: {}", e)))
    }
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("provider", &self.provider.name())
            .field("model", &self.config.model)
            .finish()
    }
}

/// Strip a ```` ``` ```` / ```` ```json ```` fence wrapped around a reply.
pub(crate) fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the opening line.
    match body.split_once('\n') {
        Some((info, inner)) if info.trim().chars().all(|c| c.is_ascii_alphanumeric()) => {
            inner.trim()
        }
        _ => body.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::TokenUsage;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct CannedProvider {
        reply: String,
        seen: Mutex<Vec<CompletionConfig>>,
    }

    impl CannedProvider {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for CannedProvider {
        async fn complete(
            &self,
            messages: Vec<ChatMessage>,
            config: &CompletionConfig,
        ) -> Result<CompletionResponse, ProviderError> {
            assert!(!messages.is_empty());
            self.seen.lock().unwrap().push(config.clone());
            Ok(CompletionResponse {
                content: self.reply.clone(),
                usage: TokenUsage::default(),
                model: config.model.clone(),
                stop_reason: None,
            })
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  ```\n{\"a\":1}\n```  "), "{\"a\":1}");
        assert_eq!(strip_code_fence("```{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}"), "```json\n{\"a\":1}");
    }

    #[tokio::test]
    async fn test_invoke_returns_content() {
        let provider = CannedProvider::new("4");
        let client = ChatClient::new(provider.clone(), CompletionConfig::new("m"));

        assert_eq!(client.invoke("2+2?").await.unwrap(), "4");
        assert!(provider.seen.lock().unwrap()[0].response_schema.is_none());
    }

    #[tokio::test]
    async fn test_complete_json_passes_schema_and_parses() {
        let provider = CannedProvider::new("```json\n{\"x\": 2}\n```");
        let client = ChatClient::new(provider.clone(), CompletionConfig::new("m"));
        let schema = serde_json::json!({"type": "object"});

        let value = client
            .complete_json(vec![ChatMessage::user("q")], &schema)
            .await
            .unwrap();
        assert_eq!(value["x"], 2);
        assert_eq!(provider.seen.lock().unwrap()[0].response_schema, Some(schema));
        assert!(client.config().response_schema.is_none());
    }

    #[tokio::test]
    async fn test_complete_json_rejects_prose() {
        let client = ChatClient::new(CannedProvider::new("looks right to me"), CompletionConfig::new("m"));
        let err = client
            .complete_json(vec![ChatMessage::user("q")], &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::ParseError(_)));
    }
}
