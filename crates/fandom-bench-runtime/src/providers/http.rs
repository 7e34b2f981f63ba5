//! HTTP plumbing shared by the reqwest-backed providers.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;

use super::ProviderError;

/// Build the pooled client a provider keeps for its lifetime.
pub(crate) fn build_client() -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .build()
        .map_err(|e| ProviderError::HttpError(format!("failed to build HTTP client: {}", e)))
}

/// Reject a `base_url` option that is not an http(s) URL.
pub(crate) fn validate_base_url(config: &JsonValue) -> Result<(), ProviderError> {
    match config.get("base_url") {
        None | Some(JsonValue::Null) => Ok(()),
        Some(JsonValue::String(url)) if url.starts_with("http://") || url.starts_with("https://") => {
            Ok(())
        }
        Some(_) => Err(ProviderError::NotConfigured(
            "base_url must start with http:// or https://".to_string(),
        )),
    }
}

/// `base_url` option, or `default` with any trailing slash removed.
pub(crate) fn base_url(config: &JsonValue, default: &str) -> String {
    config["base_url"]
        .as_str()
        .unwrap_or(default)
        .trim_end_matches('/')
        .to_string()
}

/// POST `body` and decode a JSON response.
///
/// 401/403 map to [`ProviderError::AuthError`], 429 to
/// [`ProviderError::RateLimited`], any other failure status to
/// [`ProviderError::ApiError`] carrying the provider's message.
pub(crate) async fn post_json<B, T>(
    request: reqwest::RequestBuilder,
    body: &B,
    timeout: Duration,
) -> Result<T, ProviderError>
where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    let response = request
        .timeout(timeout)
        .json(body)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(timeout)
            } else {
                ProviderError::HttpError(e.to_string())
            }
        })?;

    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);
        return Err(ProviderError::RateLimited { retry_after });
    }

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(ProviderError::AuthError);
    }

    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(ProviderError::ApiError {
            status: status.as_u16(),
            message: error_message(&text),
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| ProviderError::ParseError(e.to_string()))
}

/// Pull a readable message out of an error body.
///
/// Understands `{"error": {"message": ..}}`, `{"error": ".."}` and
/// `{"message": ..}`; anything else is returned trimmed.
fn error_message(body: &str) -> String {
    let parsed: Option<JsonValue> = serde_json::from_str(body).ok();
    let from_json = parsed.as_ref().and_then(|v| {
        v.pointer("/error/message")
            .or_else(|| v.get("error").filter(|e| e.is_string()))
            .or_else(|| v.get("message"))
            .and_then(|m| m.as_str())
            .map(str::to_string)
    });
    from_json.unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(
            error_message(r#"{"error": {"type": "x", "message": "bad model"}}"#),
            "bad model"
        );
        assert_eq!(error_message(r#"{"error": "quota"}"#), "quota");
        assert_eq!(error_message(r#"{"message": "invalid request"}"#), "invalid request");
        assert_eq!(error_message("  gateway down \n"), "gateway down");
    }

    #[test]
    fn test_validate_base_url() {
        assert!(validate_base_url(&serde_json::json!({})).is_ok());
        assert!(validate_base_url(&serde_json::json!({"base_url": "https://x.test/v1"})).is_ok());
        assert!(validate_base_url(&serde_json::json!({"base_url": "ftp://x"})).is_err());
        assert!(validate_base_url(&serde_json::json!({"base_url": 5})).is_err());
    }

    #[test]
    fn test_base_url_trims_slash() {
        let config = serde_json::json!({"base_url": "http://localhost:8080/v1/"});
        assert_eq!(base_url(&config, "https://default"), "http://localhost:8080/v1");
        assert_eq!(base_url(&serde_json::json!({}), "https://default"), "https://default");
    }
}
