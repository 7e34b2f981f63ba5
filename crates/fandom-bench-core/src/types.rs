//! Value types that flow through a benchmark run.
//!
//! Records come in from the dataset, provider configs come in from the
//! command line or a config file, and one [`BenchmarkResult`] comes out per
//! (record, provider) pair. Nothing here performs I/O.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// One row of the benchmark dataset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BenchmarkRecord {
    /// Non-empty row identifier
    pub row_id: String,

    /// Prompt sent to every provider
    pub prompt: String,

    /// Reference answer used by the grader, if the dataset has one
    #[serde(default)]
    pub expected_answer: Option<String>,

    /// Remaining dataset columns, untouched
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl BenchmarkRecord {
    /// Create a record without an expected answer.
    pub fn new(row_id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            row_id: row_id.into(),
            prompt: prompt.into(),
            expected_answer: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Attach an expected answer.
    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected_answer = Some(expected.into());
        self
    }

    /// Attach one metadata column.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Error parsing a `provider:model[:name]` argument.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderParseError {
    #[error("Provider must look like provider:model[:name], got '{0}'")]
    InvalidFormat(String),
}

/// One provider instance to benchmark.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
    /// Key into the provider registry (e.g. "openai"), lower-cased
    #[serde(deserialize_with = "lowercase_key")]
    pub provider: String,

    /// Provider-specific model identifier
    pub model: String,

    /// Display name override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Extra options handed to the provider factory (api_key, base_url, ...)
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, JsonValue>,
}

fn lowercase_key<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    String::deserialize(deserializer).map(|key| key.to_lowercase())
}

impl ProviderConfig {
    /// Create a config for `provider` serving `model`.
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into().to_lowercase(),
            model: model.into(),
            name: None,
            options: Map::new(),
        }
    }

    /// Override the label with a display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set a provider option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Identity of this provider within a run.
    ///
    /// The name override when present, `{provider}-{model}` otherwise.
    pub fn label(&self) -> String {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("{}-{}", self.provider, self.model),
        }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let options: BTreeMap<&str, String> = self
            .options
            .iter()
            .map(|(k, v)| {
                let shown = if k == "api_key" {
                    "[REDACTED]".to_string()
                } else {
                    v.to_string()
                };
                (k.as_str(), shown)
            })
            .collect();

        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("name", &self.name)
            .field("options", &options)
            .finish()
    }
}

impl FromStr for ProviderConfig {
    type Err = ProviderParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut parts = raw.splitn(3, ':');
        let provider = parts.next().unwrap_or_default().trim();
        let model = parts.next().unwrap_or_default().trim();

        if provider.is_empty() || model.is_empty() {
            return Err(ProviderParseError::InvalidFormat(raw.to_string()));
        }

        let mut config = ProviderConfig::new(provider, model);
        if let Some(name) = parts.next().map(str::trim).filter(|n| !n.is_empty()) {
            config.name = Some(name.to_string());
        }
        Ok(config)
    }
}

/// Why a provider could not be made ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupReason {
    /// Provider key is not in the registry
    UnsupportedProvider,
    /// Required credential is not configured
    MissingApiKey,
    /// Provider is known but its client was not compiled in
    MissingDependency,
    /// Provider binding rejected the supplied configuration
    InvalidBinding,
    /// Client construction itself failed
    InitFailed,
}

impl SetupReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SetupReason::UnsupportedProvider => "unsupported_provider",
            SetupReason::MissingApiKey => "missing_api_key",
            SetupReason::MissingDependency => "missing_dependency",
            SetupReason::InvalidBinding => "invalid_binding",
            SetupReason::InitFailed => "init_failed",
        }
    }
}

impl fmt::Display for SetupReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Readiness of one configured provider for one run.
///
/// Set once during readiness resolution and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProviderStatus {
    Ready,
    Skipped { reason: SetupReason, detail: String },
    DryRun,
}

impl ProviderStatus {
    /// Create a skipped status.
    pub fn skipped(reason: SetupReason, detail: impl Into<String>) -> Self {
        ProviderStatus::Skipped {
            reason,
            detail: detail.into(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ProviderStatus::Ready)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, ProviderStatus::Skipped { .. })
    }
}

impl fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderStatus::Ready => write!(f, "ready"),
            ProviderStatus::DryRun => write!(f, "dry_run"),
            ProviderStatus::Skipped { reason, detail } => {
                write!(f, "skipped ({}) - {}", reason, detail)
            }
        }
    }
}

/// Outcome of one (record, provider) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Ok,
    Error,
    Skipped,
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultStatus::Ok => write!(f, "ok"),
            ResultStatus::Error => write!(f, "error"),
            ResultStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Grader decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Correct,
    Partial,
    Incorrect,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Correct => write!(f, "correct"),
            Decision::Partial => write!(f, "partial"),
            Decision::Incorrect => write!(f, "incorrect"),
        }
    }
}

/// Invalid verdict field.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VerdictError {
    #[error("Score {0} is outside [0.0, 1.0]")]
    ScoreOutOfRange(f64),
}

/// Structured output of the grader for one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawVerdict")]
pub struct SupervisorVerdict {
    score: f64,
    decision: Decision,
    notes: String,
}

#[derive(Deserialize)]
struct RawVerdict {
    score: f64,
    decision: Decision,
    notes: String,
}

impl TryFrom<RawVerdict> for SupervisorVerdict {
    type Error = VerdictError;

    fn try_from(raw: RawVerdict) -> Result<Self, Self::Error> {
        SupervisorVerdict::new(raw.score, raw.decision, raw.notes)
    }
}

impl SupervisorVerdict {
    /// Create a verdict; `score` must lie in [0.0, 1.0].
    pub fn new(
        score: f64,
        decision: Decision,
        notes: impl Into<String>,
    ) -> Result<Self, VerdictError> {
        if !(0.0..=1.0).contains(&score) {
            return Err(VerdictError::ScoreOutOfRange(score));
        }
        Ok(Self {
            score,
            decision,
            notes: notes.into(),
        })
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn decision(&self) -> Decision {
        self.decision
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }
}

/// One row of benchmark output.
///
/// Use the [`ok`](Self::ok), [`error`](Self::error) and
/// [`skipped`](Self::skipped) constructors so that latency, output and
/// verdict are only present where they make sense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub record_id: String,
    pub provider_label: String,
    pub model_label: String,
    pub status: ResultStatus,

    /// Seconds spent on the provider call; only for attempted calls
    #[serde(default)]
    pub latency_seconds: Option<f64>,

    /// Answer text; only on `ok`
    #[serde(default)]
    pub output: Option<String>,

    /// Grade; only on `ok` and only when grading ran
    #[serde(default)]
    pub supervisor_verdict: Option<SupervisorVerdict>,

    /// Reason on `error` and `skipped`
    #[serde(default)]
    pub detail: Option<String>,
}

impl BenchmarkResult {
    /// A successful call.
    pub fn ok(
        record_id: impl Into<String>,
        provider_label: impl Into<String>,
        model_label: impl Into<String>,
        latency: Duration,
        output: impl Into<String>,
        verdict: Option<SupervisorVerdict>,
    ) -> Self {
        Self {
            record_id: record_id.into(),
            provider_label: provider_label.into(),
            model_label: model_label.into(),
            status: ResultStatus::Ok,
            latency_seconds: Some(latency.as_secs_f64()),
            output: Some(output.into()),
            supervisor_verdict: verdict,
            detail: None,
        }
    }

    /// A call (or its grading) that failed after `latency`.
    pub fn error(
        record_id: impl Into<String>,
        provider_label: impl Into<String>,
        model_label: impl Into<String>,
        latency: Duration,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            record_id: record_id.into(),
            provider_label: provider_label.into(),
            model_label: model_label.into(),
            status: ResultStatus::Error,
            latency_seconds: Some(latency.as_secs_f64()),
            output: None,
            supervisor_verdict: None,
            detail: Some(detail.into()),
        }
    }

    /// A pair that was never attempted.
    pub fn skipped(
        record_id: impl Into<String>,
        provider_label: impl Into<String>,
        model_label: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            record_id: record_id.into(),
            provider_label: provider_label.into(),
            model_label: model_label.into(),
            status: ResultStatus::Skipped,
            latency_seconds: None,
            output: None,
            supervisor_verdict: None,
            detail: Some(detail.into()),
        }
    }

    /// The (record_id, provider_label) identity of this row.
    pub fn pair(&self) -> (&str, &str) {
        (&self.record_id, &self.provider_label)
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResultStatus::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_label_defaults_to_provider_and_model() {
        let config = ProviderConfig::new("openai", "gpt-x");
        assert_eq!(config.label(), "openai-gpt-x");

        let named = config.clone().with_name("fast");
        assert_eq!(named.label(), "fast");

        let empty_name = config.with_name("");
        assert_eq!(empty_name.label(), "openai-gpt-x");
    }

    #[test]
    fn test_parse_provider_argument() {
        let config: ProviderConfig = "openai:gpt-x".parse().unwrap();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.model, "gpt-x");
        assert_eq!(config.name, None);

        let config: ProviderConfig = "Anthropic:claude-x:judge".parse().unwrap();
        assert_eq!(config.provider, "anthropic");
        assert_eq!(config.label(), "judge");
    }

    #[test]
    fn test_parse_provider_argument_rejects_missing_model() {
        assert!("openai".parse::<ProviderConfig>().is_err());
        assert!("openai:".parse::<ProviderConfig>().is_err());
        assert!(":gpt-x".parse::<ProviderConfig>().is_err());
    }

    #[test]
    fn test_deserialized_provider_key_is_lowercased() {
        let json = serde_json::json!({"provider": "OpenAI", "model": "x"});
        let config: ProviderConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.label(), "openai-x");
        assert_eq!(config, "OpenAI:x".parse().unwrap());
    }

    #[test]
    fn test_api_key_redacted_in_debug() {
        let config = ProviderConfig::new("openai", "gpt-x").with_option("api_key", "sk-secret-123");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-secret-123"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_provider_status_display() {
        assert_eq!(ProviderStatus::Ready.to_string(), "ready");
        assert_eq!(ProviderStatus::DryRun.to_string(), "dry_run");
        let skipped = ProviderStatus::skipped(SetupReason::MissingApiKey, "Set OPENAI_API_KEY");
        assert_eq!(
            skipped.to_string(),
            "skipped (missing_api_key) - Set OPENAI_API_KEY"
        );
        assert!(skipped.is_skipped());
    }

    #[test]
    fn test_verdict_rejects_out_of_range_score() {
        assert!(SupervisorVerdict::new(1.0, Decision::Correct, "ok").is_ok());
        assert!(SupervisorVerdict::new(0.0, Decision::Incorrect, "no").is_ok());
        assert_eq!(
            SupervisorVerdict::new(1.5, Decision::Correct, "too high"),
            Err(VerdictError::ScoreOutOfRange(1.5))
        );

        let json = serde_json::json!({"score": -0.1, "decision": "partial", "notes": ""});
        assert!(serde_json::from_value::<SupervisorVerdict>(json).is_err());
    }

    #[test]
    fn test_verdict_deserializes() {
        let json = serde_json::json!({"score": 1.0, "decision": "correct", "notes": "exact match"});
        let verdict: SupervisorVerdict = serde_json::from_value(json).unwrap();
        assert_eq!(verdict.decision(), Decision::Correct);
        assert_eq!(verdict.score(), 1.0);
        assert_eq!(verdict.notes(), "exact match");
    }

    #[test]
    fn test_result_constructors_respect_field_rules() {
        let ok = BenchmarkResult::ok("r1", "p", "m", Duration::from_millis(100), "4", None);
        assert!(ok.is_ok());
        assert!(ok.latency_seconds.unwrap() > 0.0);
        assert!(ok.detail.is_none());

        let err = BenchmarkResult::error("r1", "p", "m", Duration::ZERO, "boom");
        assert_eq!(err.status, ResultStatus::Error);
        assert_eq!(err.latency_seconds, Some(0.0));
        assert!(err.output.is_none());

        let skipped = BenchmarkResult::skipped("r1", "p", "m", "dry_run");
        assert_eq!(skipped.status, ResultStatus::Skipped);
        assert!(skipped.latency_seconds.is_none());
        assert_eq!(skipped.pair(), ("r1", "p"));
    }

    #[test]
    fn test_result_status_serializes_snake_case() {
        let value = serde_json::to_value(ResultStatus::Skipped).unwrap();
        assert_eq!(value, "skipped");
    }

    proptest! {
        #[test]
        fn prop_parsed_label_matches_parts(
            provider in "[a-z]{1,10}",
            model in "[a-z0-9.-]{1,12}",
        ) {
            let config: ProviderConfig = format!("{}:{}", provider, model).parse().unwrap();
            prop_assert_eq!(config.label(), format!("{}-{}", provider, model));
        }

        #[test]
        fn prop_name_override_wins(
            provider in "[a-z]{1,10}",
            model in "[a-z0-9]{1,12}",
            name in "[A-Za-z][A-Za-z0-9_]{0,12}",
        ) {
            let config: ProviderConfig = format!("{}:{}:{}", provider, model, name).parse().unwrap();
            prop_assert_eq!(config.label(), name);
        }
    }
}
