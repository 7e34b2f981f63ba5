//! LLM grader that scores candidate answers against expected answers.
//!
//! The grader goes through the same readiness resolution as benchmarked
//! providers. A grader that cannot be built stays unavailable for the whole
//! run and simply produces no verdicts; it never fails the run.

use fandom_bench_core::{validate_verdict, verdict_schema, ProviderConfig, SchemaError, SupervisorVerdict};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::client::ChatClient;
use crate::prompts::grader_messages;
use crate::providers::{ProviderError, ProviderRegistry};
use crate::readiness::build_chat_client;

/// Provider key the judge model is always served from.
pub const JUDGE_PROVIDER: &str = "openai";

/// Default judge model.
pub const DEFAULT_JUDGE_MODEL: &str = "gpt-5";

/// Grader settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    pub model: String,
    pub enabled: bool,
    pub temperature: f64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_JUDGE_MODEL.to_string(),
            enabled: true,
            temperature: 0.0,
        }
    }
}

impl SupervisorConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// A grading call that failed for one record.
#[derive(Error, Debug)]
pub enum GradingError {
    #[error("grader request failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("grader verdict failed validation: {}", .0.join("; "))]
    InvalidVerdict(Vec<String>),

    #[error("grader verdict could not be decoded: {0}")]
    Decode(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

enum State {
    Ready(ChatClient),
    Unavailable(String),
}

/// The grader.
pub struct Supervisor {
    state: State,
}

impl Supervisor {
    /// Build the grader described by `config`.
    ///
    /// A disabled config or a judge that cannot be constructed yields an
    /// unavailable grader, with the reason kept in [`error`](Self::error).
    pub fn new(config: &SupervisorConfig, registry: &ProviderRegistry) -> Self {
        if !config.enabled {
            return Self::disabled();
        }

        let judge = ProviderConfig::new(JUDGE_PROVIDER, config.model.clone());
        match build_chat_client(&judge, registry, config.temperature) {
            Ok(client) => {
                info!(model = %config.model, "grader ready");
                Self::with_client(client)
            }
            Err(e) => {
                warn!(model = %config.model, error = %e, "grader unavailable");
                Self {
                    state: State::Unavailable(e.to_string()),
                }
            }
        }
    }

    /// A grader that never grades.
    pub fn disabled() -> Self {
        Self {
            state: State::Unavailable("disabled".to_string()),
        }
    }

    /// A grader backed by an already-built judge client.
    pub fn with_client(client: ChatClient) -> Self {
        Self {
            state: State::Ready(client),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, State::Ready(_))
    }

    /// Why the grader is unavailable: `disabled` or `{reason}: {detail}`.
    pub fn error(&self) -> Option<&str> {
        match &self.state {
            State::Ready(_) => None,
            State::Unavailable(reason) => Some(reason),
        }
    }

    /// Grade `candidate` for `prompt`.
    ///
    /// Returns `Ok(None)` without doing any work when the grader is
    /// unavailable. Request, validation and decode failures are returned
    /// to the caller.
    pub async fn evaluate(
        &self,
        prompt: &str,
        expected: Option<&str>,
        candidate: &str,
    ) -> Result<Option<SupervisorVerdict>, GradingError> {
        let client = match &self.state {
            State::Ready(client) => client,
            State::Unavailable(_) => return Ok(None),
        };

        let schema = verdict_schema()?;
        let value = client
            .complete_json(grader_messages(prompt, expected, candidate), schema)
            .await?;

        validate_verdict(&value).map_err(GradingError::InvalidVerdict)?;

        let verdict: SupervisorVerdict =
            serde_json::from_value(value).map_err(|e| GradingError::Decode(e.to_string()))?;
        debug!(decision = %verdict.decision(), score = verdict.score(), "graded answer");
        Ok(Some(verdict))
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.state {
            State::Ready(client) => f.debug_tuple("Supervisor").field(client).finish(),
            State::Unavailable(reason) => f
                .debug_struct("Supervisor")
                .field("unavailable", reason)
                .finish(),
        }
    }
}
