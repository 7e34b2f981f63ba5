//! # fandom-bench-runtime
//!
//! Async orchestration for the fandom-bench LLM benchmarker.
//!
//! This crate turns provider configs into chat clients, fans a
//! record × provider matrix out under a single concurrency bound, grades
//! every successful answer with a judge model, and hands back exactly one
//! [`BenchmarkResult`](fandom_bench_core::BenchmarkResult) per pair.
//!
//! Misconfigured providers never fail a run: they are resolved to a
//! skipped status up front and reported on every row they would have
//! produced.
//!
//! ## Features
//!
//! Concrete HTTP clients are compiled in per provider family:
//! `openai` (also serves `mistral` and `groq`), `anthropic`, `cohere`, or
//! `all-providers`. A provider whose client is not compiled in is reported
//! as `missing_dependency`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use fandom_bench_runtime::{BenchmarkRunner, SupervisorConfig};
//!
//! let runner = BenchmarkRunner::builder()
//!     .provider("openai:gpt-4o-mini".parse()?)
//!     .provider("anthropic:claude-sonnet-4-5:sonnet".parse()?)
//!     .supervisor_config(SupervisorConfig::default())
//!     .max_concurrency(4)
//!     .build()?;
//!
//! let results = runner.run(&records).await;
//! ```

use thiserror::Error;

pub mod client;
pub mod config;
pub mod prompts;
pub mod providers;
pub mod readiness;
pub mod runner;
pub mod supervisor;

pub use client::ChatClient;
pub use config::{BenchConfig, ConfigError, DEFAULT_MAX_CONCURRENCY};
pub use providers::{
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError,
    ProviderFactory, ProviderRegistry, ProviderSpec,
};
pub use readiness::{build_chat_client, ProviderSetupError, Readiness};
pub use runner::{BenchmarkRunner, BenchmarkRunnerBuilder, DRY_RUN_DETAIL};
pub use supervisor::{GradingError, Supervisor, SupervisorConfig};

/// Errors building a benchmark run.
///
/// Provider and grading failures are not here: they end up on result rows.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Duplicate provider label: {0}")]
    DuplicateLabel(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
