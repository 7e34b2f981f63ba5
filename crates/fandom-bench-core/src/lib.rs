//! # fandom-bench-core
//!
//! Deterministic building blocks for the fandom-bench LLM benchmarker.
//!
//! This crate holds everything a benchmark run produces or consumes that
//! does not touch the network:
//! - Records, provider configs, statuses, results and verdicts
//! - CSV dataset loading
//! - The JSON Schema every grader verdict is checked against
//! - Run summaries indexed by (record, provider)
//!
//! The async orchestration lives in `fandom-bench-runtime`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use fandom_bench_core::{load_dataset, DatasetOptions, ProviderConfig};
//!
//! let records = load_dataset("prompts.csv", &DatasetOptions::default())?;
//! let provider: ProviderConfig = "openai:gpt-4o-mini".parse()?;
//! assert_eq!(provider.label(), "openai-gpt-4o-mini");
//! ```

pub mod dataset;
pub mod report;
pub mod schema;
pub mod types;

// Re-export main types at crate root
pub use dataset::{load_dataset, parse_dataset, DatasetError, DatasetOptions};
pub use report::{ProviderSummary, ResultIndex, RunSummary};
pub use schema::{validate_verdict, verdict_schema, SchemaError};
pub use types::{
    BenchmarkRecord, BenchmarkResult, Decision, ProviderConfig, ProviderParseError,
    ProviderStatus, ResultStatus, SetupReason, SupervisorVerdict, VerdictError,
};
