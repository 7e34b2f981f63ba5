//! Benchmark runner: bounded fan-out over the record × provider matrix.
//!
//! For every record and every ready provider one unit of work is spawned
//! onto a [`JoinSet`]. All units share a single semaphore, so at most
//! `max_concurrency` of them are past admission at any instant, across the
//! whole matrix. A unit calls the provider, then the grader, and always
//! ends in a [`BenchmarkResult`]: provider errors, grading errors and
//! panics become `error` rows instead of escaping.
//!
//! Providers that never became ready get one synthesized `skipped` row per
//! record, so a finished run holds exactly one row per (record, provider).

use std::collections::HashSet;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use fandom_bench_core::{BenchmarkRecord, BenchmarkResult, ProviderConfig, ProviderStatus, SupervisorVerdict};
use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::client::ChatClient;
use crate::config::{BenchConfig, DEFAULT_MAX_CONCURRENCY};
use crate::providers::{ProviderError, ProviderRegistry};
use crate::readiness::Readiness;
use crate::supervisor::{GradingError, Supervisor, SupervisorConfig};
use crate::RuntimeError;

/// Detail attached to every row of a dry run.
pub const DRY_RUN_DETAIL: &str = "dry_run";

/// Why one unit of work failed.
#[derive(Debug)]
enum UnitFailure {
    Chat(ProviderError),
    Grading(GradingError),
    Panicked(String),
    Aborted(&'static str),
}

impl fmt::Display for UnitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitFailure::Chat(e) => write!(f, "{}", e),
            UnitFailure::Grading(e) => write!(f, "{}", e),
            UnitFailure::Panicked(message) => write!(f, "unit panicked: {}", message),
            UnitFailure::Aborted(reason) => write!(f, "unit aborted: {}", reason),
        }
    }
}

/// A successful call, graded when the grader is ready.
struct UnitSuccess {
    latency: Duration,
    output: String,
    verdict: Option<SupervisorVerdict>,
}

/// Identity of one unit of work.
#[derive(Clone)]
struct UnitKey {
    record_id: String,
    label: String,
    model: String,
}

/// Runs a benchmark over a fixed set of providers.
///
/// Provider readiness and the grader are resolved once, when the runner is
/// built; [`run`](Self::run) can then be called for any number of datasets.
#[derive(Debug)]
pub struct BenchmarkRunner {
    readiness: Readiness,
    supervisor: Arc<Supervisor>,
    max_concurrency: usize,
    temperature: f64,
    dry_run: bool,
}

impl BenchmarkRunner {
    pub fn builder() -> BenchmarkRunnerBuilder {
        BenchmarkRunnerBuilder::new()
    }

    /// Build a runner from a validated config and a provider registry.
    pub fn from_config(config: &BenchConfig, registry: ProviderRegistry) -> Result<Self, RuntimeError> {
        config.validate()?;
        Self::builder()
            .providers(config.providers.clone())
            .registry(registry)
            .supervisor_config(config.supervisor.clone())
            .max_concurrency(config.max_concurrency)
            .temperature(config.temperature)
            .dry_run(config.dry_run)
            .build()
    }

    /// Every configured label with its status, in configured order.
    pub fn provider_statuses(&self) -> Vec<(String, ProviderStatus)> {
        self.readiness.statuses()
    }

    pub fn labels(&self) -> Vec<String> {
        self.readiness.labels()
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Run every record against every configured provider.
    ///
    /// Always returns one result per (record, provider) pair. The order of
    /// executed rows follows completion, not submission; index by
    /// [`BenchmarkResult::pair`] instead of relying on position.
    pub async fn run(&self, records: &[BenchmarkRecord]) -> Vec<BenchmarkResult> {
        if self.dry_run {
            info!(records = records.len(), providers = self.readiness.len(), "dry run");
            return self.dry_run_results(records);
        }

        let records: Vec<Arc<BenchmarkRecord>> = records.iter().cloned().map(Arc::new).collect();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut units = JoinSet::new();
        let mut planned = 0usize;

        for record in &records {
            for (label, model, client) in self.readiness.ready() {
                let key = UnitKey {
                    record_id: record.row_id.clone(),
                    label: label.to_string(),
                    model: model.to_string(),
                };
                let record = Arc::clone(record);
                let client = client.clone();
                let supervisor = Arc::clone(&self.supervisor);
                let semaphore = Arc::clone(&semaphore);

                units.spawn(async move {
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => {
                            return error_result(
                                &key,
                                Duration::ZERO,
                                &UnitFailure::Aborted("concurrency limiter closed"),
                            )
                        }
                    };
                    run_unit(key, record, client, supervisor).await
                });
                planned += 1;
            }
        }

        info!(
            records = records.len(),
            units = planned,
            max_concurrency = self.max_concurrency,
            "benchmark started"
        );

        let mut results = Vec::with_capacity(records.len() * self.readiness.len());
        while let Some(joined) = units.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => warn!(error = %e, "benchmark unit did not complete"),
            }
        }

        if results.len() < planned {
            self.fill_lost_units(&records, &mut results);
        }

        let executed = results.len();
        for (label, model, status) in self.readiness.unready() {
            let detail = status.to_string();
            for record in &records {
                results.push(BenchmarkResult::skipped(
                    record.row_id.clone(),
                    label,
                    model,
                    detail.clone(),
                ));
            }
        }

        info!(
            executed,
            skipped = results.len() - executed,
            "benchmark finished"
        );
        results
    }

    fn dry_run_results(&self, records: &[BenchmarkRecord]) -> Vec<BenchmarkResult> {
        let providers: Vec<(&str, &str)> = self
            .readiness
            .unready()
            .map(|(label, model, _)| (label, model))
            .collect();

        records
            .iter()
            .flat_map(|record| {
                providers.iter().map(move |(label, model)| {
                    BenchmarkResult::skipped(record.row_id.clone(), *label, *model, DRY_RUN_DETAIL)
                })
            })
            .collect()
    }

    /// Add an error row for every executed pair whose task never reported.
    fn fill_lost_units(&self, records: &[Arc<BenchmarkRecord>], results: &mut Vec<BenchmarkResult>) {
        let seen: HashSet<(String, String)> = results
            .iter()
            .map(|r| (r.record_id.clone(), r.provider_label.clone()))
            .collect();

        for record in records {
            for (label, model, _) in self.readiness.ready() {
                if seen.contains(&(record.row_id.clone(), label.to_string())) {
                    continue;
                }
                let key = UnitKey {
                    record_id: record.row_id.clone(),
                    label: label.to_string(),
                    model: model.to_string(),
                };
                results.push(error_result(
                    &key,
                    Duration::ZERO,
                    &UnitFailure::Aborted("task was cancelled"),
                ));
            }
        }
    }
}

/// Call, grade, and convert every outcome into a row.
async fn run_unit(
    key: UnitKey,
    record: Arc<BenchmarkRecord>,
    client: ChatClient,
    supervisor: Arc<Supervisor>,
) -> BenchmarkResult {
    let start = Instant::now();
    let outcome = AssertUnwindSafe(attempt(&record, &client, &supervisor, start))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err((start.elapsed(), UnitFailure::Panicked(panic_message(&*panic)))));

    match outcome {
        Ok(success) => {
            debug!(
                record = %key.record_id,
                provider = %key.label,
                latency = ?success.latency,
                graded = success.verdict.is_some(),
                "unit ok"
            );
            BenchmarkResult::ok(
                key.record_id,
                key.label,
                key.model,
                success.latency,
                success.output,
                success.verdict,
            )
        }
        Err((latency, failure)) => {
            debug!(
                record = %key.record_id,
                provider = %key.label,
                error = %failure,
                "unit failed"
            );
            error_result(&key, latency, &failure)
        }
    }
}

/// The chat call strictly precedes the grading call.
async fn attempt(
    record: &BenchmarkRecord,
    client: &ChatClient,
    supervisor: &Supervisor,
    start: Instant,
) -> Result<UnitSuccess, (Duration, UnitFailure)> {
    let output = client
        .invoke(&record.prompt)
        .await
        .map_err(|e| (start.elapsed(), UnitFailure::Chat(e)))?;
    let latency = start.elapsed();

    let verdict = supervisor
        .evaluate(&record.prompt, record.expected_answer.as_deref(), &output)
        .await
        .map_err(|e| (start.elapsed(), UnitFailure::Grading(e)))?;

    Ok(UnitSuccess {
        latency,
        output,
        verdict,
    })
}

fn error_result(key: &UnitKey, latency: Duration, failure: &UnitFailure) -> BenchmarkResult {
    BenchmarkResult::error(
        key.record_id.clone(),
        key.label.clone(),
        key.model.clone(),
        latency,
        failure.to_string(),
    )
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

enum SupervisorChoice {
    Config(SupervisorConfig),
    Prebuilt(Supervisor),
}

/// Builder for [`BenchmarkRunner`].
pub struct BenchmarkRunnerBuilder {
    providers: Vec<ProviderConfig>,
    registry: Option<ProviderRegistry>,
    supervisor: SupervisorChoice,
    max_concurrency: usize,
    temperature: f64,
    dry_run: bool,
}

impl BenchmarkRunnerBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            registry: None,
            supervisor: SupervisorChoice::Config(SupervisorConfig::default()),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            temperature: 0.0,
            dry_run: false,
        }
    }

    /// Add one provider.
    pub fn provider(mut self, provider: ProviderConfig) -> Self {
        self.providers.push(provider);
        self
    }

    /// Replace the provider list.
    pub fn providers(mut self, providers: Vec<ProviderConfig>) -> Self {
        self.providers = providers;
        self
    }

    /// Registry used to build clients; defaults to
    /// [`ProviderRegistry::with_defaults`].
    pub fn registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Build the grader from this config.
    pub fn supervisor_config(mut self, config: SupervisorConfig) -> Self {
        self.supervisor = SupervisorChoice::Config(config);
        self
    }

    /// Use an already-built grader.
    pub fn supervisor(mut self, supervisor: Supervisor) -> Self {
        self.supervisor = SupervisorChoice::Prebuilt(supervisor);
        self
    }

    /// Global bound on in-flight units; values below 1 become 1.
    pub fn max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Resolve provider readiness and the grader.
    pub fn build(self) -> Result<BenchmarkRunner, RuntimeError> {
        let registry = self.registry.unwrap_or_else(ProviderRegistry::with_defaults);
        let readiness =
            Readiness::resolve(&self.providers, &registry, self.temperature, self.dry_run)?;

        let supervisor = match self.supervisor {
            SupervisorChoice::Prebuilt(supervisor) => supervisor,
            SupervisorChoice::Config(config) => Supervisor::new(&config, &registry),
        };

        Ok(BenchmarkRunner {
            readiness,
            supervisor: Arc::new(supervisor),
            max_concurrency: self.max_concurrency.max(1),
            temperature: self.temperature,
            dry_run: self.dry_run,
        })
    }
}

impl Default for BenchmarkRunnerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
