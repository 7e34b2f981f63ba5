//! fandom-bench - CSV-driven async LLM benchmarker
//!
//! Sends every prompt of a CSV dataset to each configured provider,
//! grades the answers with a judge model and prints a report.
//!
//! ```text
//! fandom-bench --csv prompts.csv \
//!     --provider openai:gpt-4o-mini \
//!     --provider anthropic:claude-sonnet-4-5:sonnet \
//!     --max-concurrency 4
//! ```

mod render;

use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use fandom_bench_core::{load_dataset, ProviderConfig, RunSummary};
use fandom_bench_runtime::{BenchConfig, BenchmarkRunner, ProviderRegistry};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::render::{render_text, JsonReport};

#[derive(Parser, Debug)]
#[command(name = "fandom-bench")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "CSV-driven async LLM benchmarker", long_about = None)]
struct Cli {
    /// Path to the CSV dataset
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Provider to benchmark as provider:model[:name] (repeatable)
    #[arg(long = "provider", value_name = "PROVIDER:MODEL[:NAME]")]
    providers: Vec<ProviderConfig>,

    /// Benchmark config file (.yaml, .yml or .json); flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// OpenAI model used for grading [default: gpt-5]
    #[arg(long)]
    supervisor_model: Option<String>,

    /// CSV column holding the prompt [default: prompt]
    #[arg(long)]
    prompt_column: Option<String>,

    /// CSV column holding the expected answer [default: expected_answer]
    #[arg(long)]
    expected_column: Option<String>,

    /// Maximum provider calls in flight across the whole run [default: 3]
    #[arg(long)]
    max_concurrency: Option<usize>,

    /// Only load the first N records
    #[arg(long)]
    max_records: Option<usize>,

    /// Sampling temperature for providers and grader [default: 0.0]
    #[arg(long)]
    temperature: Option<f64>,

    /// Skip network calls; only report wiring
    #[arg(long)]
    dry_run: bool,

    /// Disable grading
    #[arg(long)]
    no_supervisor: bool,

    /// Also write results and summary as JSON to this file
    #[arg(long, value_name = "FILE")]
    json: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Config file (or defaults) with command-line flags applied on top.
    fn bench_config(&self) -> Result<BenchConfig> {
        let mut config = match &self.config {
            Some(path) => BenchConfig::from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => BenchConfig::default(),
        };

        if let Some(csv) = &self.csv {
            config.csv = Some(csv.clone());
        }
        if !self.providers.is_empty() {
            config.providers = self.providers.clone();
        }
        if let Some(model) = &self.supervisor_model {
            config.supervisor.model = model.clone();
        }
        if let Some(column) = &self.prompt_column {
            config.dataset.prompt_column = column.clone();
        }
        if let Some(column) = &self.expected_column {
            config.dataset.expected_column = column.clone();
        }
        if let Some(max) = self.max_concurrency {
            config.max_concurrency = max;
        }
        if self.max_records.is_some() {
            config.dataset.max_records = self.max_records;
        }
        if let Some(temperature) = self.temperature {
            config.temperature = temperature;
            config.supervisor.temperature = temperature;
        }
        if self.dry_run {
            config.dry_run = true;
        }
        if self.no_supervisor {
            config.supervisor.enabled = false;
        }

        config.validate().context("Invalid benchmark configuration")?;
        Ok(config)
    }
}

fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    init_tracing(cli.verbose);

    let config = cli.bench_config()?;
    let Some(csv) = config.csv.clone() else {
        bail!("No dataset given: pass --csv or set `csv` in the config file");
    };

    let records = load_dataset(&csv, &config.dataset)
        .with_context(|| format!("Failed to load dataset {}", csv.display()))?;
    info!(records = records.len(), path = %csv.display(), "dataset loaded");

    let runner = BenchmarkRunner::from_config(&config, ProviderRegistry::with_defaults())
        .context("Failed to set up benchmark")?;
    if let Some(reason) = runner.supervisor().error() {
        info!(reason, "grading disabled");
    }

    let results = runner.run(&records).await;
    let statuses = runner.provider_statuses();
    let summary = RunSummary::from_results(records.len(), &results);

    let stdout = io::stdout();
    render_text(&mut stdout.lock(), &statuses, &results, &summary)
        .context("Failed to write report")?;

    if let Some(path) = &cli.json {
        let report = JsonReport::new(runner.is_dry_run(), &statuses, &summary, &results);
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "wrote JSON report");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_parse() {
        let cli = Cli::try_parse_from([
            "fandom-bench",
            "--csv",
            "data.csv",
            "--provider",
            "openai:gpt-4o-mini",
            "--provider",
            "anthropic:claude:sonnet",
            "--max-concurrency",
            "5",
            "--temperature",
            "0.3",
            "--no-supervisor",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.providers.len(), 2);
        assert_eq!(cli.providers[1].label(), "sonnet");
        assert_eq!(cli.verbose, 2);

        let config = cli.bench_config().unwrap();
        assert_eq!(config.csv, Some(PathBuf::from("data.csv")));
        assert_eq!(config.max_concurrency, 5);
        assert_eq!(config.temperature, 0.3);
        assert_eq!(config.supervisor.temperature, 0.3);
        assert!(!config.supervisor.enabled);
        assert!(!config.dry_run);
    }

    #[test]
    fn test_default_flag_values() {
        let cli = Cli::try_parse_from(["fandom-bench", "--csv", "d.csv", "--provider", "groq:llama"])
            .unwrap();
        let config = cli.bench_config().unwrap();
        assert_eq!(config.max_concurrency, 3);
        assert_eq!(config.supervisor.model, "gpt-5");
        assert!(config.supervisor.enabled);
        assert_eq!(config.dataset.prompt_column, "prompt");
        assert_eq!(config.dataset.expected_column, "expected_answer");
    }

    #[test]
    fn test_bad_provider_argument_rejected() {
        let result = Cli::try_parse_from(["fandom-bench", "--csv", "d.csv", "--provider", "openai"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_providers_required() {
        let cli = Cli::try_parse_from(["fandom-bench", "--csv", "d.csv"]).unwrap();
        assert!(cli.bench_config().is_err());
    }
}
