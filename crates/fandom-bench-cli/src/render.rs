//! Console and JSON reports.

use std::io::{self, Write};

use chrono::{DateTime, Utc};
use fandom_bench_core::{BenchmarkResult, ProviderStatus, RunSummary};
use serde::Serialize;

/// Write the human-readable report.
pub fn render_text<W: Write>(
    out: &mut W,
    statuses: &[(String, ProviderStatus)],
    results: &[BenchmarkResult],
    summary: &RunSummary,
) -> io::Result<()> {
    writeln!(out, "\n=== Provider Readiness ===")?;
    for (label, status) in statuses {
        writeln!(out, "{}: {}", label, status)?;
    }

    writeln!(out, "\n=== Results ===")?;
    for result in results {
        write!(out, "[{}] {}: {}", result.record_id, result.provider_label, result.status)?;
        if let Some(latency) = result.latency_seconds {
            write!(out, " latency={:.2}s", latency)?;
        }
        writeln!(out)?;

        if let Some(detail) = &result.detail {
            writeln!(out, "  detail: {}", detail)?;
        }
        if let Some(output) = result.output.as_deref().filter(|o| !o.is_empty()) {
            writeln!(out, "  output: {}", output)?;
        }
        if let Some(verdict) = &result.supervisor_verdict {
            writeln!(
                out,
                "  supervisor: score={:.2} decision={}",
                verdict.score(),
                verdict.decision()
            )?;
        }
    }

    writeln!(out, "\n=== Summary ===")?;
    for provider in &summary.providers {
        write!(
            out,
            "{}: ok={} error={} skipped={}",
            provider.provider_label, provider.ok, provider.errors, provider.skipped
        )?;
        if let Some(latency) = provider.mean_latency_seconds {
            write!(out, " mean_latency={:.2}s", latency)?;
        }
        if let Some(score) = provider.mean_score {
            write!(out, " mean_score={:.2} graded={}", score, provider.graded)?;
        }
        writeln!(out)?;
    }

    writeln!(
        out,
        "\nProcessed {} records across {} providers.",
        summary.records,
        summary.providers.len()
    )
}

/// Machine-readable report written by `--json`.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub dry_run: bool,
    pub providers: Vec<ProviderStatusEntry<'a>>,
    pub summary: &'a RunSummary,
    pub results: &'a [BenchmarkResult],
}

#[derive(Debug, Serialize)]
pub struct ProviderStatusEntry<'a> {
    pub label: &'a str,
    pub status: &'a ProviderStatus,
}

impl<'a> JsonReport<'a> {
    pub fn new(
        dry_run: bool,
        statuses: &'a [(String, ProviderStatus)],
        summary: &'a RunSummary,
        results: &'a [BenchmarkResult],
    ) -> Self {
        Self {
            generated_at: Utc::now(),
            dry_run,
            providers: statuses
                .iter()
                .map(|(label, status)| ProviderStatusEntry { label, status })
                .collect(),
            summary,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fandom_bench_core::{Decision, SetupReason, SupervisorVerdict};
    use std::time::Duration;

    fn sample() -> (Vec<(String, ProviderStatus)>, Vec<BenchmarkResult>) {
        let statuses = vec![
            ("openai-gpt-x".to_string(), ProviderStatus::Ready),
            (
                "cohere-command".to_string(),
                ProviderStatus::skipped(SetupReason::MissingApiKey, "Set COHERE_API_KEY to enable this provider"),
            ),
        ];
        let verdict = SupervisorVerdict::new(1.0, Decision::Correct, "exact match").unwrap();
        let results = vec![
            BenchmarkResult::ok("r1", "openai-gpt-x", "gpt-x", Duration::from_millis(250), "4", Some(verdict)),
            BenchmarkResult::skipped(
                "r1",
                "cohere-command",
                "command",
                statuses[1].1.to_string(),
            ),
        ];
        (statuses, results)
    }

    #[test]
    fn test_text_report_lines() {
        let (statuses, results) = sample();
        let summary = RunSummary::from_results(1, &results);
        let mut buf = Vec::new();
        render_text(&mut buf, &statuses, &results, &summary).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("openai-gpt-x: ready"));
        assert!(text.contains("[r1] openai-gpt-x: ok latency=0.25s"));
        assert!(text.contains("  output: 4"));
        assert!(text.contains("  supervisor: score=1.00 decision=correct"));
        assert!(text.contains("[r1] cohere-command: skipped\n"));
        assert!(text.contains("  detail: skipped (missing_api_key) - Set COHERE_API_KEY"));
        assert!(text.contains("Processed 1 records across 2 providers."));
    }

    #[test]
    fn test_json_report_shape() {
        let (statuses, results) = sample();
        let summary = RunSummary::from_results(1, &results);
        let report = JsonReport::new(false, &statuses, &summary, &results);
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["providers"][0]["label"], "openai-gpt-x");
        assert_eq!(value["providers"][0]["status"]["state"], "ready");
        assert_eq!(value["providers"][1]["status"]["reason"], "missing_api_key");
        assert_eq!(value["results"][0]["supervisor_verdict"]["decision"], "correct");
        assert_eq!(value["summary"]["records"], 1);
        assert!(value["generated_at"].is_string());
    }
}
