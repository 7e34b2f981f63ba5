//! Aggregation over a completed run.
//!
//! Result order is unspecified, so everything here indexes by
//! `(record_id, provider_label)` or groups by provider label.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::types::{BenchmarkRecord, BenchmarkResult, ResultStatus};

/// Per-provider totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderSummary {
    pub provider_label: String,

    /// Status of the first row seen for this provider
    pub first_status: ResultStatus,

    pub ok: usize,
    pub errors: usize,
    pub skipped: usize,

    /// Rows that carry a verdict
    pub graded: usize,

    /// Mean over rows with a latency
    pub mean_latency_seconds: Option<f64>,

    /// Mean verdict score over graded rows
    pub mean_score: Option<f64>,
}

/// Totals for a whole run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub records: usize,
    pub results: usize,

    /// One entry per provider label, in first-seen order
    pub providers: Vec<ProviderSummary>,
}

#[derive(Default)]
struct Accumulator {
    first_status: Option<ResultStatus>,
    ok: usize,
    errors: usize,
    skipped: usize,
    latency_sum: f64,
    latency_count: usize,
    score_sum: f64,
    graded: usize,
}

impl RunSummary {
    /// Summarize `results` for a dataset of `record_count` records.
    pub fn from_results(record_count: usize, results: &[BenchmarkResult]) -> Self {
        let mut order: Vec<&str> = Vec::new();
        let mut acc: BTreeMap<&str, Accumulator> = BTreeMap::new();

        for result in results {
            let entry = acc.entry(result.provider_label.as_str()).or_insert_with(|| {
                order.push(result.provider_label.as_str());
                Accumulator::default()
            });

            entry.first_status.get_or_insert(result.status);
            match result.status {
                ResultStatus::Ok => entry.ok += 1,
                ResultStatus::Error => entry.errors += 1,
                ResultStatus::Skipped => entry.skipped += 1,
            }
            if let Some(latency) = result.latency_seconds {
                entry.latency_sum += latency;
                entry.latency_count += 1;
            }
            if let Some(verdict) = &result.supervisor_verdict {
                entry.score_sum += verdict.score();
                entry.graded += 1;
            }
        }

        let providers = order
            .into_iter()
            .filter_map(|label| {
                let a = acc.remove(label)?;
                Some(ProviderSummary {
                    provider_label: label.to_string(),
                    first_status: a.first_status.unwrap_or(ResultStatus::Skipped),
                    ok: a.ok,
                    errors: a.errors,
                    skipped: a.skipped,
                    graded: a.graded,
                    mean_latency_seconds: mean(a.latency_sum, a.latency_count),
                    mean_score: mean(a.score_sum, a.graded),
                })
            })
            .collect();

        Self {
            records: record_count,
            results: results.len(),
            providers,
        }
    }
}

fn mean(sum: f64, count: usize) -> Option<f64> {
    (count > 0).then(|| sum / count as f64)
}

/// Lookup of results by `(record_id, provider_label)`.
#[derive(Debug)]
pub struct ResultIndex<'a> {
    by_pair: BTreeMap<(&'a str, &'a str), &'a BenchmarkResult>,
    duplicates: Vec<(String, String)>,
}

impl<'a> ResultIndex<'a> {
    /// Index `results`; later duplicates of a pair are recorded, not kept.
    pub fn build(results: &'a [BenchmarkResult]) -> Self {
        let mut by_pair = BTreeMap::new();
        let mut duplicates = Vec::new();

        for result in results {
            if by_pair.insert(result.pair(), result).is_some() {
                duplicates.push((result.record_id.clone(), result.provider_label.clone()));
            }
        }

        Self { by_pair, duplicates }
    }

    pub fn get(&self, record_id: &str, provider_label: &str) -> Option<&'a BenchmarkResult> {
        self.by_pair.get(&(record_id, provider_label)).copied()
    }

    pub fn len(&self) -> usize {
        self.by_pair.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_pair.is_empty()
    }

    /// Pairs that appeared more than once.
    pub fn duplicates(&self) -> &[(String, String)] {
        &self.duplicates
    }

    /// Pairs of the full `records` x `labels` product with no result.
    pub fn missing_pairs(
        &self,
        records: &[BenchmarkRecord],
        labels: &[String],
    ) -> Vec<(String, String)> {
        let mut missing = Vec::new();
        let mut seen = BTreeSet::new();
        for record in records {
            for label in labels {
                let pair = (record.row_id.as_str(), label.as_str());
                if seen.insert(pair) && !self.by_pair.contains_key(&pair) {
                    missing.push((record.row_id.clone(), label.clone()));
                }
            }
        }
        missing
    }

    /// True when every pair appears exactly once and nothing else does.
    pub fn is_complete(&self, records: &[BenchmarkRecord], labels: &[String]) -> bool {
        let unique_records: BTreeSet<&str> = records.iter().map(|r| r.row_id.as_str()).collect();
        let unique_labels: BTreeSet<&str> = labels.iter().map(String::as_str).collect();

        self.duplicates.is_empty()
            && self.missing_pairs(records, labels).is_empty()
            && self.by_pair.len() == unique_records.len() * unique_labels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Decision, SupervisorVerdict};
    use std::time::Duration;

    fn sample_results() -> Vec<BenchmarkResult> {
        let verdict = SupervisorVerdict::new(0.5, Decision::Partial, "close").unwrap();
        vec![
            BenchmarkResult::ok("r1", "a", "m", Duration::from_secs(1), "x", Some(verdict)),
            BenchmarkResult::error("r2", "a", "m", Duration::from_secs(3), "boom"),
            BenchmarkResult::skipped("r1", "b", "m", "skipped (missing_api_key) - Set KEY"),
            BenchmarkResult::skipped("r2", "b", "m", "skipped (missing_api_key) - Set KEY"),
        ]
    }

    #[test]
    fn test_summary_counts_per_provider() {
        let results = sample_results();
        let summary = RunSummary::from_results(2, &results);

        assert_eq!(summary.records, 2);
        assert_eq!(summary.results, 4);
        assert_eq!(summary.providers.len(), 2);

        let a = &summary.providers[0];
        assert_eq!(a.provider_label, "a");
        assert_eq!(a.first_status, ResultStatus::Ok);
        assert_eq!((a.ok, a.errors, a.skipped), (1, 1, 0));
        assert_eq!(a.mean_latency_seconds, Some(2.0));
        assert_eq!(a.mean_score, Some(0.5));

        let b = &summary.providers[1];
        assert_eq!(b.first_status, ResultStatus::Skipped);
        assert_eq!(b.skipped, 2);
        assert_eq!(b.mean_latency_seconds, None);
        assert_eq!(b.mean_score, None);
    }

    #[test]
    fn test_index_lookup_and_completeness() {
        let results = sample_results();
        let index = ResultIndex::build(&results);
        let records = vec![BenchmarkRecord::new("r1", "p"), BenchmarkRecord::new("r2", "p")];
        let labels = vec!["a".to_string(), "b".to_string()];

        assert_eq!(index.len(), 4);
        assert!(index.get("r2", "a").is_some());
        assert!(index.get("r3", "a").is_none());
        assert!(index.is_complete(&records, &labels));

        let labels = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let missing = index.missing_pairs(&records, &labels);
        assert_eq!(missing.len(), 2);
        assert!(!index.is_complete(&records, &labels));
    }

    #[test]
    fn test_index_detects_duplicates() {
        let mut results = sample_results();
        results.push(BenchmarkResult::skipped("r1", "a", "m", "again"));
        let index = ResultIndex::build(&results);
        assert_eq!(index.duplicates().len(), 1);

        let records = vec![BenchmarkRecord::new("r1", "p"), BenchmarkRecord::new("r2", "p")];
        let labels = vec!["a".to_string(), "b".to_string()];
        assert!(!index.is_complete(&records, &labels));
    }
}
