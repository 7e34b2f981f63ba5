//! CSV dataset loading.
//!
//! Expects a header row. The prompt and expected-answer columns are
//! configurable; the row identifier comes from `id`, falling back to
//! `row_id`. Every other column lands in the record's metadata.
//!
//! ```text
//! id,prompt,expected_answer,category
//! r1,2+2?,4,math
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::types::BenchmarkRecord;

/// Columns that identify a row.
const ID_COLUMNS: [&str; 2] = ["id", "row_id"];

/// Errors that abort dataset loading.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Failed to read dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV missing {role} column '{column}'")]
    MissingColumn { role: &'static str, column: String },

    #[error("CSV row {row} missing id/row_id column")]
    MissingRowId { row: usize },
}

/// How to map CSV columns onto records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetOptions {
    /// Column holding the prompt
    pub prompt_column: String,

    /// Column holding the expected answer
    pub expected_column: String,

    /// Stop after this many records (`None` or 0 loads everything)
    pub max_records: Option<usize>,
}

impl Default for DatasetOptions {
    fn default() -> Self {
        Self {
            prompt_column: "prompt".to_string(),
            expected_column: "expected_answer".to_string(),
            max_records: None,
        }
    }
}

impl DatasetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prompt_column(mut self, column: impl Into<String>) -> Self {
        self.prompt_column = column.into();
        self
    }

    pub fn with_expected_column(mut self, column: impl Into<String>) -> Self {
        self.expected_column = column.into();
        self
    }

    pub fn with_max_records(mut self, max_records: Option<usize>) -> Self {
        self.max_records = max_records;
        self
    }

    fn limit(&self) -> Option<usize> {
        self.max_records.filter(|&n| n > 0)
    }
}

/// Load records from a CSV file.
pub fn load_dataset(
    path: impl AsRef<Path>,
    options: &DatasetOptions,
) -> Result<Vec<BenchmarkRecord>, DatasetError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let records = parse_dataset(BufReader::new(file), options)?;
    tracing::info!(path = %path.display(), records = records.len(), "Loaded dataset");
    Ok(records)
}

/// Parse records from any CSV reader.
pub fn parse_dataset<R: Read>(
    reader: R,
    options: &DatasetOptions,
) -> Result<Vec<BenchmarkRecord>, DatasetError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let column_index = |name: &str| headers.iter().position(|h| h == name);

    let prompt_idx =
        column_index(&options.prompt_column).ok_or_else(|| DatasetError::MissingColumn {
            role: "prompt",
            column: options.prompt_column.clone(),
        })?;
    let expected_idx =
        column_index(&options.expected_column).ok_or_else(|| DatasetError::MissingColumn {
            role: "expected",
            column: options.expected_column.clone(),
        })?;
    let id_indices: Vec<usize> = ID_COLUMNS.iter().filter_map(|c| column_index(c)).collect();

    let limit = options.limit();
    let mut records = Vec::new();

    for (row_idx, row) in csv_reader.records().enumerate() {
        let row = row?;

        let row_id = id_indices
            .iter()
            .filter_map(|&i| row.get(i))
            .find(|v| !v.is_empty())
            .ok_or(DatasetError::MissingRowId { row: row_idx + 1 })?
            .to_string();

        let prompt = row.get(prompt_idx).unwrap_or_default().to_string();
        let expected_answer = row
            .get(expected_idx)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        let metadata: BTreeMap<String, String> = headers
            .iter()
            .zip(row.iter())
            .enumerate()
            .filter(|(i, (name, _))| {
                *i != prompt_idx && *i != expected_idx && !ID_COLUMNS.contains(name)
            })
            .map(|(_, (name, value))| (name.to_string(), value.to_string()))
            .collect();

        records.push(BenchmarkRecord {
            row_id,
            prompt,
            expected_answer,
            metadata,
        });

        if limit.is_some_and(|n| records.len() >= n) {
            break;
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC_CSV: &str = "\
id,prompt,expected_answer,category
r1,2+2?,4,math
r2,Capital of France?,,geo
r3,Largest planet?,Jupiter,astro
";

    #[test]
    fn test_parse_basic_dataset() {
        let records = parse_dataset(BASIC_CSV.as_bytes(), &DatasetOptions::default()).unwrap();
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].row_id, "r1");
        assert_eq!(records[0].prompt, "2+2?");
        assert_eq!(records[0].expected_answer.as_deref(), Some("4"));
        assert_eq!(records[0].metadata.get("category").map(String::as_str), Some("math"));
        assert!(!records[0].metadata.contains_key("id"));
        assert!(!records[0].metadata.contains_key("prompt"));
    }

    #[test]
    fn test_empty_expected_is_none() {
        let records = parse_dataset(BASIC_CSV.as_bytes(), &DatasetOptions::default()).unwrap();
        assert_eq!(records[1].expected_answer, None);
    }

    #[test]
    fn test_max_records_stops_early() {
        let options = DatasetOptions::default().with_max_records(Some(2));
        let records = parse_dataset(BASIC_CSV.as_bytes(), &options).unwrap();
        assert_eq!(records.len(), 2);

        let unlimited = DatasetOptions::default().with_max_records(Some(0));
        let records = parse_dataset(BASIC_CSV.as_bytes(), &unlimited).unwrap();
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn test_row_id_column_fallback() {
        let data = "row_id,question,answer\nq1,Hi?,Hello\n";
        let options = DatasetOptions::default()
            .with_prompt_column("question")
            .with_expected_column("answer");
        let records = parse_dataset(data.as_bytes(), &options).unwrap();
        assert_eq!(records[0].row_id, "q1");
        assert_eq!(records[0].prompt, "Hi?");
        assert!(records[0].metadata.is_empty());
    }

    #[test]
    fn test_missing_prompt_column() {
        let data = "id,question,expected_answer\nr1,Hi?,Hello\n";
        let result = parse_dataset(data.as_bytes(), &DatasetOptions::default());
        assert!(matches!(
            result,
            Err(DatasetError::MissingColumn { role: "prompt", .. })
        ));
    }

    #[test]
    fn test_missing_expected_column() {
        let data = "id,prompt\nr1,Hi?\n";
        let result = parse_dataset(data.as_bytes(), &DatasetOptions::default());
        assert!(matches!(
            result,
            Err(DatasetError::MissingColumn { role: "expected", .. })
        ));
    }

    #[test]
    fn test_missing_row_id_is_fatal() {
        let data = "id,prompt,expected_answer\nr1,a,b\n,c,d\n";
        let result = parse_dataset(data.as_bytes(), &DatasetOptions::default());
        assert!(matches!(result, Err(DatasetError::MissingRowId { row: 2 })));

        let no_id_column = "prompt,expected_answer\na,b\n";
        let result = parse_dataset(no_id_column.as_bytes(), &DatasetOptions::default());
        assert!(matches!(result, Err(DatasetError::MissingRowId { row: 1 })));
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_dataset("/nonexistent/dataset.csv", &DatasetOptions::default());
        assert!(matches!(result, Err(DatasetError::Io { .. })));
    }
}
