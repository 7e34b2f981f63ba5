//! JSON Schema for grader verdicts.
//!
//! The same schema is sent to providers that support schema-constrained
//! output and used to check every judge response before it is decoded.

use serde_json::Value as JsonValue;
use std::sync::OnceLock;
use thiserror::Error;

/// Embedded verdict schema (loaded at compile time).
const VERDICT_SCHEMA_JSON: &str = include_str!("../schema/supervisor_verdict.schema.json");

/// Parsed schema document.
static SCHEMA_VALUE: OnceLock<Result<JsonValue, String>> = OnceLock::new();

/// Compiled validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

/// Errors from schema loading.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to load schema: {0}")]
    LoadError(String),
}

/// The verdict schema as a JSON value.
pub fn verdict_schema() -> Result<&'static JsonValue, SchemaError> {
    let result = SCHEMA_VALUE.get_or_init(|| {
        serde_json::from_str(VERDICT_SCHEMA_JSON).map_err(|e| format!("Invalid schema JSON: {}", e))
    });

    result
        .as_ref()
        .map_err(|e| SchemaError::LoadError(e.clone()))
}

fn get_validator() -> Result<&'static jsonschema::Validator, SchemaError> {
    let schema = verdict_schema()?;
    let result = COMPILED_SCHEMA.get_or_init(|| {
        jsonschema::options()
            .build(schema)
            .map_err(|e| format!("Failed to compile schema: {}", e))
    });

    result
        .as_ref()
        .map_err(|e| SchemaError::LoadError(e.clone()))
}

/// Validate a judge response against the verdict schema.
///
/// Returns every violation found, each with its instance path.
pub fn validate_verdict(value: &JsonValue) -> Result<(), Vec<String>> {
    let validator = get_validator().map_err(|e| vec![e.to_string()])?;

    let errors: Vec<String> = validator
        .iter_errors(value)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
