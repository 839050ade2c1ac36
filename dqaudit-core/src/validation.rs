//! JSON Schema validation for assessment documents.
//!
//! An assessment document bundles the dataset, the rule configuration and
//! optional engine settings:
//!
//! ```json
//! {
//!   "format_version": "1.0",
//!   "dataset": { "columns": ["email"], "rows": [["a@example.com"], [""]] },
//!   "rules": [{ "rule": "not_null", "columns": ["email"] }],
//!   "engine": { "default_fuzzy_threshold": 85 }
//! }
//! ```
//!
//! Documents are checked against an embedded JSON Schema before they are
//! deserialized, so structural mistakes are reported with the offending
//! field instead of a bare serde message.
//!
//! # Example
//! ```rust
//! use dqaudit_core::validation::validate_and_parse_document;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let document = validate_and_parse_document(
//!     r#"{
//!         "dataset": { "columns": ["email"], "rows": [["a@example.com"]] },
//!         "rules": [{ "rule": "not_null", "columns": ["email"] }]
//!     }"#,
//! )?;
//! assert_eq!(document.rules.len(), 1);
//! # Ok(())
//! # }
//! ```

use jsonschema::Validator;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;

use crate::models::Dataset;
use crate::quality::{EngineConfig, RuleConfig};

/// JSON Schema validation errors with field-level reporting
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Schema compilation failed during initialization
    #[error("JSON Schema compilation failed: {message}")]
    SchemaCompilation { message: String },

    /// Validation failed with specific field errors
    #[error("Document validation failed with {error_count} errors: {errors:?}")]
    ValidationFailed {
        error_count: usize,
        errors: Vec<String>,
    },

    /// Unsupported format version detected
    #[error("Unsupported format version '{version}'. Supported versions: {supported:?}")]
    UnsupportedVersion {
        version: String,
        supported: Vec<String>,
    },

    /// JSON parsing error
    #[error("JSON parsing failed: {source}")]
    JsonParsing {
        #[from]
        source: serde_json::Error,
    },
}

/// Supported document format versions
const SUPPORTED_VERSIONS: &[&str] = &["1.0"];

/// Embedded JSON Schema for v1.0 assessment documents
const SCHEMA_V1_0: &str = r#"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "title": "dqaudit Assessment Document v1.0",
  "type": "object",
  "required": ["dataset", "rules"],
  "properties": {
    "format_version": {
      "type": "string",
      "pattern": "^1\\.0$"
    },
    "dataset": {
      "type": "object",
      "required": ["columns"],
      "properties": {
        "columns": {
          "type": "array",
          "items": { "type": "string" },
          "uniqueItems": true
        },
        "rows": {
          "type": "array",
          "items": {
            "type": "array",
            "items": { "type": ["string", "number", "boolean", "null"] }
          }
        }
      }
    },
    "rules": {
      "type": "array",
      "items": {
        "type": "object",
        "required": ["rule", "columns"],
        "properties": {
          "rule": {
            "enum": [
              "not_null", "not_empty", "whitespace_only", "minimum_length",
              "mandatory_column", "data_type", "email_format", "phone_format",
              "id_format", "date_format", "numeric_range", "allowed_values",
              "custom_regex", "length_check", "format_check",
              "special_chars_not_allowed", "single_column_exact",
              "combination_exact", "hybrid_fuzzy", "trim_spaces",
              "remove_extra_spaces", "proper_case", "lowercase", "uppercase",
              "remove_special_chars", "normalize_date",
              "replace_null_with_default"
            ]
          },
          "columns": {
            "type": "array",
            "items": { "type": "string", "minLength": 1 }
          },
          "min_length": { "type": "integer", "minimum": 0 },
          "max_length": { "type": "integer", "minimum": 0 },
          "data_type": { "type": "string" },
          "pattern": { "type": "string" },
          "label": { "type": "string" },
          "format": { "type": "string" },
          "min": { "type": "number" },
          "max": { "type": "number" },
          "values": { "type": "array", "items": { "type": "string" } },
          "case_sensitive": { "type": "boolean" },
          "allowed_pattern": { "type": "string" },
          "target_format": { "type": "string" },
          "default_value": { "type": "string" },
          "threshold": { "type": "number" },
          "weights": { "type": "array", "items": { "type": "number" } },
          "max_pairs_per_block": { "type": "integer", "minimum": 1 },
          "ignore_nulls": { "type": "boolean" }
        }
      }
    },
    "engine": {
      "type": "object",
      "properties": {
        "max_pairs_per_block": { "type": "integer", "minimum": 1 },
        "fuzzy_ignore_nulls": { "type": "boolean" },
        "default_min_length": { "type": "integer", "minimum": 0 },
        "default_range_min": { "type": "number" },
        "default_range_max": { "type": "number" },
        "default_date_format": { "type": "string", "minLength": 1 },
        "default_null_replacement": { "type": "string" },
        "default_fuzzy_threshold": { "type": "number", "minimum": 0, "maximum": 100 },
        "scorer_backend": { "enum": ["ensemble", "scalar"] }
      },
      "additionalProperties": false
    }
  }
}"#;

/// A validated, deserialized assessment document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentDocument {
    /// Document format version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_version: Option<String>,
    /// The table to assess
    pub dataset: Dataset,
    /// Rule configuration, in execution order
    pub rules: Vec<RuleConfig>,
    /// Engine settings; defaults apply to anything omitted
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Compiled JSON Schema instance (initialized once)
static COMPILED_SCHEMA: OnceLock<Validator> = OnceLock::new();

/// Initialize and compile the JSON Schema for validation
///
/// This function compiles the embedded JSON Schema and caches it for reuse.
/// Calling it more than once is harmless.
///
/// # Errors
/// Returns `ValidationError::SchemaCompilation` if the embedded schema is invalid.
pub fn initialize_schema_validator() -> Result<(), ValidationError> {
    if COMPILED_SCHEMA.get().is_some() {
        return Ok(());
    }

    let schema_json = get_schema_definition()?;
    let compiled = jsonschema::validator_for(&schema_json).map_err(|e| {
        ValidationError::SchemaCompilation {
            message: format!("Schema compilation error: {}", e),
        }
    })?;

    // Another thread may have won the race; either instance is equivalent
    let _ = COMPILED_SCHEMA.set(compiled);

    Ok(())
}

/// Validate an assessment document against the JSON Schema
///
/// # Errors
/// Returns the first schema violation, or an unsupported-version error.
pub fn validate_assessment_document(json_value: &Value) -> Result<(), ValidationError> {
    initialize_schema_validator()?;
    let schema = COMPILED_SCHEMA
        .get()
        .ok_or_else(|| ValidationError::SchemaCompilation {
            message: "Schema validator not initialized".to_string(),
        })?;

    validate_format_version(json_value)?;

    if let Err(validation_error) = schema.validate(json_value) {
        return Err(ValidationError::ValidationFailed {
            error_count: 1,
            errors: vec![format!("Schema validation failed: {}", validation_error)],
        });
    }

    validate_row_widths(json_value)?;

    Ok(())
}

/// Checks `format_version` when present.
fn validate_format_version(json_value: &Value) -> Result<(), ValidationError> {
    let Some(version) = json_value.get("format_version") else {
        return Ok(());
    };
    let version = version.as_str().unwrap_or_default();

    if !SUPPORTED_VERSIONS.contains(&version) {
        return Err(ValidationError::UnsupportedVersion {
            version: version.to_string(),
            supported: SUPPORTED_VERSIONS.iter().map(|s| s.to_string()).collect(),
        });
    }

    Ok(())
}

/// Reports every row whose width differs from the column count.
///
/// JSON Schema cannot relate one array's length to another's, so this is
/// checked here with row-level messages.
fn validate_row_widths(json_value: &Value) -> Result<(), ValidationError> {
    let Some(dataset) = json_value.get("dataset") else {
        return Ok(());
    };
    let width = dataset
        .get("columns")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    let errors: Vec<String> = dataset
        .get("rows")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .enumerate()
        .filter_map(|(index, row)| {
            let cells = row.as_array().map_or(0, Vec::len);
            (cells != width).then(|| {
                format!(
                    "dataset.rows[{}] has {} cells but there are {} columns",
                    index, cells, width
                )
            })
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::ValidationFailed {
            error_count: errors.len(),
            errors,
        })
    }
}

/// Validate and load an assessment document from JSON
///
/// Combines JSON parsing, schema validation, and deserialization into a
/// single operation.
///
/// # Errors
/// Returns validation errors for malformed JSON or schema violations.
pub fn validate_and_parse_document(json_str: &str) -> Result<AssessmentDocument, ValidationError> {
    let json_value: Value = serde_json::from_str(json_str)?;

    validate_assessment_document(&json_value)?;

    let document: AssessmentDocument = serde_json::from_value(json_value)?;

    Ok(document)
}

/// Get the embedded JSON Schema as a parsed Value for external use
///
/// # Errors
/// Returns `ValidationError::SchemaCompilation` if the embedded schema does not parse.
pub fn get_schema_definition() -> Result<Value, ValidationError> {
    serde_json::from_str(SCHEMA_V1_0).map_err(|e| ValidationError::SchemaCompilation {
        message: format!("Failed to parse embedded schema: {}", e),
    })
}

#[cfg(test)]
mod tests;
