//! Tests for assessment document validation.
//!
//! These tests verify that the JSON Schema validation accepts well-formed
//! documents, rejects structural mistakes with useful messages, and that
//! accepted documents deserialize into working rule configurations.

use super::*;
use crate::quality::{RuleKind, ScorerBackend};
use serde_json::json;

fn minimal_document() -> Value {
    json!({
        "format_version": "1.0",
        "dataset": {
            "columns": ["name", "email"],
            "rows": [["Acme", "info@acme.com"], ["Globex", null]]
        },
        "rules": [
            { "rule": "not_null", "columns": ["email"] }
        ]
    })
}

#[test]
fn test_schema_initialization_success() {
    assert!(initialize_schema_validator().is_ok());
    // Second call is a no-op
    assert!(initialize_schema_validator().is_ok());
}

#[test]
fn test_schema_definition_parses() {
    let schema = get_schema_definition().unwrap();
    assert_eq!(schema["title"], "dqaudit Assessment Document v1.0");
}

#[test]
fn test_valid_minimal_document_passes() {
    assert!(validate_assessment_document(&minimal_document()).is_ok());
}

#[test]
fn test_format_version_is_optional() {
    let mut document = minimal_document();
    document.as_object_mut().unwrap().remove("format_version");
    assert!(validate_assessment_document(&document).is_ok());
}

#[test]
fn test_unsupported_version_rejected() {
    let mut document = minimal_document();
    document["format_version"] = json!("2.0");

    match validate_assessment_document(&document) {
        Err(ValidationError::UnsupportedVersion { version, supported }) => {
            assert_eq!(version, "2.0");
            assert_eq!(supported, vec!["1.0".to_string()]);
        }
        other => panic!("expected UnsupportedVersion, got {:?}", other),
    }
}

#[test]
fn test_missing_rules_rejected() {
    let document = json!({
        "dataset": { "columns": ["a"], "rows": [] }
    });
    assert!(matches!(
        validate_assessment_document(&document),
        Err(ValidationError::ValidationFailed { .. })
    ));
}

#[test]
fn test_unknown_rule_rejected() {
    let mut document = minimal_document();
    document["rules"] = json!([{ "rule": "made_up", "columns": ["email"] }]);
    assert!(matches!(
        validate_assessment_document(&document),
        Err(ValidationError::ValidationFailed { .. })
    ));
}

#[test]
fn test_nested_cells_rejected() {
    let mut document = minimal_document();
    document["dataset"]["rows"] = json!([[{"nested": true}, "x"]]);
    assert!(validate_assessment_document(&document).is_err());
}

#[test]
fn test_ragged_rows_reported_per_row() {
    let mut document = minimal_document();
    document["dataset"]["rows"] = json!([["a", "b"], ["only one"], ["a", "b", "c"]]);

    match validate_assessment_document(&document) {
        Err(ValidationError::ValidationFailed { error_count, errors }) => {
            assert_eq!(error_count, 2);
            assert!(errors[0].contains("dataset.rows[1] has 1 cells"));
            assert!(errors[1].contains("dataset.rows[2] has 3 cells"));
        }
        other => panic!("expected ValidationFailed, got {:?}", other),
    }
}

#[test]
fn test_unknown_engine_setting_rejected() {
    let mut document = minimal_document();
    document["engine"] = json!({ "max_pairs": 10 });
    assert!(validate_assessment_document(&document).is_err());
}

#[test]
fn test_out_of_range_threshold_rejected() {
    let mut document = minimal_document();
    document["engine"] = json!({ "default_fuzzy_threshold": 150 });
    assert!(validate_assessment_document(&document).is_err());
}

#[test]
fn test_parse_full_document() {
    let text = r#"{
        "format_version": "1.0",
        "dataset": {
            "columns": ["name", "city", "amount"],
            "rows": [["Acme", "Pune", 12.5], ["Acme Corp", "Pune", true]]
        },
        "rules": [
            { "rule": "numeric_range", "columns": ["amount"], "min": 0, "max": 50 },
            { "rule": "allowed_values", "columns": ["city"], "values": ["Pune", "Delhi"] },
            { "rule": "hybrid_fuzzy", "columns": ["name", "city"], "threshold": 75, "weights": [2, 1] },
            { "rule": "trim_spaces", "columns": ["name"] }
        ],
        "engine": { "max_pairs_per_block": 500, "scorer_backend": "scalar" }
    }"#;

    let document = validate_and_parse_document(text).unwrap();

    assert_eq!(document.dataset.row_count(), 2);
    // Scalars become cell strings
    assert_eq!(document.dataset.cell(0, 2), Some("12.5"));
    assert_eq!(document.dataset.cell(1, 2), Some("true"));
    assert_eq!(document.rules.len(), 4);
    match &document.rules[2].kind {
        RuleKind::HybridFuzzy(params) => {
            assert_eq!(params.threshold, Some(75.0));
            assert_eq!(params.weights, Some(vec![2.0, 1.0]));
        }
        other => panic!("expected HybridFuzzy, got {:?}", other),
    }
    assert_eq!(document.engine.max_pairs_per_block, 500);
    assert_eq!(document.engine.scorer_backend, ScorerBackend::Scalar);
    // Unspecified settings keep their defaults
    assert_eq!(document.engine.default_fuzzy_threshold, 80.0);
}

#[test]
fn test_parse_invalid_json() {
    assert!(matches!(
        validate_and_parse_document("{ not json"),
        Err(ValidationError::JsonParsing { .. })
    ));
}
