//! Core data structures and engine for dqaudit.
//!
//! This crate evaluates column-level data-quality rules over a tabular
//! dataset, keeps a run-scoped execution audit log from which dimension
//! scores are derived, and detects exact and fuzzy duplicate records.
//!
//! # Guarantees
//! - The engine performs no I/O and never prints; warnings are returned
//! - Scores come from the audit log only; unevaluated dimensions say so
//! - Every report passes the annexure consistency check before it is returned
//!
//! # Architecture
//! - [`models`]: the immutable [`Dataset`] and null-sentinel classification
//! - [`quality`]: rules, executor, scoring, duplicate detection, annexure
//! - [`validation`]: JSON Schema checks for assessment documents
//! - [`logging`]: subscriber setup for binaries

pub mod error;
pub mod logging;
pub mod models;
pub mod quality;
pub mod validation;

// Re-export commonly used types
pub use error::{DqError, Result};
pub use models::{CellValue, Dataset, NULL_SENTINELS, classify_cell, is_null_sentinel, normalize_key};
pub use quality::{
    AssessmentReport, Dimension, DimensionScore, EngineConfig, EngineWarning, QualityAnalyzer,
    RuleConfig, RuleKind, WarningKind,
};

pub use validation::{
    AssessmentDocument, ValidationError, initialize_schema_validator,
    validate_and_parse_document, validate_assessment_document,
};
