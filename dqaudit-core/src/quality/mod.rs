//! Data quality assessment module.
//!
//! This module provides the rule engine and duplicate detection:
//! - **Completeness**: missing, empty and too-short values
//! - **Validity**: types, formats, ranges, allowed values and patterns
//! - **Standardization**: cells that differ from their canonical form
//! - **Uniqueness**: exact and fuzzy duplicate records
//!
//! Scores are derived from a run-scoped [`AuditLog`] only, so a dimension
//! that no rule evaluated is reported as not evaluated instead of perfect.
//!
//! # Guarantees
//! - The input dataset is never modified; transforms only flag cells
//! - Misconfigured rules degrade to warnings and never abort a run
//! - Annexure counts are verified before any report is returned
//!
//! # Example
//! ```rust
//! use dqaudit_core::models::Dataset;
//! use dqaudit_core::quality::{QualityAnalyzer, RuleConfig, RuleKind};
//!
//! let dataset = Dataset::from_rows(["name"], vec![vec!["Acme"], vec!["acme "]])?;
//! let rules = vec![RuleConfig::new(RuleKind::SingleColumnExact, ["name"])];
//! let report = QualityAnalyzer::with_defaults().assess(&dataset, &rules)?;
//! assert_eq!(report.duplicate_groups.len(), 1);
//! # Ok::<(), dqaudit_core::DqError>(())
//! ```

mod analyzer;
mod annexure;
mod audit;
mod completeness;
mod config;
mod disjoint_set;
mod executor;
mod fuzzy;
mod models;
mod rules;
mod scoring;
mod similarity;
mod standardization;
mod uniqueness;
mod validity;

// Re-export public API
pub use analyzer::QualityAnalyzer;
pub use annexure::{
    DUPLICATES_GROUP_LABEL, build_annexure_groups, column_risk_summary, row_issue_map,
    validate_annexure_groups,
};
pub use audit::{AuditEntry, AuditLog};
pub use completeness::CompletenessCheck;
pub use config::{
    ConfigValidationError, DEFAULT_DATE_FORMAT, DEFAULT_FUZZY_THRESHOLD,
    DEFAULT_MAX_PAIRS_PER_BLOCK, DEFAULT_MIN_LENGTH, DEFAULT_NULL_REPLACEMENT, DEFAULT_RANGE_MAX,
    DEFAULT_RANGE_MIN, EngineConfig, ScorerBackend,
};
pub use disjoint_set::DisjointSet;
pub use executor::{ExecutionOutcome, RuleExecutor};
pub use fuzzy::{
    FuzzyCluster, FuzzyMatcher, FuzzyOutcome, FuzzySettings, GEO_COLUMNS, block_key, geo_column,
    row_similarity,
};
pub use models::{
    AnnexureGroup, AssessmentReport, ColumnRisk, Dimension, DimensionScore, DuplicateGroup,
    EngineWarning, FlaggedRow, IssueRecord, MatchType, RowIssues, ScoreStatus, Severity,
    WarningKind,
};
pub use rules::{
    AllowedValuesParams, CatalogEntry, DEFAULT_ALLOWED_CHARS_PATTERN, DEFAULT_FORMAT_PATTERN,
    DEFAULT_MAX_LENGTH, DataTypeParams, DateFormatParams, FormatCheckParams, FuzzyParams,
    IdFormatParams, LengthCheckParams, MinimumLengthParams, NormalizeDateParams,
    NullDefaultParams, NumericRangeParams, PAN_PATTERN, RegexParams, RuleConfig, RuleKind,
    SpecialCharsParams, catalog,
};
pub use scoring::{
    UNIQUENESS_COLUMN, UNIQUENESS_RULE, dimension_score, dimension_scores, overall_score,
    uniqueness_entry,
};
pub use similarity::{
    PARTIAL_RATIO_WEIGHT, PreparedCell, RATIO_WEIGHT, TOKEN_SET_WEIGHT, TOKEN_SORT_WEIGHT,
    cell_similarity, ensemble_score, partial_ratio, ratio, sequence_matcher_ratio,
    token_set_ratio, token_sort_ratio,
};
pub use standardization::{
    ISSUE_FLAG_COLUMN, StandardizationError, Transform, build_clean_dataset,
};
pub use uniqueness::{
    DuplicateDetector, DuplicateOutcome, exact_combination_groups, exact_single_groups,
    row_is_absent,
};
pub use validity::{DataKind, ValidityCheck, ValidityError};
