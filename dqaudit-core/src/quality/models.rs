//! Data quality assessment result models.
//!
//! This module defines the data structures produced by an assessment run.
//! Everything here is plain data: serializable, comparable, and built once
//! per run without later mutation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::audit::AuditLog;

/// One of the four quality axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Dimension {
    /// Presence of values
    Completeness,
    /// Conformance to formats, types and ranges
    Validity,
    /// Absence of duplicate records
    Uniqueness,
    /// Conformance to canonical representations
    Standardization,
}

impl Dimension {
    /// All dimensions in reporting order.
    pub const ALL: [Dimension; 4] = [
        Dimension::Completeness,
        Dimension::Validity,
        Dimension::Uniqueness,
        Dimension::Standardization,
    ];

    /// Canonical issue category used on issue records of this dimension.
    pub fn issue_category(&self) -> &'static str {
        match self {
            Dimension::Completeness => "Missing Values",
            Dimension::Validity => "Invalid Format",
            Dimension::Uniqueness => "Duplicate Records",
            Dimension::Standardization => "Non-Standard Values",
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dimension::Completeness => write!(f, "Completeness"),
            Dimension::Validity => write!(f, "Validity"),
            Dimension::Uniqueness => write!(f, "Uniqueness"),
            Dimension::Standardization => write!(f, "Standardization"),
        }
    }
}

/// A single rule failure on a single row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssueRecord {
    /// 0-based row index into the dataset
    pub row_id: usize,
    /// Column (or `a + b` column combination) the rule ran against
    pub column_name: String,
    /// Display label of the rule, including its parameters
    pub rule_name: String,
    /// Canonical issue category of the dimension
    pub issue_category: String,
    /// Cell value as found
    pub original_value: String,
    /// What the rule expected, or the cleaned value for standardization
    pub expected_value: String,
    /// Dimension the rule belongs to
    pub dimension: Dimension,
}

impl IssueRecord {
    /// Creates an issue record; the category is derived from the dimension.
    pub fn new(
        row_id: usize,
        column_name: impl Into<String>,
        rule_name: impl Into<String>,
        original_value: impl Into<String>,
        expected_value: impl Into<String>,
        dimension: Dimension,
    ) -> Self {
        Self {
            row_id,
            column_name: column_name.into(),
            rule_name: rule_name.into(),
            issue_category: dimension.issue_category().to_string(),
            original_value: original_value.into(),
            expected_value: expected_value.into(),
            dimension,
        }
    }
}

/// How a duplicate group was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchType {
    /// Identical normalized values (single column or combination)
    Exact,
    /// Weighted similarity at or above the threshold
    Fuzzy,
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchType::Exact => write!(f, "Exact"),
            MatchType::Fuzzy => write!(f, "Fuzzy"),
        }
    }
}

/// A cluster of rows considered duplicates of each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Run-unique group identifier, starting at 1
    pub group_id: usize,
    /// Exact or fuzzy
    pub match_type: MatchType,
    /// Label of the rule that produced the group
    pub rule_label: String,
    /// Columns compared
    pub columns: Vec<String>,
    /// Member row ids, ascending
    pub row_ids: Vec<usize>,
    /// Representative similarity (100 for exact groups)
    pub similarity: f64,
}

impl DuplicateGroup {
    /// Number of member rows.
    pub fn size(&self) -> usize {
        self.row_ids.len()
    }
}

/// A row flagged as duplicate, with the classification it was first found under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlaggedRow {
    /// 0-based row index
    pub row_id: usize,
    /// Group that first claimed this row
    pub group_id: usize,
    /// Match type of that group
    pub match_type: MatchType,
    /// Similarity of that group
    pub similarity: f64,
}

/// Score of one dimension, or an explicit marker that nothing was evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "score", rename_all = "snake_case")]
pub enum DimensionScore {
    /// Percentage in `[0, 100]`
    Evaluated(f64),
    /// No rule of this dimension ran
    NotEvaluated,
}

impl DimensionScore {
    /// Returns the percentage, if evaluated.
    pub fn value(&self) -> Option<f64> {
        match self {
            DimensionScore::Evaluated(score) => Some(*score),
            DimensionScore::NotEvaluated => None,
        }
    }

    /// Returns true if the dimension was evaluated.
    pub fn is_evaluated(&self) -> bool {
        matches!(self, DimensionScore::Evaluated(_))
    }

    /// Reporting band for the score, if evaluated.
    pub fn status(&self) -> Option<ScoreStatus> {
        self.value().map(ScoreStatus::from_score)
    }
}

/// Reporting band of a dimension or overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreStatus {
    /// Above 95%
    Good,
    /// 85% to 95%
    Moderate,
    /// Below 85%
    NeedsImprovement,
}

impl ScoreStatus {
    /// Classifies a percentage score.
    pub fn from_score(score: f64) -> Self {
        if score > 95.0 {
            ScoreStatus::Good
        } else if score >= 85.0 {
            ScoreStatus::Moderate
        } else {
            ScoreStatus::NeedsImprovement
        }
    }
}

/// Severity of an individual audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    /// Pass rate below 50%
    Critical,
    /// Pass rate below 70%
    High,
    /// Pass rate below 85%
    Medium,
    /// Pass rate below 95%
    Low,
    /// Pass rate at or above 95%, or nothing evaluated
    Pass,
}

impl Severity {
    /// Classifies a pass-rate percentage.
    pub fn from_score(score: Option<f64>) -> Self {
        match score {
            Some(s) if s < 50.0 => Severity::Critical,
            Some(s) if s < 70.0 => Severity::High,
            Some(s) if s < 85.0 => Severity::Medium,
            Some(s) if s < 95.0 => Severity::Low,
            _ => Severity::Pass,
        }
    }
}

/// Category of a non-fatal engine warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A rule was misconfigured and degraded to always-pass
    Configuration,
    /// A fuzzy block exceeded the pair cap and was skipped
    PerformanceGuard,
    /// The ensemble scorer was unavailable; the scalar scorer was used
    ScorerFallback,
    /// Rows with absent fuzzy columns were excluded from fuzzy matching
    NullRowsSkipped,
}

/// A non-fatal condition surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineWarning {
    /// Warning category
    pub kind: WarningKind,
    /// Label of the rule involved, if any
    pub rule: Option<String>,
    /// Human-readable message
    pub message: String,
}

impl EngineWarning {
    /// Creates a warning attached to a rule.
    pub fn for_rule(kind: WarningKind, rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            rule: Some(rule.into()),
            message: message.into(),
        }
    }

    /// Creates a configuration warning attached to a rule.
    pub fn configuration(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::for_rule(WarningKind::Configuration, rule, message)
    }
}

impl std::fmt::Display for EngineWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.rule {
            Some(rule) => write!(f, "{}: {}", rule, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Rows failing one rule, exported as one annexure section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnexureGroup {
    /// Rule label (never a bare dimension name)
    pub rule_label: String,
    /// Failing row ids, ascending and distinct
    pub row_ids: Vec<usize>,
    /// True for the single trailing duplicates section
    pub is_duplicate: bool,
    /// Declared row count; must equal `row_ids.len()`
    pub row_count: usize,
}

/// Issues carried by one row, for the results listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowIssues {
    /// Distinct issue labels in discovery order
    pub issues: Vec<String>,
    /// Number of distinct issue labels
    pub issue_count: usize,
    /// Dimensions involved, sorted
    pub categories: Vec<Dimension>,
}

/// Per-column issue aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRisk {
    /// Column name
    pub column_name: String,
    /// Number of issue records on the column
    pub issue_count: usize,
    /// Distinct rule labels, sorted
    pub failed_rules: Vec<String>,
    /// Distinct issue categories, sorted
    pub issue_categories: Vec<String>,
    /// Distinct dimensions, sorted
    pub dimensions: Vec<Dimension>,
}

/// Complete result of one assessment run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentReport {
    /// Identifier of the run (also carried by the audit log)
    pub run_id: Uuid,
    /// Number of dataset rows assessed
    pub analyzed_rows: usize,
    /// Every individual rule failure
    pub issues: Vec<IssueRecord>,
    /// Score per dimension
    pub dimension_scores: BTreeMap<Dimension, DimensionScore>,
    /// Mean of evaluated dimension scores
    pub overall_score: DimensionScore,
    /// Duplicate group table
    pub duplicate_groups: Vec<DuplicateGroup>,
    /// Distinct duplicate rows with their first classification
    pub duplicate_rows: Vec<FlaggedRow>,
    /// Validated annexure sections
    pub annexure: Vec<AnnexureGroup>,
    /// Row id to issue summary, for rows with non-duplicate issues
    pub row_issues: BTreeMap<usize, RowIssues>,
    /// Issue aggregate per column
    pub column_risk: Vec<ColumnRisk>,
    /// Execution audit log of the run
    pub audit_log: AuditLog,
    /// Non-fatal warnings
    pub warnings: Vec<EngineWarning>,
    /// Timestamp when the assessment finished
    pub analyzed_at: DateTime<Utc>,
}

impl AssessmentReport {
    /// Returns warnings of one kind.
    pub fn warnings_of(&self, kind: WarningKind) -> impl Iterator<Item = &EngineWarning> {
        self.warnings.iter().filter(move |w| w.kind == kind)
    }

    /// Returns the score of one dimension.
    pub fn score(&self, dimension: Dimension) -> DimensionScore {
        self.dimension_scores
            .get(&dimension)
            .copied()
            .unwrap_or(DimensionScore::NotEvaluated)
    }
}
