//! Quality analyzer facade.
//!
//! This module provides the `QualityAnalyzer` that runs one complete
//! assessment: column rules, duplicate detection, scoring and annexure
//! assembly, in that order, against a fresh audit log.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::Result;
use crate::error::DqError;
use crate::models::Dataset;

use super::annexure::{
    build_annexure_groups, column_risk_summary, row_issue_map, validate_annexure_groups,
};
use super::audit::AuditLog;
use super::config::EngineConfig;
use super::executor::RuleExecutor;
use super::models::AssessmentReport;
use super::rules::RuleConfig;
use super::scoring::{dimension_scores, overall_score};
use super::standardization::build_clean_dataset;
use super::uniqueness::DuplicateDetector;

/// Quality analyzer for assessing a dataset against a rule configuration.
///
/// Every call to [`QualityAnalyzer::assess`] is an independent run with its
/// own audit log and run id; the analyzer holds no state between runs.
///
/// # Example
///
/// ```rust
/// use dqaudit_core::models::Dataset;
/// use dqaudit_core::quality::{Dimension, QualityAnalyzer, RuleConfig, RuleKind};
///
/// let dataset = Dataset::from_rows(
///     ["email"],
///     vec![vec!["a@example.com"], vec![""]],
/// )?;
/// let rules = vec![RuleConfig::new(RuleKind::NotNull, ["email"])];
///
/// let report = QualityAnalyzer::with_defaults().assess(&dataset, &rules)?;
/// assert_eq!(report.score(Dimension::Completeness).value(), Some(50.0));
/// # Ok::<(), dqaudit_core::DqError>(())
/// ```
#[derive(Debug, Clone)]
pub struct QualityAnalyzer {
    config: EngineConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl QualityAnalyzer {
    /// Creates a new quality analyzer with the given configuration.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            cancel: None,
        }
    }

    /// Creates a new quality analyzer with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }

    /// Builder method to attach a cancellation flag.
    ///
    /// The flag is checked between rules and between fuzzy blocks; a
    /// cancelled run returns [`DqError::Cancelled`] and no partial report.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Returns a reference to the analyzer configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Assesses a dataset and returns the full report.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the engine configuration is invalid,
    /// [`DqError::Cancelled`] if the run was cancelled, or a validation
    /// invariant error if the assembled results are inconsistent.
    pub fn assess(&self, dataset: &Dataset, rules: &[RuleConfig]) -> Result<AssessmentReport> {
        self.config
            .validate()
            .map_err(|e| DqError::configuration(e.to_string()))?;

        let mut log = AuditLog::new();
        tracing::info!(
            run_id = %log.run_id(),
            rows = dataset.row_count(),
            columns = dataset.column_count(),
            rules = rules.len(),
            "Starting quality assessment"
        );

        let mut executor = RuleExecutor::new(&self.config);
        let mut detector = DuplicateDetector::new(&self.config);
        if let Some(flag) = &self.cancel {
            executor = executor.with_cancellation(Arc::clone(flag));
            detector = detector.with_cancellation(Arc::clone(flag));
        }

        let executed = executor.execute(dataset, rules, &mut log)?;
        let duplicates = detector.detect(dataset, rules, &mut log)?;

        let mut issues = executed.issues;
        issues.extend(duplicates.issues);
        let mut warnings = executed.warnings;
        warnings.extend(duplicates.warnings);

        if let Some(issue) = issues.iter().find(|issue| issue.row_id >= dataset.row_count()) {
            return Err(DqError::invariant(format!(
                "issue on row {} of a {}-row dataset",
                issue.row_id,
                dataset.row_count()
            )));
        }

        let scores = dimension_scores(&log);
        let overall = overall_score(&scores);

        let annexure = build_annexure_groups(&issues, &duplicates.flagged);
        validate_annexure_groups(&annexure, dataset.row_count())?;

        for warning in &warnings {
            tracing::warn!("{}", warning);
        }
        tracing::info!(
            run_id = %log.run_id(),
            issues = issues.len(),
            duplicate_groups = duplicates.groups.len(),
            warnings = warnings.len(),
            "Quality assessment finished"
        );

        Ok(AssessmentReport {
            run_id: log.run_id(),
            analyzed_rows: dataset.row_count(),
            row_issues: row_issue_map(&issues),
            column_risk: column_risk_summary(&issues),
            issues,
            dimension_scores: scores,
            overall_score: overall,
            duplicate_groups: duplicates.groups,
            duplicate_rows: duplicates.flagged,
            annexure,
            audit_log: log,
            warnings,
            analyzed_at: chrono::Utc::now(),
        })
    }

    /// Builds the clean copy of a dataset from a finished report.
    ///
    /// # Errors
    ///
    /// Returns an error if the derived table would be malformed.
    pub fn clean_dataset(
        &self,
        dataset: &Dataset,
        rules: &[RuleConfig],
        report: &AssessmentReport,
    ) -> Result<Dataset> {
        build_clean_dataset(
            dataset,
            rules,
            &self.config,
            &report.duplicate_rows,
            &report.issues,
        )
    }
}
