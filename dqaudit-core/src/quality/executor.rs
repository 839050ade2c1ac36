//! Rule executor for completeness, validity and standardization rules.
//!
//! Each configured rule is compiled once, then evaluated independently per
//! target column. Column evaluations run in parallel and each produces a
//! private outcome; outcomes are merged into the run's [`AuditLog`] and the
//! issue list in configuration order after all of them finish.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rayon::prelude::*;

use crate::error::{DqError, Result};
use crate::models::Dataset;

use super::audit::{AuditEntry, AuditLog};
use super::completeness::CompletenessCheck;
use super::config::EngineConfig;
use super::models::{Dimension, EngineWarning, IssueRecord};
use super::rules::RuleConfig;
use super::standardization::Transform;
use super::validity::ValidityCheck;

/// Returns a cancellation error if the flag is raised.
pub(crate) fn check_cancelled(flag: Option<&AtomicBool>, stage: &str) -> Result<()> {
    match flag {
        Some(flag) if flag.load(Ordering::Relaxed) => Err(DqError::cancelled(stage)),
        _ => Ok(()),
    }
}

/// A rule ready for evaluation.
#[derive(Debug, Clone)]
enum CompiledRule {
    Completeness(CompletenessCheck),
    Validity(ValidityCheck),
    Standardization(Transform),
    /// Misconfigured: passes every cell
    Degraded,
}

impl CompiledRule {
    fn compile(rule: &RuleConfig, config: &EngineConfig) -> (Self, Option<String>) {
        let kind = &rule.kind;
        if let Some(check) = CompletenessCheck::from_kind(kind, config) {
            return (Self::Completeness(check), None);
        }
        match ValidityCheck::from_kind(kind, config) {
            Ok(Some(check)) => return (Self::Validity(check), None),
            Ok(None) => {}
            Err(e) => return (Self::Degraded, Some(e.to_string())),
        }
        match Transform::from_kind(kind, config) {
            Ok(Some(transform)) => (Self::Standardization(transform), None),
            Ok(None) => (Self::Degraded, Some("not a column rule".to_string())),
            Err(e) => (Self::Degraded, Some(e.to_string())),
        }
    }

    /// Returns `(original_value, expected_value)` for a failing cell.
    fn evaluate(&self, raw: &str) -> Option<(String, String)> {
        match self {
            Self::Completeness(check) => {
                (!check.passes(raw)).then(|| (check.original_display(raw), check.expected()))
            }
            Self::Validity(check) => {
                (!check.passes(raw)).then(|| (raw.to_string(), check.expected()))
            }
            Self::Standardization(transform) => transform
                .evaluate(raw)
                .map(|cleaned| (raw.to_string(), cleaned)),
            Self::Degraded => None,
        }
    }
}

/// One (rule, column) evaluation to run.
struct Job<'r> {
    rule: &'r PreparedRule,
    column: &'r str,
    column_index: usize,
}

struct PreparedRule {
    compiled: CompiledRule,
    label: String,
    dimension: Dimension,
}

struct PairOutcome {
    entry: AuditEntry,
    issues: Vec<IssueRecord>,
}

/// Issues and warnings produced by one executor pass.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOutcome {
    /// One record per failing cell, in configuration then row order
    pub issues: Vec<IssueRecord>,
    /// Configuration warnings for degraded or misdirected rules
    pub warnings: Vec<EngineWarning>,
}

/// Applies column rules to a dataset.
///
/// Uniqueness rules are ignored here; they belong to the duplicate detector.
#[derive(Debug, Clone)]
pub struct RuleExecutor<'c> {
    config: &'c EngineConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'c> RuleExecutor<'c> {
    /// Creates an executor using the given engine configuration.
    pub fn new(config: &'c EngineConfig) -> Self {
        Self {
            config,
            cancel: None,
        }
    }

    /// Builder method to attach a cancellation flag, checked before every
    /// (rule, column) evaluation.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Runs every column rule and appends one audit entry per evaluated
    /// (column, rule) pair to `log`.
    ///
    /// Rules with malformed parameters still log their entry with zero
    /// failures; rules targeting unknown columns log nothing. Both produce a
    /// warning.
    ///
    /// # Errors
    ///
    /// Returns [`DqError::Cancelled`] if the cancellation flag was raised.
    /// Nothing is appended to `log` in that case.
    pub fn execute(
        &self,
        dataset: &Dataset,
        rules: &[RuleConfig],
        log: &mut AuditLog,
    ) -> Result<ExecutionOutcome> {
        let mut warnings = Vec::new();
        let mut prepared = Vec::new();

        for rule in rules
            .iter()
            .filter(|rule| rule.dimension() != Dimension::Uniqueness)
        {
            let label = rule.kind.label(self.config);
            let (compiled, problem) = CompiledRule::compile(rule, self.config);
            if let Some(problem) = problem {
                tracing::warn!(rule = %label, "Rule degraded to always-pass: {}", problem);
                warnings.push(EngineWarning::configuration(
                    label.clone(),
                    format!("{}; rule treated as always-pass", problem),
                ));
            }
            if rule.columns.is_empty() {
                warnings.push(EngineWarning::configuration(
                    label.clone(),
                    "no target columns configured",
                ));
            }
            prepared.push((
                rule,
                PreparedRule {
                    compiled,
                    dimension: rule.dimension(),
                    label,
                },
            ));
        }

        let mut jobs = Vec::new();
        for (rule, prepared_rule) in &prepared {
            for column in &rule.columns {
                match dataset.column_index(column) {
                    Some(column_index) => jobs.push(Job {
                        rule: prepared_rule,
                        column,
                        column_index,
                    }),
                    None => warnings.push(EngineWarning::configuration(
                        prepared_rule.label.clone(),
                        format!("column '{}' not found in dataset; rule skipped", column),
                    )),
                }
            }
        }

        tracing::debug!(
            rules = prepared.len(),
            evaluations = jobs.len(),
            rows = dataset.row_count(),
            "Executing column rules"
        );

        let cancel = self.cancel.as_deref();
        let outcomes: Vec<PairOutcome> = jobs
            .par_iter()
            .map(|job| {
                check_cancelled(cancel, "rule execution")?;
                Ok(evaluate_job(dataset, job))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut issues = Vec::new();
        for outcome in outcomes {
            log.record(outcome.entry);
            issues.extend(outcome.issues);
        }

        Ok(ExecutionOutcome { issues, warnings })
    }
}

fn evaluate_job(dataset: &Dataset, job: &Job<'_>) -> PairOutcome {
    let started = Instant::now();
    let rule = job.rule;

    let issues: Vec<IssueRecord> = dataset
        .column_values(job.column_index)
        .enumerate()
        .filter_map(|(row_id, raw)| {
            rule.compiled.evaluate(raw).map(|(original, expected)| {
                IssueRecord::new(
                    row_id,
                    job.column,
                    rule.label.as_str(),
                    original,
                    expected,
                    rule.dimension,
                )
            })
        })
        .collect();

    tracing::trace!(
        rule = %rule.label,
        column = job.column,
        failed = issues.len(),
        elapsed_us = started.elapsed().as_micros() as u64,
        "Rule evaluated"
    );

    PairOutcome {
        entry: AuditEntry::new(
            rule.dimension,
            job.column,
            rule.label.as_str(),
            dataset.row_count(),
            issues.len(),
        ),
        issues,
    }
}
