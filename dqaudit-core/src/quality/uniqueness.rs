//! Duplicate detection.
//!
//! Exact matching groups rows by normalized key. [`DuplicateDetector`] runs
//! every uniqueness rule of a configuration (single-column exact, then
//! combination exact, then fuzzy), numbers groups across the whole run and
//! merges the flagged rows so each row keeps the first classification it
//! received.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::error::Result;
use crate::models::{Dataset, classify_cell, normalize_key};

use super::audit::AuditLog;
use super::config::EngineConfig;
use super::executor::check_cancelled;
use super::fuzzy::{FuzzyMatcher, FuzzySettings};
use super::models::{
    Dimension, DuplicateGroup, EngineWarning, FlaggedRow, IssueRecord, MatchType,
};
use super::rules::{RuleConfig, RuleKind};
use super::scoring::uniqueness_entry;

const COMBINATION_KEY_SEPARATOR: &str = "||";

/// Groups rows sharing the same normalized value in one column.
///
/// Absent cells never match. Only values seen at least twice form a group;
/// groups are ordered by first occurrence and members are ascending.
pub fn exact_single_groups(dataset: &Dataset, column: usize) -> Vec<Vec<usize>> {
    group_by_key(
        dataset
            .column_values(column)
            .enumerate()
            .filter_map(|(row, raw)| normalize_key(raw).map(|key| (row, key))),
    )
}

/// Groups rows sharing the same normalized values across several columns.
///
/// A row is only excluded when every selected cell is absent; absent cells
/// otherwise take part in the key as empty strings.
pub fn exact_combination_groups(dataset: &Dataset, columns: &[usize]) -> Vec<Vec<usize>> {
    let keyed = dataset.rows().iter().enumerate().filter_map(|(row, cells)| {
        let parts: Vec<Option<String>> = columns
            .iter()
            .map(|&column| cells.get(column).and_then(|raw| normalize_key(raw)))
            .collect();
        if parts.iter().all(Option::is_none) {
            return None;
        }
        let key = parts
            .into_iter()
            .map(Option::unwrap_or_default)
            .collect::<Vec<_>>()
            .join(COMBINATION_KEY_SEPARATOR);
        Some((row, key))
    });
    group_by_key(keyed)
}

fn group_by_key(keyed: impl Iterator<Item = (usize, String)>) -> Vec<Vec<usize>> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (row, key) in keyed {
        match slots.get(&key) {
            Some(&slot) => groups[slot].push(row),
            None => {
                slots.insert(key, groups.len());
                groups.push(vec![row]);
            }
        }
    }
    groups.retain(|members| members.len() >= 2);
    groups
}

/// Everything the duplicate detector found in one run.
#[derive(Debug, Clone, Default)]
pub struct DuplicateOutcome {
    /// Groups in processing order, with run-unique ids starting at 1
    pub groups: Vec<DuplicateGroup>,
    /// One entry per distinct flagged row, first classification wins
    pub flagged: Vec<FlaggedRow>,
    /// One uniqueness issue per group member per rule
    pub issues: Vec<IssueRecord>,
    /// Configuration, performance and scorer warnings
    pub warnings: Vec<EngineWarning>,
}

impl DuplicateOutcome {
    /// Number of distinct rows flagged by any rule.
    pub fn distinct_rows(&self) -> usize {
        self.flagged.len()
    }

    fn push_group(
        &mut self,
        match_type: MatchType,
        rule_label: &str,
        columns: Vec<String>,
        row_ids: Vec<usize>,
        similarity: f64,
    ) -> usize {
        let group_id = self.groups.len() + 1;
        self.groups.push(DuplicateGroup {
            group_id,
            match_type,
            rule_label: rule_label.to_string(),
            columns,
            row_ids,
            similarity,
        });
        group_id
    }

    fn merge_flagged(&mut self) {
        let mut seen = HashSet::new();
        let mut flagged = Vec::new();
        for group in &self.groups {
            for &row_id in &group.row_ids {
                if seen.insert(row_id) {
                    flagged.push(FlaggedRow {
                        row_id,
                        group_id: group.group_id,
                        match_type: group.match_type,
                        similarity: group.similarity,
                    });
                }
            }
        }
        self.flagged = flagged;
    }
}

fn processing_stage(kind: &RuleKind) -> u8 {
    match kind {
        RuleKind::SingleColumnExact => 0,
        RuleKind::CombinationExact => 1,
        _ => 2,
    }
}

/// Runs the uniqueness rules of a configuration.
#[derive(Debug, Clone)]
pub struct DuplicateDetector<'c> {
    config: &'c EngineConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'c> DuplicateDetector<'c> {
    /// Creates a detector using the given engine configuration.
    pub fn new(config: &'c EngineConfig) -> Self {
        Self {
            config,
            cancel: None,
        }
    }

    /// Builder method to attach a cancellation flag, checked before every
    /// rule and between fuzzy blocks.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Detects duplicates for every uniqueness rule in `rules`.
    ///
    /// When at least one rule could run, a single dataset-wide uniqueness
    /// entry is appended to `log`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::DqError::Cancelled`] if the cancellation flag was
    /// raised, or a validation invariant error if more rows were flagged than
    /// the dataset holds.
    pub fn detect(
        &self,
        dataset: &Dataset,
        rules: &[RuleConfig],
        log: &mut AuditLog,
    ) -> Result<DuplicateOutcome> {
        let mut ordered: Vec<&RuleConfig> = rules
            .iter()
            .filter(|rule| rule.dimension() == Dimension::Uniqueness)
            .collect();
        ordered.sort_by_key(|rule| processing_stage(&rule.kind));

        let mut outcome = DuplicateOutcome::default();
        let mut ran = false;

        for rule in ordered {
            check_cancelled(self.cancel.as_deref(), "duplicate detection")?;
            let label = rule.kind.label(self.config);
            if rule.columns.is_empty() {
                outcome.warnings.push(EngineWarning::configuration(
                    label,
                    "no target columns configured",
                ));
                continue;
            }
            ran |= match &rule.kind {
                RuleKind::SingleColumnExact => {
                    self.run_single(dataset, rule, &label, &mut outcome)
                }
                RuleKind::CombinationExact => {
                    self.run_combination(dataset, rule, &label, &mut outcome)
                }
                RuleKind::HybridFuzzy(params) => {
                    let Some(indices) = resolve_all(dataset, rule, &label, &mut outcome) else {
                        continue;
                    };
                    let (settings, problems) =
                        FuzzySettings::resolve(params, rule.columns.len(), self.config);
                    outcome.warnings.extend(
                        problems
                            .into_iter()
                            .map(|problem| EngineWarning::configuration(label.clone(), problem)),
                    );
                    let mut matcher = FuzzyMatcher::new(settings);
                    if let Some(flag) = &self.cancel {
                        matcher = matcher.with_cancellation(Arc::clone(flag));
                    }
                    let fuzzy = matcher.find_clusters(dataset, &indices, &label)?;
                    outcome.warnings.extend(fuzzy.warnings);
                    for cluster in fuzzy.clusters {
                        let issues = combination_issues(
                            dataset,
                            &rule.columns,
                            &indices,
                            &cluster.row_ids,
                            &label,
                            "Unique record",
                        );
                        outcome.issues.extend(issues);
                        outcome.push_group(
                            MatchType::Fuzzy,
                            &label,
                            rule.columns.clone(),
                            cluster.row_ids,
                            cluster.similarity,
                        );
                    }
                    true
                }
                _ => false,
            };
        }

        outcome.merge_flagged();

        tracing::debug!(
            groups = outcome.groups.len(),
            flagged_rows = outcome.flagged.len(),
            warnings = outcome.warnings.len(),
            "Duplicate detection finished"
        );

        if ran {
            log.record(uniqueness_entry(dataset.row_count(), outcome.distinct_rows())?);
        }
        Ok(outcome)
    }

    fn run_single(
        &self,
        dataset: &Dataset,
        rule: &RuleConfig,
        label: &str,
        outcome: &mut DuplicateOutcome,
    ) -> bool {
        let mut ran = false;
        for column in &rule.columns {
            let Some(index) = dataset.column_index(column) else {
                outcome.warnings.push(EngineWarning::configuration(
                    label,
                    format!("column '{}' not found in dataset; column skipped", column),
                ));
                continue;
            };
            ran = true;
            for row_ids in exact_single_groups(dataset, index) {
                for &row in &row_ids {
                    outcome.issues.push(IssueRecord::new(
                        row,
                        column.as_str(),
                        label,
                        dataset.cell(row, index).unwrap_or_default(),
                        "Unique value",
                        Dimension::Uniqueness,
                    ));
                }
                outcome.push_group(MatchType::Exact, label, vec![column.clone()], row_ids, 100.0);
            }
        }
        ran
    }

    fn run_combination(
        &self,
        dataset: &Dataset,
        rule: &RuleConfig,
        label: &str,
        outcome: &mut DuplicateOutcome,
    ) -> bool {
        if rule.columns.len() < 2 {
            outcome.warnings.push(EngineWarning::configuration(
                label,
                "a combination rule needs at least two columns; rule skipped",
            ));
            return false;
        }
        let Some(indices) = resolve_all(dataset, rule, label, outcome) else {
            return false;
        };
        for row_ids in exact_combination_groups(dataset, &indices) {
            let issues = combination_issues(
                dataset,
                &rule.columns,
                &indices,
                &row_ids,
                label,
                "Unique combination",
            );
            outcome.issues.extend(issues);
            outcome.push_group(MatchType::Exact, label, rule.columns.clone(), row_ids, 100.0);
        }
        true
    }
}

/// Resolves every target column, warning about the ones that are missing.
fn resolve_all(
    dataset: &Dataset,
    rule: &RuleConfig,
    label: &str,
    outcome: &mut DuplicateOutcome,
) -> Option<Vec<usize>> {
    let missing: Vec<&str> = rule
        .columns
        .iter()
        .filter(|column| dataset.column_index(column).is_none())
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        outcome.warnings.push(EngineWarning::configuration(
            label,
            format!(
                "column(s) {} not found in dataset; rule skipped",
                missing
                    .iter()
                    .map(|column| format!("'{}'", column))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        ));
        return None;
    }
    rule.columns
        .iter()
        .map(|column| dataset.column_index(column))
        .collect()
}

fn combination_issues(
    dataset: &Dataset,
    columns: &[String],
    indices: &[usize],
    row_ids: &[usize],
    label: &str,
    expected: &str,
) -> Vec<IssueRecord> {
    let column_name = columns.join(" + ");
    row_ids
        .iter()
        .map(|&row| {
            let original = indices
                .iter()
                .map(|&index| dataset.cell(row, index).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(" | ");
            IssueRecord::new(
                row,
                column_name.as_str(),
                label,
                original,
                expected,
                Dimension::Uniqueness,
            )
        })
        .collect()
}

/// Returns true if every one of `columns` is absent in `row`.
pub fn row_is_absent(dataset: &Dataset, row: usize, columns: &[usize]) -> bool {
    columns.iter().all(|&column| {
        dataset
            .cell(row, column)
            .is_none_or(|raw| classify_cell(raw).is_absent())
    })
}
