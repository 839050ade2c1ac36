//! Scoring engine.
//!
//! Dimension scores are read from the audit log and nothing else:
//! `100 * (evaluated - failed) / evaluated`, summed over the dimension's
//! entries. A dimension without entries is `NotEvaluated`, never 100.

use std::collections::BTreeMap;

use super::audit::{AuditEntry, AuditLog};
use super::models::{Dimension, DimensionScore};
use crate::error::{DqError, Result};

/// Column name of the dataset-wide uniqueness audit entry.
pub const UNIQUENESS_COLUMN: &str = "ALL";
/// Rule label of the dataset-wide uniqueness audit entry.
pub const UNIQUENESS_RULE: &str = "Exact/Fuzzy Duplicate Check";

/// Computes the score of one dimension from the log.
pub fn dimension_score(log: &AuditLog, dimension: Dimension) -> DimensionScore {
    let (evaluated, failed) = log
        .for_dimension(dimension)
        .fold((0usize, 0usize), |(evaluated, failed), entry| {
            (
                evaluated.saturating_add(entry.evaluated),
                failed.saturating_add(entry.failed),
            )
        });

    if evaluated == 0 {
        return DimensionScore::NotEvaluated;
    }

    let passed = evaluated.saturating_sub(failed);
    let score = passed as f64 * 100.0 / evaluated as f64;
    DimensionScore::Evaluated(score.clamp(0.0, 100.0))
}

/// Computes every dimension score.
pub fn dimension_scores(log: &AuditLog) -> BTreeMap<Dimension, DimensionScore> {
    Dimension::ALL
        .iter()
        .map(|dimension| (*dimension, dimension_score(log, *dimension)))
        .collect()
}

/// Mean of the evaluated dimension scores.
pub fn overall_score(scores: &BTreeMap<Dimension, DimensionScore>) -> DimensionScore {
    let evaluated: Vec<f64> = scores.values().filter_map(DimensionScore::value).collect();
    if evaluated.is_empty() {
        return DimensionScore::NotEvaluated;
    }
    DimensionScore::Evaluated(evaluated.iter().sum::<f64>() / evaluated.len() as f64)
}

/// Builds the single uniqueness audit entry from the distinct duplicate row count.
///
/// # Errors
///
/// Returns a validation invariant error if more rows are flagged than exist.
pub fn uniqueness_entry(total_rows: usize, distinct_duplicates: usize) -> Result<AuditEntry> {
    if distinct_duplicates > total_rows {
        return Err(DqError::invariant(format!(
            "{} distinct duplicate rows flagged in a dataset of {} rows",
            distinct_duplicates, total_rows
        )));
    }
    Ok(AuditEntry::new(
        Dimension::Uniqueness,
        UNIQUENESS_COLUMN,
        UNIQUENESS_RULE,
        total_rows,
        distinct_duplicates,
    ))
}
