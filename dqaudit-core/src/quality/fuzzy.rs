//! Hybrid fuzzy duplicate matching.
//!
//! Rows are split into blocks by a cheap key (primary column prefix plus an
//! optional geographic prefix), every pair inside a block is scored with the
//! weighted cell similarity, and accepted pairs are closed transitively with
//! a [`DisjointSet`]. Blocks are scored in parallel; clustering is single
//! threaded.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use rayon::prelude::*;

use crate::error::Result;
use crate::models::{Dataset, classify_cell};

use super::config::{EngineConfig, ScorerBackend};
use super::disjoint_set::DisjointSet;
use super::executor::check_cancelled;
use super::models::{EngineWarning, WarningKind};
use super::rules::FuzzyParams;
use super::similarity::PreparedCell;

/// Geographic columns used for the secondary block key, in priority order.
pub const GEO_COLUMNS: &[&str] = &["country", "city", "state", "region"];

const PRIMARY_PREFIX_CHARS: usize = 2;
const GEO_PREFIX_CHARS: usize = 3;

/// Fuzzy rule parameters resolved against the engine defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzySettings {
    /// Acceptance threshold in percent
    pub threshold: f64,
    /// One weight per target column
    pub weights: Vec<f64>,
    /// Blocks with more pairs than this are skipped
    pub max_pairs_per_block: usize,
    /// Drop rows with any absent target cell before blocking
    pub ignore_nulls: bool,
    /// Cell scorer
    pub backend: ScorerBackend,
}

impl FuzzySettings {
    /// Resolves rule parameters for `column_count` target columns.
    ///
    /// Returns the settings plus a description of every parameter that had to
    /// be replaced by a default.
    pub fn resolve(
        params: &FuzzyParams,
        column_count: usize,
        config: &EngineConfig,
    ) -> (Self, Vec<String>) {
        let mut problems = Vec::new();

        let threshold = params.effective_threshold(config);
        if let Some(requested) = params
            .threshold
            .filter(|requested| !(0.0..=100.0).contains(requested))
        {
            problems.push(format!(
                "threshold {} outside 0-100; using {}",
                requested, threshold
            ));
        }

        let weights = match &params.weights {
            Some(weights) if weights.len() == column_count => weights.clone(),
            Some(weights) => {
                problems.push(format!(
                    "expected {} weight(s), got {}; using equal weights",
                    column_count,
                    weights.len()
                ));
                vec![1.0; column_count]
            }
            None => vec![1.0; column_count],
        };

        let settings = Self {
            threshold,
            weights,
            max_pairs_per_block: params
                .max_pairs_per_block
                .unwrap_or(config.max_pairs_per_block)
                .max(1),
            ignore_nulls: params.ignore_nulls.unwrap_or(config.fuzzy_ignore_nulls),
            backend: config.scorer_backend,
        };
        (settings, problems)
    }
}

/// A transitively closed set of similar rows.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyCluster {
    /// Member rows, ascending
    pub row_ids: Vec<usize>,
    /// Highest accepted pair score inside the cluster
    pub similarity: f64,
}

/// Clusters and warnings of one fuzzy rule.
#[derive(Debug, Clone, Default)]
pub struct FuzzyOutcome {
    /// Clusters ordered by their smallest row
    pub clusters: Vec<FuzzyCluster>,
    /// Null-skip, performance-guard and scorer-fallback warnings
    pub warnings: Vec<EngineWarning>,
}

enum BlockResult {
    Scored(Vec<(usize, usize, f64)>),
    Skipped,
}

/// Scores and clusters rows for one fuzzy rule.
#[derive(Debug, Clone)]
pub struct FuzzyMatcher {
    settings: FuzzySettings,
    cancel: Option<Arc<AtomicBool>>,
}

impl FuzzyMatcher {
    /// Creates a matcher with resolved settings.
    pub fn new(settings: FuzzySettings) -> Self {
        Self {
            settings,
            cancel: None,
        }
    }

    /// Builder method to attach a cancellation flag, checked before every block.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Resolved settings.
    pub fn settings(&self) -> &FuzzySettings {
        &self.settings
    }

    /// Finds fuzzy clusters over the given column indices.
    ///
    /// The first column is the primary column used for blocking. `label`
    /// names the rule in warnings.
    ///
    /// # Errors
    ///
    /// Returns [`crate::DqError::Cancelled`] if the cancellation flag was raised.
    pub fn find_clusters(
        &self,
        dataset: &Dataset,
        columns: &[usize],
        label: &str,
    ) -> Result<FuzzyOutcome> {
        let mut outcome = FuzzyOutcome::default();
        let Some(&primary) = columns.first() else {
            return Ok(outcome);
        };

        if self.settings.backend == ScorerBackend::Scalar {
            outcome.warnings.push(EngineWarning::for_rule(
                WarningKind::ScorerFallback,
                label,
                "ensemble scorer unavailable; cells scored with a sequence-matcher ratio",
            ));
        }

        // Rows absent in every fuzzy column are never compared; `ignore_nulls`
        // extends this to rows absent in any of them
        let ignore_nulls = self.settings.ignore_nulls;
        let candidates: Vec<usize> = (0..dataset.row_count())
            .filter(|&row| {
                let mut absent = columns.iter().map(|&column| {
                    dataset
                        .cell(row, column)
                        .is_none_or(|raw| classify_cell(raw).is_absent())
                });
                if ignore_nulls {
                    !absent.any(|is_absent| is_absent)
                } else {
                    !absent.all(|is_absent| is_absent)
                }
            })
            .collect();
        let dropped = dataset.row_count() - candidates.len();
        if dropped > 0 {
            outcome.warnings.push(EngineWarning::for_rule(
                WarningKind::NullRowsSkipped,
                label,
                format!(
                    "skipped {} row(s) with absent values in fuzzy column(s)",
                    dropped
                ),
            ));
        }

        let blocks = build_blocks(dataset, primary, geo_column(dataset), &candidates);
        tracing::debug!(
            rule = label,
            candidates = candidates.len(),
            blocks = blocks.len(),
            "Fuzzy blocking finished"
        );

        let cancel = self.cancel.as_deref();
        let results: Vec<BlockResult> = blocks
            .par_iter()
            .map(|block| {
                check_cancelled(cancel, "fuzzy matching")?;
                Ok(self.score_block(dataset, columns, block))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut skipped = 0usize;
        let mut accepted = Vec::new();
        for result in results {
            match result {
                BlockResult::Scored(pairs) => accepted.extend(pairs),
                BlockResult::Skipped => skipped += 1,
            }
        }

        if skipped > 0 {
            tracing::debug!(rule = label, skipped, "Fuzzy blocks over the pair cap");
            outcome.warnings.push(EngineWarning::for_rule(
                WarningKind::PerformanceGuard,
                label,
                format!(
                    "{} block(s) exceeded the {} pair limit and were skipped; \
                     raise the pair cap or the threshold",
                    skipped, self.settings.max_pairs_per_block
                ),
            ));
        }

        outcome.clusters = cluster(dataset.row_count(), &accepted, self.settings.threshold);
        Ok(outcome)
    }

    fn score_block(&self, dataset: &Dataset, columns: &[usize], block: &[usize]) -> BlockResult {
        let n = block.len();
        if n < 2 {
            return BlockResult::Scored(Vec::new());
        }
        let pairs = n.saturating_mul(n - 1) / 2;
        if pairs > self.settings.max_pairs_per_block {
            return BlockResult::Skipped;
        }

        let prepared: Vec<Vec<PreparedCell>> = block
            .iter()
            .map(|&row| {
                columns
                    .iter()
                    .map(|&column| PreparedCell::new(dataset.cell(row, column).unwrap_or_default()))
                    .collect()
            })
            .collect();

        let mut accepted = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                let score = row_similarity(
                    &prepared[i],
                    &prepared[j],
                    &self.settings.weights,
                    self.settings.backend,
                );
                if score >= self.settings.threshold {
                    accepted.push((block[i], block[j], score));
                }
            }
        }
        BlockResult::Scored(accepted)
    }
}

/// Weighted mean of cell similarities.
///
/// Columns whose weight is not positive are skipped; the remaining weights
/// are renormalized. Returns 0 when no column carries weight.
pub fn row_similarity(
    a: &[PreparedCell],
    b: &[PreparedCell],
    weights: &[f64],
    backend: ScorerBackend,
) -> f64 {
    let mut weighted = 0.0;
    let mut total = 0.0;
    for ((left, right), &weight) in a.iter().zip(b).zip(weights) {
        if weight.is_nan() || weight <= 0.0 {
            continue;
        }
        weighted += left.similarity(right, backend) * weight;
        total += weight;
    }
    if total > 0.0 { weighted / total } else { 0.0 }
}

/// First geographic column present in the dataset, by priority.
pub fn geo_column(dataset: &Dataset) -> Option<usize> {
    GEO_COLUMNS
        .iter()
        .find_map(|name| dataset.column_index_ignore_case(name))
}

fn prefix(raw: &str, chars: usize) -> String {
    raw.trim().to_lowercase().chars().take(chars).collect()
}

/// Block key of one row, or `None` if the primary prefix is empty.
pub fn block_key(dataset: &Dataset, row: usize, primary: usize, geo: Option<usize>) -> Option<String> {
    let mut key = prefix(dataset.cell(row, primary)?, PRIMARY_PREFIX_CHARS);
    if key.is_empty() {
        return None;
    }
    if let Some(geo) = geo {
        key.push('|');
        key.push_str(&prefix(dataset.cell(row, geo).unwrap_or_default(), GEO_PREFIX_CHARS));
    }
    Some(key)
}

/// Splits candidate rows into blocks, ordered by first appearance.
fn build_blocks(
    dataset: &Dataset,
    primary: usize,
    geo: Option<usize>,
    candidates: &[usize],
) -> Vec<Vec<usize>> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut blocks: Vec<Vec<usize>> = Vec::new();
    for &row in candidates {
        let Some(key) = block_key(dataset, row, primary, geo) else {
            continue;
        };
        match slots.get(&key) {
            Some(&slot) => blocks[slot].push(row),
            None => {
                slots.insert(key, blocks.len());
                blocks.push(vec![row]);
            }
        }
    }
    blocks
}

fn cluster(row_count: usize, accepted: &[(usize, usize, f64)], threshold: f64) -> Vec<FuzzyCluster> {
    let mut set = DisjointSet::new(row_count);
    for &(a, b, _) in accepted {
        set.union(a, b);
    }

    let mut best: HashMap<usize, f64> = HashMap::new();
    for &(a, _, score) in accepted {
        if let Some(root) = set.find(a) {
            best.entry(root)
                .and_modify(|current| *current = current.max(score))
                .or_insert(score);
        }
    }

    set.groups(2)
        .into_iter()
        .map(|row_ids| {
            let similarity = row_ids
                .first()
                .and_then(|&first| set.find(first))
                .and_then(|root| best.get(&root).copied())
                .unwrap_or(threshold);
            FuzzyCluster {
                row_ids,
                similarity,
            }
        })
        .collect()
}
