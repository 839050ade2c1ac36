//! Run-scoped execution audit log.
//!
//! Every evaluated (column, rule) pair leaves exactly one [`AuditEntry`].
//! Scores are derived from these entries alone, so the denominator of a
//! dimension score is always the number of cells actually checked.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::models::{Dimension, Severity};

/// Outcome of one (column, rule) evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Dimension of the rule
    pub dimension: Dimension,
    /// Target column, or `ALL` for the dataset-wide uniqueness entry
    pub column: String,
    /// Rule label
    pub rule: String,
    /// Cells evaluated
    pub evaluated: usize,
    /// Cells that failed
    pub failed: usize,
}

impl AuditEntry {
    /// Creates an entry. `failed` is capped at `evaluated`.
    pub fn new(
        dimension: Dimension,
        column: impl Into<String>,
        rule: impl Into<String>,
        evaluated: usize,
        failed: usize,
    ) -> Self {
        Self {
            dimension,
            column: column.into(),
            rule: rule.into(),
            evaluated,
            failed: failed.min(evaluated),
        }
    }

    /// Cells that passed.
    pub fn passed(&self) -> usize {
        self.evaluated.saturating_sub(self.failed)
    }

    /// Pass rate in percent, or `None` when nothing was evaluated.
    pub fn score_pct(&self) -> Option<f64> {
        if self.evaluated == 0 {
            return None;
        }
        Some(self.passed() as f64 * 100.0 / self.evaluated as f64)
    }

    /// Severity band of the pass rate.
    pub fn severity(&self) -> Severity {
        Severity::from_score(self.score_pct())
    }
}

/// Append-only log of one assessment run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLog {
    run_id: Uuid,
    entries: Vec<AuditEntry>,
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditLog {
    /// Starts a fresh log with a new run id.
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            entries: Vec::new(),
        }
    }

    /// Identifier of the run this log belongs to.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Appends one entry.
    pub fn record(&mut self, entry: AuditEntry) {
        tracing::trace!(
            dimension = %entry.dimension,
            column = %entry.column,
            rule = %entry.rule,
            evaluated = entry.evaluated,
            failed = entry.failed,
            "Audit entry recorded"
        );
        self.entries.push(entry);
    }

    /// Appends several entries, preserving their order.
    pub fn extend(&mut self, entries: impl IntoIterator<Item = AuditEntry>) {
        for entry in entries {
            self.record(entry);
        }
    }

    /// Drops all entries and starts a new run id.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.run_id = Uuid::new_v4();
    }

    /// All entries in recording order.
    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    /// Entries of one dimension.
    pub fn for_dimension(&self, dimension: Dimension) -> impl Iterator<Item = &AuditEntry> {
        self.entries
            .iter()
            .filter(move |entry| entry.dimension == dimension)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_derived_views() {
        let entry = AuditEntry::new(Dimension::Completeness, "email", "Not Null", 10, 2);
        assert_eq!(entry.passed(), 8);
        assert_eq!(entry.score_pct(), Some(80.0));
        assert_eq!(entry.severity(), Severity::Medium);
    }

    #[test]
    fn test_entry_with_nothing_evaluated() {
        let entry = AuditEntry::new(Dimension::Validity, "age", "Email Format", 0, 0);
        assert_eq!(entry.score_pct(), None);
        assert_eq!(entry.severity(), Severity::Pass);
    }

    #[test]
    fn test_entry_caps_failed_at_evaluated() {
        let entry = AuditEntry::new(Dimension::Validity, "age", "Email Format", 3, 7);
        assert_eq!(entry.failed, 3);
        assert_eq!(entry.passed(), 0);
    }

    #[test]
    fn test_log_is_run_scoped() {
        let mut first = AuditLog::new();
        let second = AuditLog::new();
        assert_ne!(first.run_id(), second.run_id());

        first.record(AuditEntry::new(Dimension::Completeness, "a", "Not Null", 5, 1));
        assert_eq!(first.len(), 1);
        assert!(second.is_empty());

        let old_run = first.run_id();
        first.clear();
        assert!(first.is_empty());
        assert_ne!(first.run_id(), old_run);
    }

    #[test]
    fn test_for_dimension_filters_in_order() {
        let mut log = AuditLog::new();
        log.extend([
            AuditEntry::new(Dimension::Completeness, "a", "Not Null", 5, 1),
            AuditEntry::new(Dimension::Validity, "b", "Email Format", 5, 0),
            AuditEntry::new(Dimension::Completeness, "b", "Not Empty", 5, 2),
        ]);

        let columns: Vec<&str> = log
            .for_dimension(Dimension::Completeness)
            .map(|e| e.column.as_str())
            .collect();
        assert_eq!(columns, vec!["a", "b"]);
    }
}
