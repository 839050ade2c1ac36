//! Property-based tests for the similarity scorers, the disjoint-set and
//! score derivation.
//!
//! These check invariants that must hold for every input rather than for a
//! handful of examples:
//! - Similarity scores stay within 0..=100 and identical cells score 100
//! - Indel-based scorers are symmetric
//! - Disjoint-set membership matches a naive connected-components labeling
//! - Dimension scores stay within 0..=100 and hit 100 exactly when nothing fails

use dqaudit_core::models::Dataset;
use dqaudit_core::quality::{
    AuditEntry, AuditLog, Dimension, DimensionScore, DisjointSet, QualityAnalyzer, RuleConfig,
    RuleKind, ScorerBackend, cell_similarity, dimension_score, ensemble_score, partial_ratio,
    ratio, sequence_matcher_ratio, token_set_ratio, token_sort_ratio,
};
use proptest::prelude::*;

fn in_range(score: f64) -> bool {
    (0.0..=100.0 + 1e-9).contains(&score)
}

/// Naive component labels: relabel both ends of every pair to the smaller
/// label until nothing changes.
fn naive_components(n: usize, pairs: &[(usize, usize)]) -> Vec<usize> {
    let mut label: Vec<usize> = (0..n).collect();
    let mut changed = true;
    while changed {
        changed = false;
        for &(a, b) in pairs {
            let low = label[a].min(label[b]);
            for side in [a, b] {
                if label[side] != low {
                    label[side] = low;
                    changed = true;
                }
            }
        }
    }
    label
}

proptest! {
    #[test]
    fn prop_scores_are_bounded(a in "[a-z ]{0,24}", b in "[a-z ]{0,24}") {
        prop_assert!(in_range(ratio(&a, &b)));
        prop_assert!(in_range(partial_ratio(&a, &b)));
        prop_assert!(in_range(token_sort_ratio(&a, &b)));
        prop_assert!(in_range(token_set_ratio(&a, &b)));
        prop_assert!(in_range(ensemble_score(&a, &b)));
        prop_assert!(in_range(sequence_matcher_ratio(&a, &b)));
    }

    #[test]
    fn prop_indel_scorers_are_symmetric(a in "[a-z ]{0,24}", b in "[a-z ]{0,24}") {
        prop_assert!((ratio(&a, &b) - ratio(&b, &a)).abs() < 1e-9);
        prop_assert!((token_sort_ratio(&a, &b) - token_sort_ratio(&b, &a)).abs() < 1e-9);
    }

    #[test]
    fn prop_identical_cells_score_100(a in "[A-Za-z0-9 ]{0,24}") {
        prop_assert_eq!(cell_similarity(&a, &a, ScorerBackend::Ensemble), 100.0);
        prop_assert_eq!(cell_similarity(&a, &a, ScorerBackend::Scalar), 100.0);
        // Case and surrounding whitespace are ignored
        let shouted = format!("  {} ", a.to_uppercase());
        prop_assert_eq!(cell_similarity(&a, &shouted, ScorerBackend::Ensemble), 100.0);
    }

    #[test]
    fn prop_disjoint_set_matches_naive_components(
        n in 1usize..40,
        raw_pairs in prop::collection::vec((0usize..40, 0usize..40), 0..60),
    ) {
        let pairs: Vec<(usize, usize)> = raw_pairs.into_iter().map(|(a, b)| (a % n, b % n)).collect();
        let mut set = DisjointSet::new(n);
        for &(a, b) in &pairs {
            set.union(a, b);
        }
        let labels = naive_components(n, &pairs);
        for a in 0..n {
            for b in 0..n {
                prop_assert_eq!(set.connected(a, b), labels[a] == labels[b]);
            }
        }
        let grouped: usize = set.groups(1).iter().map(Vec::len).sum();
        prop_assert_eq!(grouped, n);
    }

    #[test]
    fn prop_dimension_score_bounds(
        counts in prop::collection::vec((0usize..50, 0usize..50), 1..6),
    ) {
        let mut log = AuditLog::new();
        let mut any_failed = false;
        for (evaluated, failed) in counts {
            let failed = failed.min(evaluated);
            any_failed |= failed > 0;
            log.record(AuditEntry::new(Dimension::Validity, "c", "r", evaluated, failed));
        }
        match dimension_score(&log, Dimension::Validity) {
            DimensionScore::Evaluated(score) => {
                prop_assert!(in_range(score));
                prop_assert_eq!(score == 100.0, !any_failed);
            }
            DimensionScore::NotEvaluated => {
                prop_assert!(log.entries().iter().all(|entry| entry.evaluated == 0));
            }
        }
    }

    #[test]
    fn prop_not_null_issues_are_absent_cells(
        cells in prop::collection::vec(prop_oneof!["[a-z]{1,6}", Just(String::new()), Just("nan".to_string()), Just(" ".to_string())], 1..30),
    ) {
        let rows: Vec<Vec<String>> = cells.iter().map(|cell| vec![cell.clone()]).collect();
        let dataset = Dataset::from_rows(["c".to_string()], rows).unwrap();
        let rules = vec![RuleConfig::new(RuleKind::NotNull, ["c"])];
        let report = QualityAnalyzer::with_defaults().assess(&dataset, &rules).unwrap();
        for issue in &report.issues {
            prop_assert!(dqaudit_core::classify_cell(&cells[issue.row_id]).is_absent());
        }
    }
}
