//! End-to-end assessment scenarios.
//!
//! Each test builds a small dataset, runs a full assessment through the
//! public analyzer API and checks scores, groups, warnings and annexure
//! output together.

use dqaudit_core::models::Dataset;
use dqaudit_core::quality::{
    AnnexureGroup, Dimension, DimensionScore, EngineConfig, FuzzyParams, MatchType,
    QualityAnalyzer, RuleConfig, RuleKind, WarningKind, validate_annexure_groups,
};
use dqaudit_core::validate_and_parse_document;

fn fuzzy(threshold: f64, weights: Vec<f64>) -> RuleKind {
    RuleKind::HybridFuzzy(FuzzyParams {
        threshold: Some(threshold),
        weights: Some(weights),
        ..FuzzyParams::default()
    })
}

fn assert_score(actual: DimensionScore, expected: f64) {
    match actual {
        DimensionScore::Evaluated(score) => assert!(
            (score - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            score
        ),
        DimensionScore::NotEvaluated => panic!("expected {}, got NotEvaluated", expected),
    }
}

#[test]
fn test_scenario_not_null_completeness() {
    let mut rows: Vec<Vec<String>> = (0..8).map(|i| vec![format!("user{}@example.com", i)]).collect();
    rows.push(vec![String::new()]);
    rows.push(vec![String::new()]);
    let dataset = Dataset::from_rows(["email".to_string()], rows).unwrap();
    let rules = vec![RuleConfig::new(RuleKind::NotNull, ["email"])];

    let report = QualityAnalyzer::with_defaults().assess(&dataset, &rules).unwrap();

    assert_score(report.score(Dimension::Completeness), 80.0);
    assert_eq!(report.issues.len(), 2);
    assert!(report.issues.iter().all(|issue| issue.issue_category == "Missing Values"));
    assert_eq!(report.audit_log.len(), 1);
    assert_eq!(report.audit_log.entries()[0].evaluated, 10);
    assert_eq!(report.audit_log.entries()[0].failed, 2);
    assert_eq!(report.annexure.len(), 1);
    assert_eq!(report.annexure[0].rule_label, "Not Null");
    assert_eq!(report.annexure[0].row_ids, vec![8, 9]);
}

#[test]
fn test_scenario_single_column_exact_pair() {
    let dataset = Dataset::from_rows(
        ["company"],
        vec![vec!["acme corp"], vec!["globex"], vec!["acme corp"]],
    )
    .unwrap();
    let rules = vec![RuleConfig::new(RuleKind::SingleColumnExact, ["company"])];

    let report = QualityAnalyzer::with_defaults().assess(&dataset, &rules).unwrap();

    assert_eq!(report.duplicate_groups.len(), 1);
    let group = &report.duplicate_groups[0];
    assert_eq!(group.size(), 2);
    assert_eq!(group.row_ids, vec![0, 2]);
    assert_eq!(group.similarity, 100.0);
    assert_eq!(group.match_type, MatchType::Exact);
    assert_eq!(group.rule_label, "Single Column Exact Duplicate");
}

#[test]
fn test_scenario_fuzzy_name_match() {
    let dataset =
        Dataset::from_rows(["name"], vec![vec!["John Smith"], vec!["Jon Smyth"]]).unwrap();
    let rules = vec![RuleConfig::new(fuzzy(70.0, vec![1.0]), ["name"])];

    let report = QualityAnalyzer::with_defaults().assess(&dataset, &rules).unwrap();

    assert_eq!(report.duplicate_groups.len(), 1);
    let group = &report.duplicate_groups[0];
    assert_eq!(group.match_type, MatchType::Fuzzy);
    assert_eq!(group.rule_label, "Fuzzy Match (>=70%)");
    assert!((group.similarity - 82.923_976_608_187_13).abs() < 1e-6);
    assert_score(report.score(Dimension::Uniqueness), 0.0);

    let issue = &report.issues[0];
    assert_eq!(issue.expected_value, "Unique record");
    assert_eq!(issue.original_value, "John Smith");
}

#[test]
fn test_scenario_oversized_block_is_skipped() {
    let rows: Vec<Vec<String>> = (0..250).map(|i| vec![format!("acme branch {}", i)]).collect();
    let dataset = Dataset::from_rows(["name".to_string()], rows).unwrap();
    let rules = vec![RuleConfig::new(fuzzy(10.0, vec![1.0]), ["name"])];
    let config = EngineConfig::default().with_max_pairs_per_block(1_000);

    let report = QualityAnalyzer::new(config).assess(&dataset, &rules).unwrap();

    assert!(report.duplicate_groups.is_empty());
    assert_eq!(report.warnings_of(WarningKind::PerformanceGuard).count(), 1);
    assert_score(report.score(Dimension::Uniqueness), 100.0);
}

#[test]
fn test_scenario_exact_and_fuzzy_overlap() {
    // Rows 1-3 share a code, rows 3-5 share a name; every other name has a
    // unique two-letter prefix so it lands in a block of its own
    let rows: Vec<Vec<String>> = (0..100usize)
        .map(|i| {
            let code = if (1..=3).contains(&i) {
                "SAME".to_string()
            } else {
                format!("C{:03}", i)
            };
            let name = if (3..=5).contains(&i) {
                "zebra holdings".to_string()
            } else {
                let first = char::from(b'a' + (i / 26) as u8);
                let second = char::from(b'a' + (i % 26) as u8);
                format!("{}{} company", first, second)
            };
            vec![code, name]
        })
        .collect();
    let dataset = Dataset::from_rows(["code".to_string(), "name".to_string()], rows).unwrap();
    let rules = vec![
        RuleConfig::new(RuleKind::SingleColumnExact, ["code"]),
        RuleConfig::new(fuzzy(90.0, vec![1.0]), ["name"]),
    ];

    let report = QualityAnalyzer::with_defaults().assess(&dataset, &rules).unwrap();

    assert_eq!(report.duplicate_groups.len(), 2);
    assert_eq!(report.duplicate_groups[0].row_ids, vec![1, 2, 3]);
    assert_eq!(report.duplicate_groups[1].row_ids, vec![3, 4, 5]);
    assert_eq!(report.duplicate_rows.len(), 5);
    assert_score(report.score(Dimension::Uniqueness), 95.0);

    // Row 3 keeps its exact classification
    let row_three = report
        .duplicate_rows
        .iter()
        .find(|row| row.row_id == 3)
        .unwrap();
    assert_eq!(row_three.match_type, MatchType::Exact);

    let duplicates = report.annexure.last().unwrap();
    assert!(duplicates.is_duplicate);
    assert_eq!(duplicates.row_ids, vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_scenario_fuzzy_groups_are_transitive() {
    let dataset = Dataset::from_rows(
        ["key", "first", "second"],
        vec![
            vec!["same", "bbb", "ddd"],
            vec!["same", "bbb", "eee"],
            vec!["same", "ccc", "eee"],
            vec!["other", "xyz", "uvw"],
        ],
    )
    .unwrap();
    let rules = vec![RuleConfig::new(
        fuzzy(60.0, vec![1.0, 1.0, 1.0]),
        ["key", "first", "second"],
    )];

    let report = QualityAnalyzer::with_defaults().assess(&dataset, &rules).unwrap();

    assert_eq!(report.duplicate_groups.len(), 1);
    assert_eq!(report.duplicate_groups[0].row_ids, vec![0, 1, 2]);
}

#[test]
fn test_scenario_all_absent_rows_never_group() {
    let dataset = Dataset::from_rows(
        ["a", "b"],
        vec![
            vec!["nan", ""],
            vec!["NULL", "n/a"],
            vec!["", " "],
            vec!["x", "y"],
        ],
    )
    .unwrap();
    let rules = vec![
        RuleConfig::new(RuleKind::CombinationExact, ["a", "b"]),
        RuleConfig::new(RuleKind::SingleColumnExact, ["a", "b"]),
    ];

    let report = QualityAnalyzer::with_defaults().assess(&dataset, &rules).unwrap();

    assert!(report.duplicate_groups.is_empty());
    assert_score(report.score(Dimension::Uniqueness), 100.0);
}

#[test]
fn test_scenario_rerun_is_idempotent() {
    let dataset = Dataset::from_rows(
        ["name", "email", "city"],
        vec![
            vec!["Acme Corp ", "info@acme", "Pune"],
            vec!["acme corp", "info@acme.com", "pune"],
            vec!["Globex", "", "Delhi"],
        ],
    )
    .unwrap();
    let rules = vec![
        RuleConfig::new(RuleKind::NotNull, ["email"]),
        RuleConfig::new(RuleKind::EmailFormat, ["email"]),
        RuleConfig::new(RuleKind::ProperCase, ["name", "city"]),
        RuleConfig::new(RuleKind::HybridFuzzy(FuzzyParams::default()), ["name"]),
    ];
    let analyzer = QualityAnalyzer::with_defaults();

    let first = analyzer.assess(&dataset, &rules).unwrap();
    let second = analyzer.assess(&dataset, &rules).unwrap();

    assert_eq!(first.issues, second.issues);
    assert_eq!(first.dimension_scores, second.dimension_scores);
    assert_eq!(first.overall_score, second.overall_score);
    assert_eq!(first.duplicate_groups, second.duplicate_groups);
    assert_eq!(first.annexure, second.annexure);
    assert_ne!(first.run_id, second.run_id);
}

#[test]
fn test_scenario_annexure_gate_rejects_mismatch() {
    let groups = vec![
        AnnexureGroup {
            rule_label: "Email Format".to_string(),
            row_ids: vec![1, 2],
            is_duplicate: false,
            row_count: 2,
        },
        AnnexureGroup {
            rule_label: "Duplicates".to_string(),
            row_ids: vec![0],
            is_duplicate: true,
            row_count: 4,
        },
    ];

    let err = validate_annexure_groups(&groups, 10).unwrap_err();
    assert!(err.is_invariant_violation());
}

#[test]
fn test_scenario_document_round_trip() {
    let document = validate_and_parse_document(
        r#"{
            "dataset": {
                "columns": ["pan", "amount", "joined"],
                "rows": [
                    ["ABCDE1234F", 10, "2023-01-31"],
                    ["abcde1234f", 150, "31/01/2023"],
                    ["12345", null, "someday"]
                ]
            },
            "rules": [
                { "rule": "id_format", "columns": ["pan"] },
                { "rule": "numeric_range", "columns": ["amount"] },
                { "rule": "date_format", "columns": ["joined"] },
                { "rule": "normalize_date", "columns": ["joined"] }
            ]
        }"#,
    )
    .unwrap();

    let report = QualityAnalyzer::new(document.engine)
        .assess(&document.dataset, &document.rules)
        .unwrap();

    // PAN is checked uppercased, so only row 2 fails
    let pan_failures: Vec<usize> = report
        .issues
        .iter()
        .filter(|issue| issue.rule_name == "PAN Format")
        .map(|issue| issue.row_id)
        .collect();
    assert_eq!(pan_failures, vec![2]);

    // 150 is outside the default 0-100 range; the absent cell is skipped
    let range_failures: Vec<usize> = report
        .issues
        .iter()
        .filter(|issue| issue.rule_name.starts_with("Numeric Range"))
        .map(|issue| issue.row_id)
        .collect();
    assert_eq!(range_failures, vec![1]);

    assert_eq!(report.score(Dimension::Uniqueness), DimensionScore::NotEvaluated);
    assert!(report.score(Dimension::Standardization).is_evaluated());
}
