//! Issue aggregation and annexure assembly.
//!
//! Issue records are regrouped three ways: per row (the results listing),
//! per rule label (annexure sections) and per column (risk summary). The
//! annexure is checked by [`validate_annexure_groups`] before anything is
//! returned to a caller.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::{DqError, Result};

use super::models::{AnnexureGroup, ColumnRisk, Dimension, FlaggedRow, IssueRecord, RowIssues};

/// Label of the trailing duplicates section.
pub const DUPLICATES_GROUP_LABEL: &str = "Duplicates";

/// Returns true for labels that name a dimension or an issue category rather
/// than a rule.
fn is_dimension_label(label: &str) -> bool {
    Dimension::ALL.iter().any(|dimension| {
        label == dimension.to_string() || label == dimension.issue_category()
    })
}

/// Maps each row with at least one non-duplicate issue to its issue summary.
pub fn row_issue_map(issues: &[IssueRecord]) -> BTreeMap<usize, RowIssues> {
    let mut rows: BTreeMap<usize, (Vec<String>, BTreeSet<Dimension>)> = BTreeMap::new();
    for issue in issues
        .iter()
        .filter(|issue| issue.dimension != Dimension::Uniqueness)
    {
        let label = issue.rule_name.trim();
        let (labels, dimensions) = rows.entry(issue.row_id).or_default();
        if !label.is_empty() && !labels.iter().any(|known| known == label) {
            labels.push(label.to_string());
        }
        dimensions.insert(issue.dimension);
    }

    rows.into_iter()
        .map(|(row, (issues, dimensions))| {
            (
                row,
                RowIssues {
                    issue_count: issues.len(),
                    issues,
                    categories: dimensions.into_iter().collect(),
                },
            )
        })
        .collect()
}

/// Builds the ordered annexure sections.
///
/// One section per rule label with at least one failing row, sorted by row
/// count descending (ties keep first appearance), then a single
/// [`DUPLICATES_GROUP_LABEL`] section when any row was flagged as duplicate.
/// Uniqueness issues never form rule sections.
pub fn build_annexure_groups(
    issues: &[IssueRecord],
    duplicate_rows: &[FlaggedRow],
) -> Vec<AnnexureGroup> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut sections: Vec<(&str, BTreeSet<usize>)> = Vec::new();

    for issue in issues
        .iter()
        .filter(|issue| issue.dimension != Dimension::Uniqueness)
    {
        let label = issue.rule_name.trim();
        if label.is_empty() || is_dimension_label(label) {
            continue;
        }
        let slot = *slots.entry(label).or_insert_with(|| {
            sections.push((label, BTreeSet::new()));
            sections.len() - 1
        });
        sections[slot].1.insert(issue.row_id);
    }

    let mut groups: Vec<AnnexureGroup> = sections
        .into_iter()
        .filter(|(_, rows)| !rows.is_empty())
        .map(|(label, rows)| AnnexureGroup {
            rule_label: label.to_string(),
            row_count: rows.len(),
            row_ids: rows.into_iter().collect(),
            is_duplicate: false,
        })
        .collect();
    groups.sort_by(|a, b| b.row_count.cmp(&a.row_count));

    let duplicates: BTreeSet<usize> = duplicate_rows.iter().map(|row| row.row_id).collect();
    if !duplicates.is_empty() {
        groups.push(AnnexureGroup {
            rule_label: DUPLICATES_GROUP_LABEL.to_string(),
            row_count: duplicates.len(),
            row_ids: duplicates.into_iter().collect(),
            is_duplicate: true,
        });
    }
    groups
}

/// Checks every annexure section before output.
///
/// # Errors
///
/// Returns a validation invariant error listing every section whose declared
/// row count differs from its row list, or that references a row outside
/// `0..total_rows`.
pub fn validate_annexure_groups(groups: &[AnnexureGroup], total_rows: usize) -> Result<()> {
    let mut problems = Vec::new();
    for (position, group) in groups.iter().enumerate() {
        if group.row_count != group.row_ids.len() {
            problems.push(format!(
                "annexure {} '{}' declares {} rows but lists {}",
                position + 1,
                group.rule_label,
                group.row_count,
                group.row_ids.len()
            ));
        }
        if let Some(row) = group.row_ids.iter().find(|&&row| row >= total_rows) {
            problems.push(format!(
                "annexure {} '{}' references row {} of a {}-row dataset",
                position + 1,
                group.rule_label,
                row,
                total_rows
            ));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(DqError::invariant(format!(
            "summary and annexure counts mismatch: {}",
            problems.join("; ")
        )))
    }
}

/// Aggregates all issues, duplicates included, per column.
///
/// Sorted by issue count descending; ties keep first appearance.
pub fn column_risk_summary(issues: &[IssueRecord]) -> Vec<ColumnRisk> {
    struct Acc<'a> {
        count: usize,
        rules: BTreeSet<&'a str>,
        categories: BTreeSet<&'a str>,
        dimensions: BTreeSet<Dimension>,
    }

    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut columns: Vec<(&str, Acc<'_>)> = Vec::new();
    for issue in issues {
        let slot = *slots.entry(issue.column_name.as_str()).or_insert_with(|| {
            columns.push((
                issue.column_name.as_str(),
                Acc {
                    count: 0,
                    rules: BTreeSet::new(),
                    categories: BTreeSet::new(),
                    dimensions: BTreeSet::new(),
                },
            ));
            columns.len() - 1
        });
        let acc = &mut columns[slot].1;
        acc.count += 1;
        acc.rules.insert(issue.rule_name.as_str());
        acc.categories.insert(issue.issue_category.as_str());
        acc.dimensions.insert(issue.dimension);
    }

    let mut risks: Vec<ColumnRisk> = columns
        .into_iter()
        .map(|(column, acc)| ColumnRisk {
            column_name: column.to_string(),
            issue_count: acc.count,
            failed_rules: acc.rules.into_iter().map(str::to_string).collect(),
            issue_categories: acc.categories.into_iter().map(str::to_string).collect(),
            dimensions: acc.dimensions.into_iter().collect(),
        })
        .collect();
    risks.sort_by(|a, b| b.issue_count.cmp(&a.issue_count));
    risks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::models::MatchType;

    fn issue(row: usize, column: &str, rule: &str, dimension: Dimension) -> IssueRecord {
        IssueRecord::new(row, column, rule, "x", "y", dimension)
    }

    fn flagged(row_id: usize, group_id: usize) -> FlaggedRow {
        FlaggedRow {
            row_id,
            group_id,
            match_type: MatchType::Exact,
            similarity: 100.0,
        }
    }

    fn sample_issues() -> Vec<IssueRecord> {
        vec![
            issue(4, "email", "Not Null", Dimension::Completeness),
            issue(1, "email", "Email Format", Dimension::Validity),
            issue(4, "email", "Email Format", Dimension::Validity),
            issue(2, "phone", "Email Format", Dimension::Validity),
            issue(4, "name", "Trim Spaces", Dimension::Standardization),
            issue(0, "name", "Single Column Exact Duplicate", Dimension::Uniqueness),
        ]
    }

    #[test]
    fn test_row_issue_map() {
        let map = row_issue_map(&sample_issues());
        assert_eq!(map.len(), 3);
        let row = &map[&4];
        assert_eq!(row.issues, vec!["Not Null", "Email Format", "Trim Spaces"]);
        assert_eq!(row.issue_count, 3);
        assert_eq!(
            row.categories,
            vec![
                Dimension::Completeness,
                Dimension::Validity,
                Dimension::Standardization
            ]
        );
        // Duplicates are reported separately
        assert!(!map.contains_key(&0));
    }

    #[test]
    fn test_build_annexure_groups() {
        let groups = build_annexure_groups(&sample_issues(), &[flagged(3, 1), flagged(0, 1), flagged(3, 2)]);
        let labels: Vec<&str> = groups.iter().map(|g| g.rule_label.as_str()).collect();
        assert_eq!(labels, vec!["Email Format", "Not Null", "Trim Spaces", "Duplicates"]);
        assert_eq!(groups[0].row_ids, vec![1, 2, 4]);
        assert_eq!(groups[0].row_count, 3);
        let last = groups.last().unwrap();
        assert!(last.is_duplicate);
        assert_eq!(last.row_ids, vec![0, 3]);
        assert!(validate_annexure_groups(&groups, 5).is_ok());
    }

    #[test]
    fn test_dimension_labels_never_form_groups() {
        let issues = vec![
            issue(0, "a", "Completeness", Dimension::Completeness),
            issue(0, "a", "Invalid Format", Dimension::Validity),
        ];
        assert!(build_annexure_groups(&issues, &[]).is_empty());
    }

    #[test]
    fn test_no_duplicates_no_trailing_group() {
        let groups = build_annexure_groups(&sample_issues(), &[]);
        assert!(groups.iter().all(|g| !g.is_duplicate));
    }

    #[test]
    fn test_validate_rejects_count_mismatch() {
        let groups = vec![AnnexureGroup {
            rule_label: "Not Null".to_string(),
            row_ids: vec![0, 1],
            is_duplicate: false,
            row_count: 3,
        }];
        let err = validate_annexure_groups(&groups, 10).unwrap_err();
        assert!(err.is_invariant_violation());
        assert!(err.to_string().contains("declares 3 rows but lists 2"));
    }

    #[test]
    fn test_validate_rejects_out_of_bounds_row() {
        let groups = vec![AnnexureGroup {
            rule_label: DUPLICATES_GROUP_LABEL.to_string(),
            row_ids: vec![0, 12],
            is_duplicate: true,
            row_count: 2,
        }];
        assert!(validate_annexure_groups(&groups, 10).is_err());
    }

    #[test]
    fn test_column_risk_summary() {
        let risks = column_risk_summary(&sample_issues());
        assert_eq!(risks[0].column_name, "email");
        assert_eq!(risks[0].issue_count, 3);
        assert_eq!(risks[0].failed_rules, vec!["Email Format", "Not Null"]);
        assert_eq!(
            risks[0].issue_categories,
            vec!["Invalid Format", "Missing Values"]
        );
        assert_eq!(risks[1].column_name, "name");
        assert_eq!(risks[1].dimensions, vec![Dimension::Uniqueness, Dimension::Standardization]);
        assert_eq!(risks[2].column_name, "phone");
    }
}
