//! Standardization transforms and the clean dataset derivative.
//!
//! A transform maps a raw cell to its canonical form. During assessment the
//! dataset is never rewritten: a cell whose canonical form differs from the
//! raw value is reported, with the canonical form as the expected value.
//! [`build_clean_dataset`] is the only place the transforms are applied.

use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;

use thiserror::Error;

use crate::error::Result;
use crate::models::{Dataset, classify_cell};

use super::config::EngineConfig;
use super::models::{FlaggedRow, IssueRecord};
use super::rules::{RuleConfig, RuleKind};
use super::validity::{is_valid_date_format, parse_date_auto};

/// Name of the column appended by [`build_clean_dataset`].
pub const ISSUE_FLAG_COLUMN: &str = "Issue_Flag";

/// Malformed standardization rule parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StandardizationError {
    #[error("invalid target date format '{0}'")]
    InvalidDateFormat(String),
}

/// A standardization rule with its parameters resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transform {
    /// Strip surrounding whitespace
    Trim,
    /// Strip, then collapse inner whitespace runs to one space
    CollapseSpaces,
    /// Strip, then title-case
    ProperCase,
    /// Strip, then lowercase
    Lowercase,
    /// Strip, then uppercase
    Uppercase,
    /// Drop characters other than ASCII letters, digits and whitespace, then strip
    StripSpecialChars,
    /// Re-render recognizable dates in the given chrono format
    NormalizeDate(String),
    /// Replace absent cells with the given value
    ReplaceNull(String),
}

impl Transform {
    /// Resolves a rule kind.
    ///
    /// Returns `Ok(None)` if the kind is not a standardization rule.
    ///
    /// # Errors
    ///
    /// Returns an error if the target date format is unusable.
    pub fn from_kind(
        kind: &RuleKind,
        config: &EngineConfig,
    ) -> std::result::Result<Option<Self>, StandardizationError> {
        let transform = match kind {
            RuleKind::TrimSpaces => Self::Trim,
            RuleKind::RemoveExtraSpaces => Self::CollapseSpaces,
            RuleKind::ProperCase => Self::ProperCase,
            RuleKind::Lowercase => Self::Lowercase,
            RuleKind::Uppercase => Self::Uppercase,
            RuleKind::RemoveSpecialChars => Self::StripSpecialChars,
            RuleKind::NormalizeDate(params) => {
                let format = params
                    .target_format
                    .clone()
                    .unwrap_or_else(|| config.default_date_format.clone());
                if !is_valid_date_format(&format) {
                    return Err(StandardizationError::InvalidDateFormat(format));
                }
                Self::NormalizeDate(format)
            }
            RuleKind::ReplaceNullWithDefault(params) => Self::ReplaceNull(
                params
                    .default_value
                    .clone()
                    .unwrap_or_else(|| config.default_null_replacement.clone()),
            ),
            _ => return Ok(None),
        };
        Ok(Some(transform))
    }

    /// Returns the canonical form of a raw cell.
    pub fn apply(&self, raw: &str) -> String {
        match self {
            Self::Trim => raw.trim().to_string(),
            Self::CollapseSpaces => raw.split_whitespace().collect::<Vec<_>>().join(" "),
            Self::ProperCase => title_case(raw.trim()),
            Self::Lowercase => raw.trim().to_lowercase(),
            Self::Uppercase => raw.trim().to_uppercase(),
            Self::StripSpecialChars => raw
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
                .collect::<String>()
                .trim()
                .to_string(),
            Self::NormalizeDate(format) => {
                let Some(parsed) = parse_date_auto(raw) else {
                    return raw.to_string();
                };
                let mut rendered = String::new();
                match write!(rendered, "{}", parsed.format(format)) {
                    Ok(()) => rendered,
                    Err(_) => raw.to_string(),
                }
            }
            Self::ReplaceNull(default) => {
                if classify_cell(raw).is_absent() {
                    default.clone()
                } else {
                    raw.to_string()
                }
            }
        }
    }

    /// Returns the canonical form if it differs from the raw cell.
    pub fn evaluate(&self, raw: &str) -> Option<String> {
        let cleaned = self.apply(raw);
        (cleaned != raw).then_some(cleaned)
    }
}

/// Title-cases like a word-boundary capitalizer: a letter is uppercased when
/// the previous character is not a letter, lowercased otherwise.
fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut previous_is_letter = false;
    for c in value.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            out.push(c);
            previous_is_letter = false;
        }
    }
    out
}

/// Builds the clean copy of a dataset.
///
/// Standardization rules are applied in configuration order, each seeing the
/// output of the previous one. Duplicate rows are removed, keeping the lowest
/// row of each group, and an [`ISSUE_FLAG_COLUMN`] (`Yes`/`No`) marks rows that
/// carried any issue. Rules with unknown columns or unusable parameters are
/// skipped, as they are during assessment.
///
/// # Errors
///
/// Returns an error only if the derived table would be malformed.
pub fn build_clean_dataset(
    dataset: &Dataset,
    rules: &[RuleConfig],
    config: &EngineConfig,
    duplicate_rows: &[FlaggedRow],
    issues: &[IssueRecord],
) -> Result<Dataset> {
    let mut cleaned = dataset.clone();

    for rule in rules {
        let Ok(Some(transform)) = Transform::from_kind(&rule.kind, config) else {
            continue;
        };
        for column in &rule.columns {
            let Some(index) = cleaned.column_index(column) else {
                continue;
            };
            let values = cleaned
                .column_values(index)
                .map(|raw| transform.apply(raw))
                .collect();
            cleaned = cleaned.with_column_values(index, values)?;
        }
    }

    let mut keepers: BTreeMap<usize, usize> = BTreeMap::new();
    for flagged in duplicate_rows {
        keepers
            .entry(flagged.group_id)
            .and_modify(|row| *row = (*row).min(flagged.row_id))
            .or_insert(flagged.row_id);
    }
    let keep: HashSet<usize> = keepers.values().copied().collect();
    let removed: HashSet<usize> = duplicate_rows
        .iter()
        .map(|flagged| flagged.row_id)
        .filter(|row| !keep.contains(row))
        .collect();
    let flagged: HashSet<usize> = issues.iter().map(|issue| issue.row_id).collect();

    tracing::debug!(
        removed = removed.len(),
        flagged = flagged.len(),
        "Building clean dataset"
    );

    cleaned.filter_with_extra_column(
        ISSUE_FLAG_COLUMN,
        |row| !removed.contains(&row),
        |row| {
            if flagged.contains(&row) {
                "Yes".to_string()
            } else {
                "No".to_string()
            }
        },
    )
}
