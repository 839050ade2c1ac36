//! Tabular dataset model and null-sentinel normalization.
//!
//! A [`Dataset`] is an ordered list of column names and an ordered list of
//! rows whose cells are plain strings. Upstream loaders turn spreadsheet
//! blanks and `NaN`s into strings such as `""` or `"nan"`, so absence is
//! decided here, in one place, by [`classify_cell`].

use serde::{Deserialize, Serialize};

use crate::error::{DqError, Result};

/// Cell strings treated as "no data", compared case-insensitively after
/// trimming surrounding whitespace.
pub const NULL_SENTINELS: &[&str] = &[
    "", "nan", "none", "null", "na", "n/a", "n.a.", "nil", "missing", "#n/a",
];

/// Classification of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellValue<'a> {
    /// The cell carries data; holds the trimmed value
    Present(&'a str),
    /// The cell is empty, whitespace-only or a null sentinel
    Absent,
}

impl<'a> CellValue<'a> {
    /// Returns true for [`CellValue::Absent`].
    pub fn is_absent(&self) -> bool {
        matches!(self, CellValue::Absent)
    }

    /// Returns the trimmed value when present.
    pub fn as_present(&self) -> Option<&'a str> {
        match self {
            CellValue::Present(value) => Some(value),
            CellValue::Absent => None,
        }
    }
}

/// Returns true if the (untrimmed) cell normalizes into the null-sentinel set.
pub fn is_null_sentinel(raw: &str) -> bool {
    let trimmed = raw.trim();
    NULL_SENTINELS
        .iter()
        .any(|sentinel| trimmed.eq_ignore_ascii_case(sentinel))
}

/// Classifies a raw cell as present or absent.
///
/// Every rule and every duplicate-detection path goes through this function,
/// so the sentinel vocabulary cannot drift between components.
pub fn classify_cell(raw: &str) -> CellValue<'_> {
    if is_null_sentinel(raw) {
        CellValue::Absent
    } else {
        CellValue::Present(raw.trim())
    }
}

/// Normalizes a cell for duplicate comparison (trim + lowercase).
///
/// Returns `None` for absent cells.
pub fn normalize_key(raw: &str) -> Option<String> {
    classify_cell(raw)
        .as_present()
        .map(|value| value.to_lowercase())
}

/// Immutable, rectangular table of string cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDataset")]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Wire form of a dataset; cells may be any JSON scalar.
#[derive(Debug, Deserialize)]
struct RawDataset {
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<serde_json::Value>>,
}

impl TryFrom<RawDataset> for Dataset {
    type Error = DqError;

    fn try_from(raw: RawDataset) -> Result<Self> {
        let rows = raw
            .rows
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect();
        Self::new(raw.columns, rows)
    }
}

/// Converts a JSON scalar into its cell string. `null` becomes `""`.
fn cell_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

impl Dataset {
    /// Creates a dataset, rejecting ragged rows and duplicate column names.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        for (i, name) in columns.iter().enumerate() {
            if columns[..i].contains(name) {
                return Err(DqError::configuration(format!(
                    "Duplicate column name '{}'",
                    name
                )));
            }
        }

        if let Some((row_id, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(DqError::configuration(format!(
                "Row {} has {} cells, expected {}",
                row_id,
                row.len(),
                columns.len()
            )));
        }

        Ok(Self { columns, rows })
    }

    /// Convenience constructor from string slices, mainly for tests and demos.
    pub fn from_rows<C, R, S>(columns: C, rows: R) -> Result<Self>
    where
        C: IntoIterator<Item = S>,
        R: IntoIterator<Item = Vec<S>>,
        S: Into<String>,
    {
        Self::new(
            columns.into_iter().map(Into::into).collect(),
            rows.into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        )
    }

    /// Ordered column names.
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// Ordered rows.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Exact-name column lookup.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Case-insensitive column lookup.
    pub fn column_index_ignore_case(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.trim().eq_ignore_ascii_case(name))
    }

    /// Returns the raw cell at `(row, column)`.
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
    }

    /// Iterates the raw cells of one column in row order.
    pub fn column_values(&self, column: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(column).map_or("", String::as_str))
    }

    /// Returns a copy with one column's cells replaced.
    ///
    /// `values` must have exactly one entry per row.
    pub(crate) fn with_column_values(&self, column: usize, values: Vec<String>) -> Result<Self> {
        if values.len() != self.rows.len() || column >= self.columns.len() {
            return Err(DqError::invariant(format!(
                "Column replacement has {} values for {} rows",
                values.len(),
                self.rows.len()
            )));
        }
        let mut rows = self.rows.clone();
        for (row, value) in rows.iter_mut().zip(values) {
            row[column] = value;
        }
        Ok(Self {
            columns: self.columns.clone(),
            rows,
        })
    }

    /// Returns a copy keeping only the rows for which `keep` is true and
    /// appending one extra column computed per kept row.
    pub(crate) fn filter_with_extra_column<F, G>(
        &self,
        extra_column: &str,
        mut keep: F,
        mut extra: G,
    ) -> Result<Self>
    where
        F: FnMut(usize) -> bool,
        G: FnMut(usize) -> String,
    {
        let mut columns = self.columns.clone();
        columns.push(extra_column.to_string());
        let rows = self
            .rows
            .iter()
            .enumerate()
            .filter(|(row_id, _)| keep(*row_id))
            .map(|(row_id, row)| {
                let mut row = row.clone();
                row.push(extra(row_id));
                row
            })
            .collect();
        Self::new(columns, rows)
    }
}

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;
