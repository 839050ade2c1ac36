//! Completeness checks.
//!
//! Completeness owns absence: these are the only checks that fail a cell
//! for being empty or a null sentinel.

use crate::models::{CellValue, classify_cell};

use super::config::EngineConfig;
use super::rules::RuleKind;

/// A completeness rule with its parameters resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletenessCheck {
    /// Fails absent cells
    NotNull,
    /// Fails cells whose trimmed value is empty
    NotEmpty,
    /// Fails cells made only of whitespace characters
    WhitespaceOnly,
    /// Fails absent cells and cells shorter than `n` characters once trimmed
    MinimumLength(usize),
    /// Fails absent cells of a required column
    Mandatory,
}

impl CompletenessCheck {
    /// Resolves a rule kind, or `None` if it is not a completeness rule.
    pub fn from_kind(kind: &RuleKind, config: &EngineConfig) -> Option<Self> {
        match kind {
            RuleKind::NotNull => Some(Self::NotNull),
            RuleKind::NotEmpty => Some(Self::NotEmpty),
            RuleKind::WhitespaceOnly => Some(Self::WhitespaceOnly),
            RuleKind::MinimumLength(params) => Some(Self::MinimumLength(
                params.min_length.unwrap_or(config.default_min_length),
            )),
            RuleKind::MandatoryColumn => Some(Self::Mandatory),
            _ => None,
        }
    }

    /// Returns true if the raw cell satisfies the check.
    pub fn passes(&self, raw: &str) -> bool {
        match self {
            Self::NotNull | Self::Mandatory => !classify_cell(raw).is_absent(),
            Self::NotEmpty => !raw.trim().is_empty(),
            Self::WhitespaceOnly => !is_whitespace_only(raw),
            Self::MinimumLength(min) => match classify_cell(raw) {
                CellValue::Present(value) => value.chars().count() >= *min,
                CellValue::Absent => false,
            },
        }
    }

    /// Expected value written to issue records.
    pub fn expected(&self) -> String {
        match self {
            Self::NotNull => "Non-null value".to_string(),
            Self::NotEmpty => "Non-empty value".to_string(),
            Self::WhitespaceOnly => "Non-whitespace value".to_string(),
            Self::MinimumLength(min) => format!("Length ≥ {}", min),
            Self::Mandatory => "Required value".to_string(),
        }
    }

    /// Original value as written to issue records.
    ///
    /// Whitespace-only failures are quoted so the whitespace stays visible.
    pub fn original_display(&self, raw: &str) -> String {
        match self {
            Self::WhitespaceOnly => format!("{:?}", raw),
            _ => raw.to_string(),
        }
    }
}

fn is_whitespace_only(raw: &str) -> bool {
    !raw.is_empty() && raw.chars().all(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::rules::MinimumLengthParams;

    #[test]
    fn test_not_null_fails_only_absent_cells() {
        let check = CompletenessCheck::NotNull;
        for raw in ["", "  ", "nan", "NULL", "n/a", "#N/A"] {
            assert!(!check.passes(raw), "'{}' should fail", raw);
        }
        for raw in ["0", "x", "nana", "false"] {
            assert!(check.passes(raw), "'{}' should pass", raw);
        }
    }

    #[test]
    fn test_not_empty_uses_trimmed_value() {
        let check = CompletenessCheck::NotEmpty;
        assert!(!check.passes(""));
        assert!(!check.passes(" \t "));
        // Sentinels are a NotNull concern
        assert!(check.passes("nan"));
    }

    #[test]
    fn test_whitespace_only() {
        let check = CompletenessCheck::WhitespaceOnly;
        assert!(!check.passes("   "));
        assert!(!check.passes("\t"));
        assert!(check.passes(""));
        assert!(check.passes(" a "));
        assert_eq!(check.original_display("  "), "\"  \"");
        assert_eq!(check.expected(), "Non-whitespace value");
    }

    #[test]
    fn test_minimum_length_fails_absent_cells() {
        let check = CompletenessCheck::MinimumLength(3);
        assert!(!check.passes("ab"));
        assert!(!check.passes("  ab  "));
        assert!(!check.passes("nan"));
        assert!(!check.passes(""));
        assert!(check.passes("abc"));
        assert!(check.passes("héllo"));
        assert_eq!(check.expected(), "Length ≥ 3");
    }

    #[test]
    fn test_from_kind_resolves_defaults() {
        let config = EngineConfig::default().with_default_min_length(5);
        let check = CompletenessCheck::from_kind(
            &RuleKind::MinimumLength(MinimumLengthParams::default()),
            &config,
        );
        assert_eq!(check, Some(CompletenessCheck::MinimumLength(5)));

        let check = CompletenessCheck::from_kind(
            &RuleKind::MinimumLength(MinimumLengthParams {
                min_length: Some(2),
            }),
            &config,
        );
        assert_eq!(check, Some(CompletenessCheck::MinimumLength(2)));

        assert_eq!(
            CompletenessCheck::from_kind(&RuleKind::EmailFormat, &config),
            None
        );
    }

    #[test]
    fn test_mandatory_matches_not_null() {
        let check = CompletenessCheck::Mandatory;
        assert!(!check.passes("None"));
        assert!(check.passes("value"));
        assert_eq!(check.expected(), "Required value");
    }
}
