//! Rule registry.
//!
//! [`RuleKind`] is the closed set of rules the engine knows about, one
//! parameter struct per parameterized variant. [`RuleConfig`] binds a rule
//! to its target columns. Both deserialize from JSON with an internally
//! tagged `rule` field:
//!
//! ```json
//! {"rule": "minimum_length", "columns": ["name"], "min_length": 4}
//! ```

use serde::{Deserialize, Serialize};

use super::config::EngineConfig;
use super::models::Dimension;

/// Default PAN pattern used by [`RuleKind::IdFormat`] when no pattern is given.
pub const PAN_PATTERN: &str = r"^[A-Z]{5}[0-9]{4}[A-Z]$";
/// Default allowed-character pattern of [`RuleKind::SpecialCharsNotAllowed`].
pub const DEFAULT_ALLOWED_CHARS_PATTERN: &str = r"^[a-zA-Z0-9\s]+$";
/// Default pattern of [`RuleKind::FormatCheck`].
pub const DEFAULT_FORMAT_PATTERN: &str = r"^[a-zA-Z0-9]+$";
/// Default maximum of [`RuleKind::LengthCheck`].
pub const DEFAULT_MAX_LENGTH: usize = 255;

/// Parameters of [`RuleKind::MinimumLength`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinimumLengthParams {
    /// Minimum trimmed length in characters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
}

/// Parameters of [`RuleKind::DataType`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataTypeParams {
    /// One of `numeric`, `integer`, `float`, `string`, `date`; `string` when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

/// Parameters of [`RuleKind::IdFormat`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdFormatParams {
    /// Full-match pattern applied to the uppercased value; PAN when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Display label for a custom pattern
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Parameters of [`RuleKind::DateFormat`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateFormatParams {
    /// chrono format string; any recognizable date when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Parameters of [`RuleKind::NumericRange`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericRangeParams {
    /// Inclusive lower bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Inclusive upper bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

/// Parameters of [`RuleKind::AllowedValues`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedValuesParams {
    /// Accepted values
    #[serde(default)]
    pub values: Vec<String>,
    /// Compare case-sensitively
    #[serde(default)]
    pub case_sensitive: bool,
}

/// Parameters of [`RuleKind::CustomRegex`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegexParams {
    /// Pattern that must match the whole trimmed value
    #[serde(default)]
    pub pattern: String,
}

/// Parameters of [`RuleKind::LengthCheck`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthCheckParams {
    /// Maximum length in characters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

/// Parameters of [`RuleKind::FormatCheck`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatCheckParams {
    /// Pattern that must match at the start of the value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// Parameters of [`RuleKind::SpecialCharsNotAllowed`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialCharsParams {
    /// Pattern describing the accepted characters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_pattern: Option<String>,
}

/// Parameters of [`RuleKind::NormalizeDate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeDateParams {
    /// chrono output format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_format: Option<String>,
}

/// Parameters of [`RuleKind::ReplaceNullWithDefault`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NullDefaultParams {
    /// Replacement for absent cells
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

/// Parameters of [`RuleKind::HybridFuzzy`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FuzzyParams {
    /// Acceptance threshold in percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    /// One weight per target column, in column order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<Vec<f64>>,
    /// Overrides the engine-wide block pair cap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pairs_per_block: Option<usize>,
    /// Overrides the engine-wide null handling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_nulls: Option<bool>,
}

impl FuzzyParams {
    /// Threshold the matcher uses: the rule's own when it lies in 0-100,
    /// otherwise the engine default.
    pub fn effective_threshold(&self, config: &EngineConfig) -> f64 {
        self.threshold
            .filter(|threshold| (0.0..=100.0).contains(threshold))
            .unwrap_or(config.default_fuzzy_threshold)
    }
}

/// Every rule the engine can run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RuleKind {
    // Completeness
    /// Fails absent cells
    NotNull,
    /// Fails cells whose trimmed value is empty
    NotEmpty,
    /// Fails cells made only of whitespace
    WhitespaceOnly,
    /// Fails cells shorter than a minimum, and absent cells
    MinimumLength(MinimumLengthParams),
    /// Fails absent cells of a required column
    MandatoryColumn,

    // Validity
    /// Checks a value against a data type
    DataType(DataTypeParams),
    /// Checks an email address shape
    EmailFormat,
    /// Checks a phone number shape
    PhoneFormat,
    /// Checks an identifier pattern (PAN by default)
    IdFormat(IdFormatParams),
    /// Checks that a value is a date
    DateFormat(DateFormatParams),
    /// Checks a numeric value against inclusive bounds
    NumericRange(NumericRangeParams),
    /// Checks membership in a list
    AllowedValues(AllowedValuesParams),
    /// Checks a full-match regular expression
    CustomRegex(RegexParams),
    /// Checks a maximum length
    LengthCheck(LengthCheckParams),
    /// Checks a pattern anchored at the start
    FormatCheck(FormatCheckParams),
    /// Checks that only allowed characters are used
    SpecialCharsNotAllowed(SpecialCharsParams),

    // Standardization
    /// Surrounding whitespace
    TrimSpaces,
    /// Repeated inner whitespace
    RemoveExtraSpaces,
    /// Title case
    ProperCase,
    /// Lower case
    Lowercase,
    /// Upper case
    Uppercase,
    /// Characters other than letters, digits and whitespace
    RemoveSpecialChars,
    /// Dates not in the target format
    NormalizeDate(NormalizeDateParams),
    /// Absent cells
    ReplaceNullWithDefault(NullDefaultParams),

    // Uniqueness
    /// Exact duplicates per column, each target column checked on its own
    SingleColumnExact,
    /// Exact duplicates of the combined target columns
    CombinationExact,
    /// Weighted fuzzy duplicates across the target columns
    HybridFuzzy(FuzzyParams),
}

/// Truncates to at most `max` characters.
pub(crate) fn truncate_chars(value: &str, max: usize) -> &str {
    match value.char_indices().nth(max) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

impl RuleKind {
    /// Dimension this rule contributes to.
    pub fn dimension(&self) -> Dimension {
        match self {
            RuleKind::NotNull
            | RuleKind::NotEmpty
            | RuleKind::WhitespaceOnly
            | RuleKind::MinimumLength(_)
            | RuleKind::MandatoryColumn => Dimension::Completeness,
            RuleKind::DataType(_)
            | RuleKind::EmailFormat
            | RuleKind::PhoneFormat
            | RuleKind::IdFormat(_)
            | RuleKind::DateFormat(_)
            | RuleKind::NumericRange(_)
            | RuleKind::AllowedValues(_)
            | RuleKind::CustomRegex(_)
            | RuleKind::LengthCheck(_)
            | RuleKind::FormatCheck(_)
            | RuleKind::SpecialCharsNotAllowed(_) => Dimension::Validity,
            RuleKind::TrimSpaces
            | RuleKind::RemoveExtraSpaces
            | RuleKind::ProperCase
            | RuleKind::Lowercase
            | RuleKind::Uppercase
            | RuleKind::RemoveSpecialChars
            | RuleKind::NormalizeDate(_)
            | RuleKind::ReplaceNullWithDefault(_) => Dimension::Standardization,
            RuleKind::SingleColumnExact
            | RuleKind::CombinationExact
            | RuleKind::HybridFuzzy(_) => Dimension::Uniqueness,
        }
    }

    /// Menu name of the rule, without parameters.
    pub fn display_name(&self) -> &'static str {
        match self {
            RuleKind::NotNull => "Not Null",
            RuleKind::NotEmpty => "Not Empty",
            RuleKind::WhitespaceOnly => "Whitespace Only",
            RuleKind::MinimumLength(_) => "Minimum Length",
            RuleKind::MandatoryColumn => "Mandatory Column",
            RuleKind::DataType(_) => "Data Type Validation",
            RuleKind::EmailFormat => "Email Format",
            RuleKind::PhoneFormat => "Phone Format",
            RuleKind::IdFormat(_) => "PAN / ID Format",
            RuleKind::DateFormat(_) => "Date Format",
            RuleKind::NumericRange(_) => "Numeric Range",
            RuleKind::AllowedValues(_) => "Allowed Values",
            RuleKind::CustomRegex(_) => "Custom Regex",
            RuleKind::LengthCheck(_) => "Length Check",
            RuleKind::FormatCheck(_) => "Format Check",
            RuleKind::SpecialCharsNotAllowed(_) => "Special Characters Not Allowed",
            RuleKind::TrimSpaces => "Trim Spaces",
            RuleKind::RemoveExtraSpaces => "Remove Extra Spaces",
            RuleKind::ProperCase => "Convert to Proper Case",
            RuleKind::Lowercase => "Convert to Lowercase",
            RuleKind::Uppercase => "Convert to Uppercase",
            RuleKind::RemoveSpecialChars => "Remove Special Characters",
            RuleKind::NormalizeDate(_) => "Normalize Date Format",
            RuleKind::ReplaceNullWithDefault(_) => "Replace Null with Default",
            RuleKind::SingleColumnExact => "Single Column Exact Match",
            RuleKind::CombinationExact => "Combination Column Exact Match",
            RuleKind::HybridFuzzy(_) => "Hybrid Fuzzy Match",
        }
    }

    /// Label written to issue records and audit entries, with parameters
    /// resolved against the engine defaults.
    pub fn label(&self, config: &EngineConfig) -> String {
        match self {
            RuleKind::MinimumLength(p) => format!(
                "Minimum Length ({})",
                p.min_length.unwrap_or(config.default_min_length)
            ),
            RuleKind::DataType(p) => {
                format!("Data Type ({})", p.data_type.as_deref().unwrap_or("string"))
            }
            RuleKind::IdFormat(p) => match (&p.pattern, &p.label) {
                (_, Some(label)) => label.clone(),
                (None, None) => "PAN Format".to_string(),
                (Some(pattern), None) if pattern == PAN_PATTERN => "PAN Format".to_string(),
                (Some(pattern), None) => format!("ID Format ({})", truncate_chars(pattern, 30)),
            },
            RuleKind::NumericRange(p) => format!(
                "Numeric Range [{:?}–{:?}]",
                p.min.unwrap_or(config.default_range_min),
                p.max.unwrap_or(config.default_range_max)
            ),
            RuleKind::CustomRegex(p) => format!("Regex: {}", truncate_chars(&p.pattern, 30)),
            RuleKind::LengthCheck(p) => format!(
                "Length Check (max {})",
                p.max_length.unwrap_or(DEFAULT_MAX_LENGTH)
            ),
            RuleKind::FormatCheck(p) => format!(
                "Format Check ({})",
                truncate_chars(p.pattern.as_deref().unwrap_or(DEFAULT_FORMAT_PATTERN), 30)
            ),
            RuleKind::NormalizeDate(p) => format!(
                "Normalize Date ({})",
                p.target_format
                    .as_deref()
                    .unwrap_or(&config.default_date_format)
            ),
            RuleKind::ReplaceNullWithDefault(p) => format!(
                "Replace Null → {}",
                p.default_value
                    .as_deref()
                    .unwrap_or(&config.default_null_replacement)
            ),
            RuleKind::SingleColumnExact => "Single Column Exact Duplicate".to_string(),
            RuleKind::CombinationExact => "Combination Column Exact Duplicate".to_string(),
            RuleKind::HybridFuzzy(p) => {
                format!("Fuzzy Match (>={}%)", p.effective_threshold(config))
            }
            other => other.display_name().to_string(),
        }
    }
}

/// A rule bound to its target columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Target columns. Column rules run once per column; combination and
    /// fuzzy rules use them together.
    pub columns: Vec<String>,
    /// The rule and its parameters
    #[serde(flatten)]
    pub kind: RuleKind,
}

impl RuleConfig {
    /// Binds a rule to columns.
    pub fn new<I, S>(kind: RuleKind, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            kind,
        }
    }

    /// Dimension of the bound rule.
    pub fn dimension(&self) -> Dimension {
        self.kind.dimension()
    }
}

/// One entry of the rule catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    /// Dimension the rule belongs to
    pub dimension: Dimension,
    /// Value of the `rule` tag in rule configuration
    pub rule: &'static str,
    /// Menu name
    pub name: &'static str,
}

/// Lists every rule kind, grouped by dimension in reporting order.
pub fn catalog() -> Vec<CatalogEntry> {
    let kinds = [
        (RuleKind::NotNull, "not_null"),
        (RuleKind::NotEmpty, "not_empty"),
        (RuleKind::WhitespaceOnly, "whitespace_only"),
        (RuleKind::MinimumLength(MinimumLengthParams::default()), "minimum_length"),
        (RuleKind::MandatoryColumn, "mandatory_column"),
        (RuleKind::DataType(DataTypeParams::default()), "data_type"),
        (RuleKind::EmailFormat, "email_format"),
        (RuleKind::PhoneFormat, "phone_format"),
        (RuleKind::IdFormat(IdFormatParams::default()), "id_format"),
        (RuleKind::DateFormat(DateFormatParams::default()), "date_format"),
        (RuleKind::NumericRange(NumericRangeParams::default()), "numeric_range"),
        (RuleKind::AllowedValues(AllowedValuesParams::default()), "allowed_values"),
        (RuleKind::CustomRegex(RegexParams::default()), "custom_regex"),
        (RuleKind::LengthCheck(LengthCheckParams::default()), "length_check"),
        (RuleKind::FormatCheck(FormatCheckParams::default()), "format_check"),
        (
            RuleKind::SpecialCharsNotAllowed(SpecialCharsParams::default()),
            "special_chars_not_allowed",
        ),
        (RuleKind::SingleColumnExact, "single_column_exact"),
        (RuleKind::CombinationExact, "combination_exact"),
        (RuleKind::HybridFuzzy(FuzzyParams::default()), "hybrid_fuzzy"),
        (RuleKind::TrimSpaces, "trim_spaces"),
        (RuleKind::RemoveExtraSpaces, "remove_extra_spaces"),
        (RuleKind::ProperCase, "proper_case"),
        (RuleKind::Lowercase, "lowercase"),
        (RuleKind::Uppercase, "uppercase"),
        (RuleKind::RemoveSpecialChars, "remove_special_chars"),
        (RuleKind::NormalizeDate(NormalizeDateParams::default()), "normalize_date"),
        (
            RuleKind::ReplaceNullWithDefault(NullDefaultParams::default()),
            "replace_null_with_default",
        ),
    ];

    let mut entries: Vec<CatalogEntry> = kinds
        .iter()
        .map(|(kind, tag)| CatalogEntry {
            dimension: kind.dimension(),
            rule: *tag,
            name: kind.display_name(),
        })
        .collect();
    // Stable: keeps menu order inside each dimension
    entries.sort_by_key(|entry| entry.dimension);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_config_deserializes_tagged_rules() {
        let json = serde_json::json!([
            {"rule": "not_null", "columns": ["email"]},
            {"rule": "minimum_length", "columns": ["name"], "min_length": 4},
            {"rule": "numeric_range", "columns": ["age"], "min": 18, "max": 65},
            {"rule": "allowed_values", "columns": ["status"], "values": ["open", "closed"]},
            {"rule": "hybrid_fuzzy", "columns": ["name", "city"], "threshold": 70, "weights": [0.7, 0.3]}
        ]);
        let rules: Vec<RuleConfig> = serde_json::from_value(json).unwrap();

        assert_eq!(rules[0].kind, RuleKind::NotNull);
        assert_eq!(
            rules[1].kind,
            RuleKind::MinimumLength(MinimumLengthParams {
                min_length: Some(4)
            })
        );
        assert_eq!(
            rules[2].kind,
            RuleKind::NumericRange(NumericRangeParams {
                min: Some(18.0),
                max: Some(65.0)
            })
        );
        match &rules[4].kind {
            RuleKind::HybridFuzzy(p) => {
                assert_eq!(p.threshold, Some(70.0));
                assert_eq!(p.weights, Some(vec![0.7, 0.3]));
            }
            other => panic!("unexpected rule {:?}", other),
        }
        assert_eq!(rules[4].columns, vec!["name", "city"]);
    }

    #[test]
    fn test_unknown_rule_tag_is_rejected() {
        let json = serde_json::json!({"rule": "telepathy", "columns": ["x"]});
        assert!(serde_json::from_value::<RuleConfig>(json).is_err());
    }

    #[test]
    fn test_labels_include_resolved_parameters() {
        let config = EngineConfig::default();

        let rule = RuleKind::MinimumLength(MinimumLengthParams::default());
        assert_eq!(rule.label(&config), "Minimum Length (3)");

        let rule = RuleKind::NumericRange(NumericRangeParams::default());
        assert_eq!(rule.label(&config), "Numeric Range [0.0–100.0]");

        let rule = RuleKind::DataType(DataTypeParams {
            data_type: Some("integer".to_string()),
        });
        assert_eq!(rule.label(&config), "Data Type (integer)");

        let rule = RuleKind::CustomRegex(RegexParams {
            pattern: "^[0-9]{6}$".to_string(),
        });
        assert_eq!(rule.label(&config), "Regex: ^[0-9]{6}$");

        let rule = RuleKind::ReplaceNullWithDefault(NullDefaultParams::default());
        assert_eq!(rule.label(&config), "Replace Null → N/A");

        let rule = RuleKind::HybridFuzzy(FuzzyParams::default());
        assert_eq!(rule.label(&config), "Fuzzy Match (>=80%)");

        let rule = RuleKind::HybridFuzzy(FuzzyParams {
            threshold: Some(140.0),
            ..FuzzyParams::default()
        });
        assert_eq!(rule.label(&config), "Fuzzy Match (>=80%)");

        let rule = RuleKind::HybridFuzzy(FuzzyParams {
            threshold: Some(72.5),
            ..FuzzyParams::default()
        });
        assert_eq!(rule.label(&config), "Fuzzy Match (>=72.5%)");

        assert_eq!(RuleKind::NotNull.label(&config), "Not Null");
        assert_eq!(
            RuleKind::IdFormat(IdFormatParams::default()).label(&config),
            "PAN Format"
        );
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("ab", 3), "ab");
        assert_eq!(truncate_chars("ééé", 2), "éé");
    }

    #[test]
    fn test_catalog_is_grouped_by_dimension() {
        let entries = catalog();
        assert_eq!(entries.len(), 27);

        let dimensions: Vec<Dimension> = entries.iter().map(|e| e.dimension).collect();
        let mut sorted = dimensions.clone();
        sorted.sort();
        assert_eq!(dimensions, sorted);

        assert_eq!(entries[0].name, "Not Null");
        assert!(
            entries
                .iter()
                .any(|e| e.rule == "hybrid_fuzzy" && e.dimension == Dimension::Uniqueness)
        );
    }

    #[test]
    fn test_catalog_tags_round_trip_through_serde() {
        for entry in catalog() {
            let json = serde_json::json!({"rule": entry.rule, "columns": ["c"]});
            let config: RuleConfig = serde_json::from_value(json)
                .unwrap_or_else(|e| panic!("tag {} failed: {}", entry.rule, e));
            assert_eq!(config.dimension(), entry.dimension);
            assert_eq!(config.kind.display_name(), entry.name);
        }
    }
}
