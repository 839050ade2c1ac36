//! Validity checks.
//!
//! Validity owns format: every check here passes absent cells, which are
//! left to the completeness rules. Patterns are compiled once per rule;
//! a malformed parameter is reported as a [`ValidityError`] so the executor
//! can degrade the rule instead of aborting the run.

use std::collections::HashSet;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use thiserror::Error;

use crate::models::classify_cell;

use super::config::EngineConfig;
use super::rules::{
    DEFAULT_ALLOWED_CHARS_PATTERN, DEFAULT_FORMAT_PATTERN, DEFAULT_MAX_LENGTH, PAN_PATTERN,
    RuleKind, truncate_chars,
};

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9_.+\-]+@[a-zA-Z0-9\-]+\.[a-zA-Z0-9.\-]+$";
const PHONE_PATTERN: &str = r"^\+?[0-9][\d\s\-\(\)]{6,14}$";
const NUMERIC_PATTERN: &str = r"^-?\d+\.?\d*$";
const INTEGER_PATTERN: &str = r"^-?\d+$";
const FLOAT_PATTERN: &str = r"^-?\d+\.\d+$";

/// Day-first date layouts tried by auto-detection, two-digit years first.
const DATE_LAYOUTS: &[&str] = &[
    "%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%d-%m-%y", "%d/%m/%y", "%d.%m.%y", "%d-%m-%Y",
    "%d/%m/%Y", "%d.%m.%Y", "%m/%d/%Y", "%m-%d-%Y", "%d %b %Y", "%d %B %Y", "%d-%b-%Y",
    "%d-%B-%Y", "%b %d %Y", "%B %d %Y", "%b %d, %Y", "%B %d, %Y",
];

const DATETIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Malformed validity rule parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidityError {
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("unknown data type '{0}' (expected numeric, integer, float, string or date)")]
    UnknownDataType(String),
    #[error("inverted range: min {min} is greater than max {max}")]
    InvertedRange { min: String, max: String },
    #[error("missing required parameter '{0}'")]
    MissingParameter(&'static str),
    #[error("invalid date format '{0}'")]
    InvalidDateFormat(String),
}

/// Expected data type of [`ValidityCheck::DataType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    /// Optional sign, digits, optional fraction
    Numeric,
    /// Optional sign and digits
    Integer,
    /// Optional sign, digits, a dot and more digits
    Float,
    /// Anything
    Text,
    /// Any recognizable date
    Date,
}

impl DataKind {
    /// Parses a data type name.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "numeric" => Some(Self::Numeric),
            "integer" => Some(Self::Integer),
            "float" => Some(Self::Float),
            "string" => Some(Self::Text),
            "date" => Some(Self::Date),
            _ => None,
        }
    }

    /// Lowercase type name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Text => "string",
            Self::Date => "date",
        }
    }
}

/// A compiled validity rule.
#[derive(Debug, Clone)]
pub enum ValidityCheck {
    /// Value shape of a data type
    DataType {
        /// Expected kind
        kind: DataKind,
        /// Compiled shape for the numeric kinds
        shape: Option<Regex>,
    },
    /// Whole-value match, optionally on the uppercased value
    FullMatch {
        /// Anchored pattern
        regex: Regex,
        /// Uppercase before matching
        uppercase: bool,
        /// Expected value text
        expected: String,
    },
    /// Match anchored at the start of the value only
    PrefixMatch {
        /// Start-anchored pattern
        regex: Regex,
        /// Expected value text
        expected: String,
    },
    /// Date parse with an explicit format, or auto-detection
    Date {
        /// chrono format, `None` for auto-detection
        format: Option<String>,
    },
    /// Inclusive numeric bounds
    NumericRange {
        /// Lower bound
        min: f64,
        /// Upper bound
        max: f64,
    },
    /// Membership in a list
    AllowedValues {
        /// Accepted values, lowercased unless case-sensitive
        values: HashSet<String>,
        /// Compare as-is
        case_sensitive: bool,
        /// First few values, for the expected text
        preview: String,
    },
    /// Maximum length in characters
    MaxLength(usize),
}

fn compile(pattern: &str, anchored_end: bool) -> Result<Regex, ValidityError> {
    let wrapped = if anchored_end {
        format!("^(?:{})$", pattern)
    } else {
        format!("^(?:{})", pattern)
    };
    Regex::new(&wrapped).map_err(|e| ValidityError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Returns true if chrono can use `format` without errors.
pub(crate) fn is_valid_date_format(format: &str) -> bool {
    !format.trim().is_empty() && !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

/// Parses a date or date-time in a day-first, lenient way.
pub(crate) fn parse_date_auto(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_local());
    }
    DATETIME_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(value, layout).ok())
        .or_else(|| {
            DATE_LAYOUTS
                .iter()
                .find_map(|layout| NaiveDate::parse_from_str(value, layout).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

fn parses_with_format(value: &str, format: &str) -> bool {
    NaiveDateTime::parse_from_str(value, format).is_ok()
        || NaiveDate::parse_from_str(value, format).is_ok()
}

impl ValidityCheck {
    /// Compiles a rule kind.
    ///
    /// Returns `Ok(None)` if the kind is not a validity rule.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidityError`] if the rule's parameters cannot be used.
    pub fn from_kind(kind: &RuleKind, config: &EngineConfig) -> Result<Option<Self>, ValidityError> {
        let check = match kind {
            RuleKind::DataType(params) => {
                let name = params.data_type.as_deref().unwrap_or("string");
                let kind = DataKind::parse(name)
                    .ok_or_else(|| ValidityError::UnknownDataType(name.to_string()))?;
                let shape = match kind {
                    DataKind::Numeric => Some(compile(NUMERIC_PATTERN, true)?),
                    DataKind::Integer => Some(compile(INTEGER_PATTERN, true)?),
                    DataKind::Float => Some(compile(FLOAT_PATTERN, true)?),
                    DataKind::Text | DataKind::Date => None,
                };
                Self::DataType { kind, shape }
            }
            RuleKind::EmailFormat => Self::FullMatch {
                regex: compile(EMAIL_PATTERN, true)?,
                uppercase: false,
                expected: "Valid email (user@domain.tld)".to_string(),
            },
            RuleKind::PhoneFormat => Self::FullMatch {
                regex: compile(PHONE_PATTERN, true)?,
                uppercase: false,
                expected: "Valid phone (7–15 digits)".to_string(),
            },
            RuleKind::IdFormat(params) => {
                let pattern = params.pattern.as_deref().unwrap_or(PAN_PATTERN);
                let expected = if pattern == PAN_PATTERN {
                    "PAN: AAAAA9999A".to_string()
                } else {
                    format!("Matches: {}", truncate_chars(pattern, 50))
                };
                Self::FullMatch {
                    regex: compile(pattern, true)?,
                    uppercase: true,
                    expected,
                }
            }
            RuleKind::DateFormat(params) => match params.format.as_deref() {
                Some(format) if !is_valid_date_format(format) => {
                    return Err(ValidityError::InvalidDateFormat(format.to_string()));
                }
                format => Self::Date {
                    format: format.map(str::to_string),
                },
            },
            RuleKind::NumericRange(params) => {
                let min = params.min.unwrap_or(config.default_range_min);
                let max = params.max.unwrap_or(config.default_range_max);
                if min > max {
                    return Err(ValidityError::InvertedRange {
                        min: format!("{:?}", min),
                        max: format!("{:?}", max),
                    });
                }
                Self::NumericRange { min, max }
            }
            RuleKind::AllowedValues(params) => {
                let listed: Vec<&str> = params
                    .values
                    .iter()
                    .map(|v| v.trim())
                    .filter(|v| !v.is_empty())
                    .collect();
                if listed.is_empty() {
                    return Err(ValidityError::MissingParameter("values"));
                }
                let mut preview = listed
                    .iter()
                    .take(5)
                    .copied()
                    .collect::<Vec<_>>()
                    .join(", ");
                if listed.len() > 5 {
                    preview.push('…');
                }
                let values = listed
                    .iter()
                    .map(|v| {
                        if params.case_sensitive {
                            (*v).to_string()
                        } else {
                            v.to_lowercase()
                        }
                    })
                    .collect();
                Self::AllowedValues {
                    values,
                    case_sensitive: params.case_sensitive,
                    preview,
                }
            }
            RuleKind::CustomRegex(params) => {
                if params.pattern.is_empty() {
                    return Err(ValidityError::MissingParameter("pattern"));
                }
                Self::FullMatch {
                    regex: compile(&params.pattern, true)?,
                    uppercase: false,
                    expected: format!("Matches: {}", truncate_chars(&params.pattern, 50)),
                }
            }
            RuleKind::LengthCheck(params) => {
                Self::MaxLength(params.max_length.unwrap_or(DEFAULT_MAX_LENGTH))
            }
            RuleKind::FormatCheck(params) => {
                let pattern = params.pattern.as_deref().unwrap_or(DEFAULT_FORMAT_PATTERN);
                Self::PrefixMatch {
                    regex: compile(pattern, false)?,
                    expected: format!("Expected format: {}", truncate_chars(pattern, 50)),
                }
            }
            RuleKind::SpecialCharsNotAllowed(params) => {
                let pattern = params
                    .allowed_pattern
                    .as_deref()
                    .unwrap_or(DEFAULT_ALLOWED_CHARS_PATTERN);
                let expected = if pattern == DEFAULT_ALLOWED_CHARS_PATTERN {
                    "Alphanumeric + spaces only".to_string()
                } else {
                    format!("Allowed characters: {}", truncate_chars(pattern, 50))
                };
                Self::PrefixMatch {
                    regex: compile(pattern, false)?,
                    expected,
                }
            }
            _ => return Ok(None),
        };
        Ok(Some(check))
    }

    /// Returns true if the raw cell satisfies the check. Absent cells pass.
    pub fn passes(&self, raw: &str) -> bool {
        let Some(value) = classify_cell(raw).as_present() else {
            return true;
        };

        match self {
            Self::DataType { kind, shape } => match (kind, shape) {
                (DataKind::Text, _) => true,
                (DataKind::Date, _) => parse_date_auto(value).is_some(),
                (_, Some(shape)) => shape.is_match(value),
                (_, None) => true,
            },
            Self::FullMatch {
                regex, uppercase, ..
            } => {
                if *uppercase {
                    regex.is_match(&value.to_uppercase())
                } else {
                    regex.is_match(value)
                }
            }
            Self::PrefixMatch { regex, .. } => regex.is_match(value),
            Self::Date { format } => match format {
                Some(format) => parses_with_format(value, format),
                None => parse_date_auto(value).is_some(),
            },
            Self::NumericRange { min, max } => value
                .parse::<f64>()
                .is_ok_and(|number| number >= *min && number <= *max),
            Self::AllowedValues {
                values,
                case_sensitive,
                ..
            } => {
                if *case_sensitive {
                    values.contains(value)
                } else {
                    values.contains(&value.to_lowercase())
                }
            }
            Self::MaxLength(max) => value.chars().count() <= *max,
        }
    }

    /// Expected value written to issue records.
    pub fn expected(&self) -> String {
        match self {
            Self::DataType { kind, .. } => format!("Expected type: {}", kind.name()),
            Self::FullMatch { expected, .. } | Self::PrefixMatch { expected, .. } => {
                expected.clone()
            }
            Self::Date { format } => match format {
                Some(format) => format!("Valid date ({})", format),
                None => "Valid date (any parseable)".to_string(),
            },
            Self::NumericRange { min, max } => format!("Between {:?} and {:?}", min, max),
            Self::AllowedValues { preview, .. } => format!("One of: {}", preview),
            Self::MaxLength(max) => format!("Length ≤ {}", max),
        }
    }
}
