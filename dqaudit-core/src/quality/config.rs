//! Assessment engine configuration.
//!
//! Global knobs shared by every rule of a run. Per-rule parameters live on
//! the rule itself and fall back to these values when omitted.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default pair cap per fuzzy block.
pub const DEFAULT_MAX_PAIRS_PER_BLOCK: usize = 20_000;
/// Default minimum length for the minimum-length rule.
pub const DEFAULT_MIN_LENGTH: usize = 3;
/// Default lower bound of the numeric-range rule.
pub const DEFAULT_RANGE_MIN: f64 = 0.0;
/// Default upper bound of the numeric-range rule.
pub const DEFAULT_RANGE_MAX: f64 = 100.0;
/// Default target format of the date normalization transform.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";
/// Default replacement for absent cells.
pub const DEFAULT_NULL_REPLACEMENT: &str = "N/A";
/// Default fuzzy acceptance threshold, in percent.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 80.0;

/// Similarity scorer used by fuzzy matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScorerBackend {
    /// Weighted four-scorer ensemble
    #[default]
    Ensemble,
    /// Ratcliff/Obershelp matching ratio, pair by pair
    Scalar,
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fuzzy blocks with more candidate pairs than this are skipped
    pub max_pairs_per_block: usize,
    /// Drop rows with absent fuzzy columns before matching
    pub fuzzy_ignore_nulls: bool,
    /// Minimum length used when a rule does not set one
    pub default_min_length: usize,
    /// Numeric range lower bound used when a rule does not set one
    pub default_range_min: f64,
    /// Numeric range upper bound used when a rule does not set one
    pub default_range_max: f64,
    /// chrono format used by date normalization when a rule does not set one
    pub default_date_format: String,
    /// Replacement used by null replacement when a rule does not set one
    pub default_null_replacement: String,
    /// Fuzzy threshold (0-100) used when a rule does not set one
    pub default_fuzzy_threshold: f64,
    /// Similarity scorer
    pub scorer_backend: ScorerBackend,
}

/// Validation errors for engine configuration.
#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("max_pairs_per_block must be at least 1, got {0}")]
    InvalidPairCap(usize),
    #[error("default_fuzzy_threshold must be between 0 and 100, got {0}")]
    InvalidThreshold(f64),
    #[error("default numeric range is inverted: {min} > {max}")]
    InvertedRange { min: f64, max: f64 },
    #[error("default_date_format must not be empty")]
    EmptyDateFormat,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_pairs_per_block: DEFAULT_MAX_PAIRS_PER_BLOCK,
            fuzzy_ignore_nulls: true,
            default_min_length: DEFAULT_MIN_LENGTH,
            default_range_min: DEFAULT_RANGE_MIN,
            default_range_max: DEFAULT_RANGE_MAX,
            default_date_format: DEFAULT_DATE_FORMAT.to_string(),
            default_null_replacement: DEFAULT_NULL_REPLACEMENT.to_string(),
            default_fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            scorer_backend: ScorerBackend::Ensemble,
        }
    }
}

impl EngineConfig {
    /// Creates a new engine config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the fuzzy block pair cap.
    pub fn with_max_pairs_per_block(mut self, cap: usize) -> Self {
        if cap == 0 {
            tracing::warn!("max_pairs_per_block 0 raised to 1");
        }
        self.max_pairs_per_block = cap.max(1);
        self
    }

    /// Builder method to enable/disable dropping null rows before fuzzy matching.
    pub fn with_fuzzy_ignore_nulls(mut self, ignore: bool) -> Self {
        self.fuzzy_ignore_nulls = ignore;
        self
    }

    /// Builder method to set the default minimum length.
    pub fn with_default_min_length(mut self, min_length: usize) -> Self {
        self.default_min_length = min_length;
        self
    }

    /// Builder method to set the default numeric range.
    ///
    /// Inverted bounds are swapped.
    pub fn with_default_range(mut self, min: f64, max: f64) -> Self {
        if min > max {
            tracing::warn!("default range [{}, {}] inverted, swapping bounds", min, max);
            self.default_range_min = max;
            self.default_range_max = min;
        } else {
            self.default_range_min = min;
            self.default_range_max = max;
        }
        self
    }

    /// Builder method to set the default date target format.
    pub fn with_default_date_format(mut self, format: impl Into<String>) -> Self {
        self.default_date_format = format.into();
        self
    }

    /// Builder method to set the default null replacement.
    pub fn with_default_null_replacement(mut self, value: impl Into<String>) -> Self {
        self.default_null_replacement = value.into();
        self
    }

    /// Builder method to set the default fuzzy threshold.
    pub fn with_default_fuzzy_threshold(mut self, threshold: f64) -> Self {
        if !(0.0..=100.0).contains(&threshold) {
            tracing::warn!(
                "default_fuzzy_threshold {} clamped to valid range [0, 100]",
                threshold
            );
        }
        self.default_fuzzy_threshold = threshold.clamp(0.0, 100.0);
        self
    }

    /// Builder method to set the scorer backend.
    pub fn with_scorer_backend(mut self, backend: ScorerBackend) -> Self {
        self.scorer_backend = backend;
        self
    }

    /// Validates the configuration.
    ///
    /// Deserialized configs bypass the builders, so this is the gate the
    /// analyzer relies on.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.max_pairs_per_block == 0 {
            return Err(ConfigValidationError::InvalidPairCap(
                self.max_pairs_per_block,
            ));
        }
        if !(0.0..=100.0).contains(&self.default_fuzzy_threshold) {
            return Err(ConfigValidationError::InvalidThreshold(
                self.default_fuzzy_threshold,
            ));
        }
        if self.default_range_min > self.default_range_max {
            return Err(ConfigValidationError::InvertedRange {
                min: self.default_range_min,
                max: self.default_range_max,
            });
        }
        if self.default_date_format.trim().is_empty() {
            return Err(ConfigValidationError::EmptyDateFormat);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_default() {
        let config = EngineConfig::default();
        assert_eq!(config.max_pairs_per_block, 20_000);
        assert!(config.fuzzy_ignore_nulls);
        assert_eq!(config.default_min_length, 3);
        assert_eq!(config.default_range_min, 0.0);
        assert_eq!(config.default_range_max, 100.0);
        assert_eq!(config.default_date_format, "%Y-%m-%d");
        assert_eq!(config.default_null_replacement, "N/A");
        assert_eq!(config.default_fuzzy_threshold, 80.0);
        assert_eq!(config.scorer_backend, ScorerBackend::Ensemble);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_engine_config_builder() {
        let config = EngineConfig::new()
            .with_max_pairs_per_block(1_000)
            .with_fuzzy_ignore_nulls(false)
            .with_default_min_length(5)
            .with_default_range(10.0, 20.0)
            .with_default_date_format("%d/%m/%Y")
            .with_default_null_replacement("Unknown")
            .with_default_fuzzy_threshold(70.0)
            .with_scorer_backend(ScorerBackend::Scalar);

        assert_eq!(config.max_pairs_per_block, 1_000);
        assert!(!config.fuzzy_ignore_nulls);
        assert_eq!(config.default_min_length, 5);
        assert_eq!(config.default_range_min, 10.0);
        assert_eq!(config.default_range_max, 20.0);
        assert_eq!(config.default_date_format, "%d/%m/%Y");
        assert_eq!(config.default_null_replacement, "Unknown");
        assert_eq!(config.default_fuzzy_threshold, 70.0);
        assert_eq!(config.scorer_backend, ScorerBackend::Scalar);
    }

    #[test]
    fn test_builder_clamps_and_swaps() {
        let config = EngineConfig::new()
            .with_default_fuzzy_threshold(150.0)
            .with_max_pairs_per_block(0)
            .with_default_range(50.0, 5.0);

        assert_eq!(config.default_fuzzy_threshold, 100.0);
        assert_eq!(config.max_pairs_per_block, 1);
        assert_eq!(config.default_range_min, 5.0);
        assert_eq!(config.default_range_max, 50.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_catches_direct_assignment() {
        let config = EngineConfig {
            default_fuzzy_threshold: -1.0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::InvalidThreshold(_))
        ));

        let config = EngineConfig {
            default_range_min: 10.0,
            default_range_max: 1.0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::InvertedRange { .. })
        ));

        let config = EngineConfig {
            max_pairs_per_block: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"max_pairs_per_block": 500, "scorer_backend": "scalar"}"#)
                .unwrap();
        assert_eq!(config.max_pairs_per_block, 500);
        assert_eq!(config.scorer_backend, ScorerBackend::Scalar);
        assert_eq!(config.default_fuzzy_threshold, 80.0);
    }
}
