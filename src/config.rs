//! Engine configuration.
//!
//! Every field has a default drawn from [`crate::constants`], so an empty
//! JSON object is a valid config and a file only needs to name what it
//! overrides.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{MAX_ANGULAR_VELOCITY, MAX_LINEAR_VELOCITY, PROPAGATION_BUDGET};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Queued cell writes drained per flush.
    pub propagation_budget: usize,
    /// Pilot seat linear speed limit in world units per second.
    pub max_linear_velocity: f32,
    /// Pilot seat angular speed limit in radians per second.
    pub max_angular_velocity: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            propagation_budget: PROPAGATION_BUDGET,
            max_linear_velocity: MAX_LINEAR_VELOCITY,
            max_angular_velocity: MAX_ANGULAR_VELOCITY,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl EngineConfig {
    /// Parse and validate a JSON config document.
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] for malformed JSON or unknown keys and
    /// [`ConfigError::Invalid`] when a value is out of range.
    ///
    /// # Examples
    /// ```
    /// use cogwork::config::EngineConfig;
    /// let config = EngineConfig::from_json_str(r#"{"propagation_budget": 64}"#)
    ///     .expect("valid config");
    /// assert_eq!(config.propagation_budget, 64);
    /// assert!(EngineConfig::from_json_str(r#"{"propagation_budget": 0}"#).is_err());
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] when the file cannot be read, otherwise as
    /// [`EngineConfig::from_json_str`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Check that every limit is usable.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.propagation_budget == 0 {
            return Err(ConfigError::Invalid(
                "propagation_budget must be at least 1".to_owned(),
            ));
        }
        for (name, limit) in [
            ("max_linear_velocity", self.max_linear_velocity),
            ("max_angular_velocity", self.max_angular_velocity),
        ] {
            if !limit.is_finite() || limit < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be finite and non-negative, got {limit}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn empty_object_yields_defaults() {
        let config = EngineConfig::from_json_str("{}").expect("defaults");
        assert_eq!(config, EngineConfig::default());
    }

    #[rstest]
    fn unknown_keys_are_rejected() {
        let err = EngineConfig::from_json_str(r#"{"budget": 5}"#).expect_err("unknown key");
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[rstest]
    #[case(r#"{"max_linear_velocity": -1.0}"#)]
    #[case(r#"{"propagation_budget": 0}"#)]
    fn out_of_range_values_are_invalid(#[case] json: &str) {
        let err = EngineConfig::from_json_str(json).expect_err("invalid");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[rstest]
    fn missing_file_is_an_io_error() {
        let err = EngineConfig::from_path("/nonexistent/cogwork.json").expect_err("missing");
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
