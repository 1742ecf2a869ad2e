//! Marshaller configuration.
//!
//! # Example
//!
//! ```
//! use procwire_marshal::config::{MarshalConfig, MismatchPolicy};
//!
//! let config = MarshalConfig::from_json(r#"{ "type_mismatch": "strict" }"#).unwrap();
//! assert_eq!(config.type_mismatch, MismatchPolicy::Strict);
//! assert_eq!(config.max_arguments, 10);
//! ```

use serde::Deserialize;

use crate::envelope::MAX_ARGUMENTS;
use crate::error::{MarshalError, Result};

/// What to do when a response's wire type differs from its destination type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchPolicy {
    /// Log a warning and load with the wire type's operations, provided both
    /// types share a storage type. Otherwise fail with `TypeMismatch`.
    #[default]
    BestEffort,
    /// Fail with `TypeMismatch`, leaving the destination untouched.
    Strict,
}

/// Configuration for a [`Marshaller`](crate::Marshaller).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarshalConfig {
    /// Maximum arguments per envelope (1..=10).
    pub max_arguments: usize,
    /// Response type mismatch handling.
    pub type_mismatch: MismatchPolicy,
}

impl Default for MarshalConfig {
    fn default() -> Self {
        Self {
            max_arguments: MAX_ARGUMENTS,
            type_mismatch: MismatchPolicy::BestEffort,
        }
    }
}

impl MarshalConfig {
    /// Set the argument ceiling.
    pub fn max_arguments(mut self, max: usize) -> Self {
        self.max_arguments = max;
        self
    }

    /// Set the mismatch policy.
    pub fn type_mismatch(mut self, policy: MismatchPolicy) -> Self {
        self.type_mismatch = policy;
        self
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that values are within protocol limits.
    pub fn validate(&self) -> Result<()> {
        if self.max_arguments == 0 || self.max_arguments > MAX_ARGUMENTS {
            return Err(MarshalError::Config(format!(
                "max_arguments must be between 1 and {}, got {}",
                MAX_ARGUMENTS, self.max_arguments
            )));
        }
        Ok(())
    }
}
