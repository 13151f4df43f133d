//! Provisioner configuration.
//!
//! Loaded from a JSON file; every field has a default so an empty object is
//! a valid configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::endpoint::AVAILABLE_STATUS;
use crate::error::{ProvisionError, Result};
use crate::retry::RetryPolicy;

/// Retry settings for store calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrySettings {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay after the first failure, in milliseconds.
    pub base_delay_ms: u64,
    /// Cap for a single delay, in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 1_000,
            max_delay_ms: 60_000,
        }
    }
}

/// Top-level provisioner configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProvisionerConfig {
    /// Prefix of every parameter name, such as `/vpn`.
    pub namespace: String,
    /// Retry behavior of gateway calls.
    pub retry: RetrySettings,
    /// Status code that marks an endpoint usable.
    pub available_status: String,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            namespace: "/vpn".to_string(),
            retry: RetrySettings::default(),
            available_status: AVAILABLE_STATUS.to_string(),
        }
    }
}

impl ProvisionerConfig {
    /// Loads configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProvisionError::Config(format!(
                "failed to read config file '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_json(&content)
    }

    /// Parses configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid or validation fails.
    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| ProvisionError::Config(format!("invalid JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the configuration as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ProvisionError::Config(format!("failed to serialize config: {e}")))?;
        std::fs::write(path, json).map_err(|e| {
            ProvisionError::Config(format!(
                "failed to write config file '{}': {e}",
                path.display()
            ))
        })
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any value is unusable.
    pub fn validate(&self) -> Result<()> {
        if !self.namespace.starts_with('/') || self.namespace.trim_end_matches('/').is_empty() {
            return Err(ProvisionError::Config(format!(
                "namespace must be a non-empty path starting with '/', got '{}'",
                self.namespace
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(ProvisionError::Config(
                "retry.maxAttempts must be at least 1".to_string(),
            ));
        }
        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            return Err(ProvisionError::Config(
                "retry.maxDelayMs must not be below retry.baseDelayMs".to_string(),
            ));
        }
        if self.available_status.is_empty() {
            return Err(ProvisionError::Config(
                "availableStatus cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Builds the retry policy described by [`Self::retry`].
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            backoff_multiplier: 2.0,
            max_attempts: self.retry.max_attempts,
        }
    }
}
