//! Configuration management for Ratekeeper.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::{RatekeeperError, Result};

/// Configuration for a single limiter instance.
///
/// All fields are read-only after construction. The window-based policies
/// (fixed window, sliding window log) read `limit` and `window_ms`; the
/// token bucket reads `capacity`, `refill_amount`, and `refill_duration_ms`.
/// Fields irrelevant to the chosen algorithm are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Maximum admissions per window (fixed/sliding window policies)
    #[serde(default = "default_limit")]
    pub limit: u64,

    /// Window duration in milliseconds (fixed/sliding window policies)
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Maximum tokens the bucket can hold (token bucket policy)
    #[serde(default = "default_capacity")]
    pub capacity: u64,

    /// Tokens added per refill step (token bucket policy)
    #[serde(default = "default_refill_amount")]
    pub refill_amount: u64,

    /// Refill step duration in milliseconds (token bucket policy)
    #[serde(default = "default_refill_duration_ms")]
    pub refill_duration_ms: u64,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            window_ms: default_window_ms(),
            capacity: default_capacity(),
            refill_amount: default_refill_amount(),
            refill_duration_ms: default_refill_duration_ms(),
        }
    }
}

fn default_limit() -> u64 {
    100
}

fn default_window_ms() -> u64 {
    1000
}

fn default_capacity() -> u64 {
    100
}

fn default_refill_amount() -> u64 {
    1
}

fn default_refill_duration_ms() -> u64 {
    1000
}

impl LimiterConfig {
    /// Create a configuration for a window-based policy.
    pub fn windowed(limit: u64, window: Duration) -> Self {
        Self {
            limit,
            window_ms: window.as_millis() as u64,
            ..Self::default()
        }
    }

    /// Create a configuration for the token bucket policy.
    pub fn bucket(capacity: u64, refill_amount: u64, refill_duration: Duration) -> Self {
        Self {
            capacity,
            refill_amount,
            refill_duration_ms: refill_duration.as_millis() as u64,
            ..Self::default()
        }
    }

    /// The window duration for the fixed and sliding window policies.
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// The refill step duration for the token bucket policy.
    pub fn refill_duration(&self) -> Duration {
        Duration::from_millis(self.refill_duration_ms)
    }

    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading limiter configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| RatekeeperError::Config(format!("Failed to parse limiter config: {}", e)))
    }

    /// Validate the fields read by the window-based policies.
    pub(crate) fn validate_windowed(&self) -> Result<()> {
        if self.limit == 0 {
            return Err(RatekeeperError::Config(
                "limit must be positive".to_string(),
            ));
        }
        if self.window_ms == 0 {
            return Err(RatekeeperError::Config(
                "window must be a positive duration".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate the fields read by the token bucket policy.
    pub(crate) fn validate_bucket(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(RatekeeperError::Config(
                "capacity must be positive".to_string(),
            ));
        }
        if self.refill_amount == 0 {
            return Err(RatekeeperError::Config(
                "refill_amount must be positive".to_string(),
            ));
        }
        if self.refill_duration_ms == 0 {
            return Err(RatekeeperError::Config(
                "refill_duration must be a positive duration".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_windowed_config() {
        let yaml = r#"
limit: 5
window_ms: 500
"#;
        let config = LimiterConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.limit, 5);
        assert_eq!(config.window(), Duration::from_millis(500));
        // Untouched fields fall back to defaults
        assert_eq!(config.refill_amount, 1);
    }

    #[test]
    fn test_parse_bucket_config() {
        let yaml = r#"
capacity: 10
refill_amount: 2
refill_duration_ms: 250
"#;
        let config = LimiterConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.capacity, 10);
        assert_eq!(config.refill_amount, 2);
        assert_eq!(config.refill_duration(), Duration::from_millis(250));
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let result = LimiterConfig::from_yaml("limit: [not a number]");
        assert!(matches!(result, Err(RatekeeperError::Config(_))));
    }

    #[test]
    fn test_validate_windowed_rejects_zero_limit() {
        let config = LimiterConfig::windowed(0, Duration::from_secs(1));
        assert!(config.validate_windowed().is_err());
    }

    #[test]
    fn test_validate_windowed_rejects_zero_window() {
        let config = LimiterConfig::windowed(10, Duration::ZERO);
        assert!(config.validate_windowed().is_err());
    }

    #[test]
    fn test_validate_bucket_rejects_zero_fields() {
        assert!(LimiterConfig::bucket(0, 1, Duration::from_secs(1))
            .validate_bucket()
            .is_err());
        assert!(LimiterConfig::bucket(10, 0, Duration::from_secs(1))
            .validate_bucket()
            .is_err());
        assert!(LimiterConfig::bucket(10, 1, Duration::ZERO)
            .validate_bucket()
            .is_err());
    }

    #[test]
    fn test_helper_constructors() {
        let config = LimiterConfig::windowed(2, Duration::from_millis(100));
        assert!(config.validate_windowed().is_ok());

        let config = LimiterConfig::bucket(5, 1, Duration::from_secs(1));
        assert!(config.validate_bucket().is_ok());
    }
}
