//! Arbiter configuration.
//!
//! All timings are plain milliseconds so the structure maps one-to-one onto a
//! JSON configuration file. Missing fields take the defaults from
//! [`poskit_core::constants`].
//!
//! ```
//! use poskit_display::config::ArbiterConfig;
//!
//! let config: ArbiterConfig = serde_json::from_str(r#"{"max_retries": 4}"#).unwrap();
//! assert_eq!(config.max_retries, 4);
//! assert_eq!(config.min_spacing_ms, 200);
//! ```

use std::time::Duration;

use poskit_core::constants::{
    DEFAULT_BACKOFF_STEP_MS, DEFAULT_CLEAR_SKIP_WINDOW_MS, DEFAULT_DEDUP_WINDOW_MS,
    DEFAULT_DUPLICATE_SUBMIT_WINDOW_MS, DEFAULT_MAX_RETRIES, DEFAULT_MIN_SPACING_MS,
    DEFAULT_OPEN_TIMEOUT_MS, DEFAULT_OPERATION_TIMEOUT_MS, DEFAULT_SETTLE_PAUSE_MS,
};
use serde::{Deserialize, Serialize};

use crate::error::{DisplayError, Result};

/// Timing and retry policy of the operation queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbiterConfig {
    /// Minimum gap between the end of one device access and the start of the next.
    pub min_spacing_ms: u64,

    /// Upper bound of a single device access.
    pub operation_timeout_ms: u64,

    /// Re-attempts after the first failed attempt.
    pub max_retries: u32,

    /// Backoff unit; the n-th retry waits `n * backoff_step_ms`.
    pub backoff_step_ms: u64,

    /// Pause after every successful operation.
    pub settle_pause_ms: u64,

    /// Skip a write identical to the last operation completed within this window.
    pub dedup_window_ms: u64,

    /// Skip only when the last write was also submitted within this window.
    pub duplicate_submit_window_ms: u64,

    /// Identical content older than this is rewritten without clearing first.
    pub clear_skip_window_ms: u64,

    /// Upper bound for opening the connection.
    pub open_timeout_ms: u64,

    /// Fixed texts of the convenience operations.
    pub messages: DisplayMessages,
}

impl ArbiterConfig {
    /// Check that the configuration can drive a queue.
    ///
    /// # Errors
    ///
    /// Returns `DisplayError::InvalidConfig` when a time bound is zero.
    pub fn validate(&self) -> Result<()> {
        if self.operation_timeout_ms == 0 {
            return Err(DisplayError::invalid_config(
                "operation_timeout_ms must be greater than 0",
            ));
        }
        if self.open_timeout_ms == 0 {
            return Err(DisplayError::invalid_config(
                "open_timeout_ms must be greater than 0",
            ));
        }
        Ok(())
    }

    pub fn min_spacing(&self) -> Duration {
        Duration::from_millis(self.min_spacing_ms)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    /// Wait before the given retry (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        Duration::from_millis(self.backoff_step_ms.saturating_mul(u64::from(retry)))
    }

    pub fn settle_pause(&self) -> Duration {
        Duration::from_millis(self.settle_pause_ms)
    }

    pub fn dedup_window(&self) -> Duration {
        Duration::from_millis(self.dedup_window_ms)
    }

    pub fn duplicate_submit_window(&self) -> Duration {
        Duration::from_millis(self.duplicate_submit_window_ms)
    }

    pub fn clear_skip_window(&self) -> Duration {
        Duration::from_millis(self.clear_skip_window_ms)
    }

    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            min_spacing_ms: DEFAULT_MIN_SPACING_MS,
            operation_timeout_ms: DEFAULT_OPERATION_TIMEOUT_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_step_ms: DEFAULT_BACKOFF_STEP_MS,
            settle_pause_ms: DEFAULT_SETTLE_PAUSE_MS,
            dedup_window_ms: DEFAULT_DEDUP_WINDOW_MS,
            duplicate_submit_window_ms: DEFAULT_DUPLICATE_SUBMIT_WINDOW_MS,
            clear_skip_window_ms: DEFAULT_CLEAR_SKIP_WINDOW_MS,
            open_timeout_ms: DEFAULT_OPEN_TIMEOUT_MS,
            messages: DisplayMessages::default(),
        }
    }
}

/// Texts used by the named display actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayMessages {
    /// Welcome screen.
    pub welcome: [String; 2],

    /// Thank-you screen.
    pub thank_you: [String; 2],

    /// First line above an error message.
    pub error_title: String,

    /// First line of the total screen.
    pub total_label: String,

    /// Suffix appended to formatted amounts.
    pub currency: String,
}

impl Default for DisplayMessages {
    fn default() -> Self {
        Self {
            welcome: ["WELCOME".to_string(), "".to_string()],
            thank_you: ["THANK YOU".to_string(), "SEE YOU SOON".to_string()],
            error_title: "ERROR".to_string(),
            total_label: "TOTAL".to_string(),
            currency: "EUR".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timings() {
        let config = ArbiterConfig::default();
        assert_eq!(config.min_spacing(), Duration::from_millis(200));
        assert_eq!(config.operation_timeout(), Duration::from_secs(5));
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.settle_pause(), Duration::from_millis(50));
        assert_eq!(config.dedup_window(), Duration::from_millis(500));
        assert_eq!(config.duplicate_submit_window(), Duration::from_secs(1));
        assert_eq!(config.clear_skip_window(), Duration::from_millis(100));
        assert_eq!(config.open_timeout(), Duration::from_secs(3));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_backoff_grows_linearly() {
        let config = ArbiterConfig::default();
        assert_eq!(config.backoff(1), Duration::from_millis(500));
        assert_eq!(config.backoff(2), Duration::from_millis(1000));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let config = ArbiterConfig {
            operation_timeout_ms: 0,
            ..ArbiterConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(DisplayError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_partial_json() {
        let config: ArbiterConfig = serde_json::from_str(
            r#"{"backoff_step_ms": 250, "messages": {"currency": "USD"}}"#,
        )
        .unwrap();
        assert_eq!(config.backoff_step_ms, 250);
        assert_eq!(config.messages.currency, "USD");
        assert_eq!(config.messages.total_label, "TOTAL");
        assert_eq!(config.min_spacing_ms, 200);
    }
}
