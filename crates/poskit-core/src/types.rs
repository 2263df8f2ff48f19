use crate::{
    Result,
    constants::{DEFAULT_BAUD_RATE, DEFAULT_COLUMNS, DEFAULT_LINES, MAX_COLUMNS, MAX_LINES},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical configuration of a customer display.
///
/// Fixed for the lifetime of a connection; changing it requires a reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Serial baud rate.
    pub baud_rate: u32,

    /// Number of text lines.
    pub lines: usize,

    /// Characters per line.
    pub columns: usize,
}

impl DisplayConfig {
    /// Create a configuration with the given geometry and the default baud rate.
    #[must_use]
    pub fn new(lines: usize, columns: usize) -> Self {
        Self {
            lines,
            columns,
            ..Self::default()
        }
    }

    /// Set the baud rate.
    #[must_use]
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Check that the geometry and baud rate are usable.
    ///
    /// # Errors
    /// Returns `Error::InvalidDisplayConfig` if the baud rate is zero or the
    /// geometry is outside `1..=MAX_LINES` x `1..=MAX_COLUMNS`.
    pub fn validate(&self) -> Result<()> {
        if self.baud_rate == 0 {
            return Err(Error::InvalidDisplayConfig(
                "baud rate must be greater than 0".to_string(),
            ));
        }
        if !(1..=MAX_LINES).contains(&self.lines) {
            return Err(Error::InvalidDisplayConfig(format!(
                "line count must be 1-{MAX_LINES}, got {}",
                self.lines
            )));
        }
        if !(1..=MAX_COLUMNS).contains(&self.columns) {
            return Err(Error::InvalidDisplayConfig(format!(
                "column count must be 1-{MAX_COLUMNS}, got {}",
                self.columns
            )));
        }
        Ok(())
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            lines: DEFAULT_LINES,
            columns: DEFAULT_COLUMNS,
        }
    }
}

/// Text content of the whole display, one entry per line.
///
/// A write operation's fingerprint is the `DisplayLines` it renders, so two
/// writes are duplicates exactly when their lines compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisplayLines(Vec<String>);

impl DisplayLines {
    /// Create display content from individual lines.
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(lines.into_iter().map(Into::into).collect())
    }

    /// Create content for a two-line display.
    pub fn pair(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self(vec![first.into(), second.into()])
    }

    /// Check that the content fits on a display with `lines` lines.
    ///
    /// # Errors
    /// Returns `Error::TooManyLines` when there are more entries than lines.
    pub fn check_fits(&self, lines: usize) -> Result<()> {
        if self.0.len() > lines {
            return Err(Error::TooManyLines {
                given: self.0.len(),
                lines,
            });
        }
        Ok(())
    }

    /// Get a line by index.
    ///
    /// # Errors
    /// Returns `Error::InvalidLineIndex` if `index` is out of range.
    pub fn line(&self, index: usize) -> Result<&str> {
        self.0
            .get(index)
            .map(String::as_str)
            .ok_or(Error::InvalidLineIndex {
                index,
                lines: self.0.len(),
            })
    }

    /// Iterate over the lines.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when there are no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when every line is empty or whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.iter().all(|line| line.trim().is_empty())
    }
}

impl fmt::Display for DisplayLines {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.join(" | "))
    }
}

/// Connection lifecycle of a display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No device attached; submissions fail fast.
    Disconnected,

    /// Physical open in progress.
    Connecting,

    /// Device open and accepting operations.
    Connected,
}

impl ConnectionState {
    /// True only in the `Connected` state.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
        }
    }
}
