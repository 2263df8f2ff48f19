//! Error types for display operations.
//!
//! Failures fall into two groups. Transient failures (`Timeout`, `Device`,
//! `Io`) come from the physical device and are retried by the operation queue
//! before they reach the caller. Structural failures (`NotConnected`,
//! `Superseded`, `Closed`, configuration errors) mean the caller's view of the
//! connection is stale and are never retried.

/// Result type alias for display operations.
pub type Result<T> = std::result::Result<T, DisplayError>;

/// Errors that can occur while driving a customer display.
#[derive(Debug, thiserror::Error)]
pub enum DisplayError {
    /// No device is connected.
    #[error("Display not connected")]
    NotConnected,

    /// A device access exceeded its time bound.
    #[error("Operation timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// The driver reported a write failure.
    #[error("Device error: {message}")]
    Device { message: String },

    /// The connection was closed or replaced while the operation was pending.
    #[error("Operation superseded by disconnect or reconnect")]
    Superseded,

    /// The physical connection could not be opened.
    #[error("Failed to open {port}: {message}")]
    OpenFailed { port: String, message: String },

    /// Arbiter configuration is unusable.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// The arbiter worker has stopped.
    #[error("Display arbiter closed")]
    Closed,

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid display geometry or content.
    #[error(transparent)]
    Core(#[from] poskit_core::Error),
}

impl DisplayError {
    /// Create a new timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create a new device error.
    pub fn device(message: impl Into<String>) -> Self {
        Self::Device {
            message: message.into(),
        }
    }

    /// Create a new open failure.
    pub fn open_failed(port: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OpenFailed {
            port: port.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// True for failures worth another attempt against the same connection.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Device { .. } | Self::Io(_))
    }
}
