//! Enum wrapper for display driver dispatch.
//!
//! Native `async fn` in traits is not object-safe, so `Box<dyn DisplayDriver>`
//! is not an option. [`AnyDisplayDriver`] provides concrete dispatch instead,
//! and because it is a concrete type the futures it returns are `Send`,
//! which the arbiter needs to drive them from a spawned task.
//!
//! # Examples
//!
//! ```
//! use poskit_display::devices::AnyDisplayDriver;
//! use poskit_display::mock::MockDisplay;
//!
//! let (display, _handle) = MockDisplay::new();
//! let driver = AnyDisplayDriver::from(display);
//! ```

use poskit_core::DisplayConfig;

use crate::error::Result;
use crate::mock::MockDisplay;
#[cfg(feature = "hardware-serial")]
use crate::serial::SerialDisplay;
use crate::traits::DisplayDriver;

/// Enum wrapper for display driver dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyDisplayDriver {
    /// Mock display for development and testing.
    Mock(MockDisplay),

    /// Display on a serial port.
    #[cfg(feature = "hardware-serial")]
    Serial(SerialDisplay),
}

impl AnyDisplayDriver {
    /// Short driver name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Mock(_) => "mock",
            #[cfg(feature = "hardware-serial")]
            Self::Serial(_) => "serial",
        }
    }
}

impl From<MockDisplay> for AnyDisplayDriver {
    fn from(display: MockDisplay) -> Self {
        Self::Mock(display)
    }
}

#[cfg(feature = "hardware-serial")]
impl From<SerialDisplay> for AnyDisplayDriver {
    fn from(display: SerialDisplay) -> Self {
        Self::Serial(display)
    }
}

impl DisplayDriver for AnyDisplayDriver {
    async fn open(&mut self, port: &str, config: &DisplayConfig) -> Result<()> {
        match self {
            Self::Mock(device) => device.open(port, config).await,
            #[cfg(feature = "hardware-serial")]
            Self::Serial(device) => device.open(port, config).await,
        }
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        match self {
            Self::Mock(device) => device.write(bytes).await,
            #[cfg(feature = "hardware-serial")]
            Self::Serial(device) => device.write(bytes).await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            Self::Mock(device) => device.close().await,
            #[cfg(feature = "hardware-serial")]
            Self::Serial(device) => device.close().await,
        }
    }

    fn is_open(&self) -> bool {
        match self {
            Self::Mock(device) => device.is_open(),
            #[cfg(feature = "hardware-serial")]
            Self::Serial(device) => device.is_open(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_any_display_driver_mock() {
        let (display, handle) = MockDisplay::new();
        let mut driver = AnyDisplayDriver::from(display);
        assert_eq!(driver.kind(), "mock");

        driver.open("COM1", &DisplayConfig::default()).await.unwrap();
        assert!(driver.is_open());

        driver.write(&[0x0C]).await.unwrap();
        assert_eq!(handle.successful_writes().len(), 1);

        driver.close().await.unwrap();
        assert!(!handle.is_open());
    }
}
