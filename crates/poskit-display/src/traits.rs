//! Display driver trait definition.
//!
//! The driver is the only code that touches the physical link. It knows how
//! to open and close the connection and how to push raw bytes; everything
//! about ordering, retries and timing lives in the arbiter.
//!
//! The trait uses native `async fn` methods (Rust 1.90 + Edition 2024 RPITIT).

#![allow(async_fn_in_trait)]

use crate::error::Result;
use poskit_core::DisplayConfig;

/// Customer display driver abstraction.
///
/// Implementations are expected to be unreliable: writes may fail or hang,
/// and the arbiter bounds and retries every call.
///
/// # Object Safety and Dynamic Dispatch
///
/// This trait is NOT object-safe because `async fn` methods return
/// `impl Future`. The arbiter uses the enum wrapper
/// [`AnyDisplayDriver`](crate::devices::AnyDisplayDriver) for dispatch.
///
/// # Examples
///
/// ```no_run
/// use poskit_display::traits::DisplayDriver;
/// use poskit_display::error::Result;
/// use poskit_core::DisplayConfig;
///
/// async fn blank<D: DisplayDriver>(driver: &mut D) -> Result<()> {
///     driver.open("/dev/ttyUSB0", &DisplayConfig::default()).await?;
///     driver.write(&[0x0C]).await?;
///     driver.close().await
/// }
/// ```
pub trait DisplayDriver: Send + Sync {
    /// Open the physical connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the port does not exist, is busy, or rejects the
    /// configuration.
    async fn open(&mut self, port: &str, config: &DisplayConfig) -> Result<()>;

    /// Write a complete frame to the device.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is closed or the write fails.
    async fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Close the physical connection. Closing a closed driver is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if releasing the port fails.
    async fn close(&mut self) -> Result<()>;

    /// True while the connection is open.
    fn is_open(&self) -> bool;
}
