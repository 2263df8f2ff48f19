//! Customer display arbiter for point-of-sale terminals.
//!
//! A customer display is a small character device (typically 2 x 20) on a
//! serial link. It is slow, it sometimes drops or hangs on a write, and it has
//! no notion of concurrent clients. This crate lets any number of async tasks
//! drive one display safely by routing every access through a single worker.
//!
//! # Architecture
//!
//! - **Driver** ([`DisplayDriver`]): opens the port and pushes raw frames.
//!   Implementations: [`mock::MockDisplay`] and, with the `hardware-serial`
//!   feature, `serial::SerialDisplay`.
//! - **Formatter** ([`formatter`]): turns arbitrary text into printable
//!   ASCII lines of the display width.
//! - **Queue** ([`queue`]): priority-ordered, FIFO within a priority.
//! - **Arbiter** ([`arbiter`]): the worker that admits, deduplicates,
//!   spaces, times out and retries operations, and the [`DisplayHandle`]
//!   callers use to reach it.
//!
//! # Guarantees
//!
//! - At most one device write is in progress at any time.
//! - Higher priority operations run first; equal priorities run in
//!   submission order.
//! - A write identical to one that completed moments ago is skipped.
//! - Transient failures are retried with linear backoff before the caller
//!   sees an error.
//! - Device accesses are spaced by at least the configured minimum gap.
//! - Nothing submitted before a disconnect or reconnect executes after it.
//!
//! # Example
//!
//! ```
//! use poskit_display::{ArbiterConfig, DisplayArbiter, Outcome};
//! use poskit_display::mock::MockDisplay;
//! use poskit_core::DisplayConfig;
//!
//! #[tokio::main]
//! async fn main() -> poskit_display::Result<()> {
//!     let (display, _mock) = MockDisplay::new();
//!     let handle = DisplayArbiter::new(display, ArbiterConfig::default()).start()?;
//!     handle.connect("/dev/ttyUSB0", DisplayConfig::default()).await?;
//!
//!     let first = handle.write_lines("Coffee", "2.50EUR", 0).await?;
//!     assert!(matches!(first, Outcome::Completed { .. }));
//!
//!     // Same content right away is a duplicate
//!     let second = handle.write_lines("Coffee", "2.50EUR", 0).await?;
//!     assert!(second.is_skipped());
//!
//!     handle.shutdown().await
//! }
//! ```

pub mod arbiter;
pub mod commands;
pub mod config;
pub mod devices;
pub mod error;
pub mod formatter;
pub mod mock;
pub mod operation;
pub mod queue;
#[cfg(feature = "hardware-serial")]
pub mod serial;
pub mod session;
pub mod status;
pub mod traits;
mod worker;

// Re-export commonly used types for convenience
pub use arbiter::{DisplayArbiter, DisplayHandle};
pub use config::{ArbiterConfig, DisplayMessages};
pub use devices::AnyDisplayDriver;
pub use error::{DisplayError, Result};
pub use operation::{OperationHandle, OperationRequest, Outcome, Payload, SkipReason, TextLine};
pub use status::{DisplayStatus, PendingItem, QueueStats};
pub use traits::DisplayDriver;
