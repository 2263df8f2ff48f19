//! Display arbiter and its handle.
//!
//! [`DisplayArbiter`] spawns the worker that owns one display. Every caller
//! talks to it through a cloneable [`DisplayHandle`]; the handle is the only
//! way to reach the device, so concurrent request handlers never touch the
//! serial link directly.
//!
//! # Examples
//!
//! ```
//! use poskit_display::arbiter::DisplayArbiter;
//! use poskit_display::config::ArbiterConfig;
//! use poskit_display::mock::MockDisplay;
//! use poskit_core::DisplayConfig;
//!
//! #[tokio::main]
//! async fn main() -> poskit_display::Result<()> {
//!     let (display, mock) = MockDisplay::new();
//!     let handle = DisplayArbiter::new(display, ArbiterConfig::default()).start()?;
//!
//!     handle.connect("/dev/ttyUSB0", DisplayConfig::default()).await?;
//!     handle.show_total(1250).await?;
//!
//!     let screen = mock.last_screen().unwrap();
//!     assert_eq!(screen.row(0), "TOTAL");
//!
//!     handle.shutdown().await
//! }
//! ```

use std::sync::Arc;

use poskit_core::constants::{
    PRIORITY_ERROR, PRIORITY_PRICE, PRIORITY_THANK_YOU, PRIORITY_TOTAL, PRIORITY_WELCOME,
};
use poskit_core::{ConnectionState, DisplayConfig};
use tokio::sync::{mpsc, oneshot, watch};

use crate::config::{ArbiterConfig, DisplayMessages};
use crate::devices::AnyDisplayDriver;
use crate::error::{DisplayError, Result};
use crate::formatter::format_amount;
use crate::operation::{OperationHandle, OperationRequest, TextLine};
use crate::status::DisplayStatus;
use crate::worker::{Command, Worker};

/// Builder for the worker that serializes access to one display.
#[derive(Debug)]
pub struct DisplayArbiter {
    driver: AnyDisplayDriver,
    config: ArbiterConfig,
}

impl DisplayArbiter {
    pub fn new(driver: impl Into<AnyDisplayDriver>, config: ArbiterConfig) -> Self {
        Self {
            driver: driver.into(),
            config,
        }
    }

    /// Spawn the worker on the current tokio runtime.
    ///
    /// The worker stops on [`DisplayHandle::shutdown`] or once every handle
    /// has been dropped.
    ///
    /// # Errors
    ///
    /// Returns `DisplayError::InvalidConfig` if the arbiter configuration is
    /// unusable.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn start(self) -> Result<DisplayHandle> {
        self.config.validate()?;

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let messages = Arc::new(self.config.messages.clone());

        let worker = Worker::new(self.driver, self.config, commands_rx, state_tx);
        tokio::spawn(worker.run());

        Ok(DisplayHandle {
            commands: commands_tx,
            state: state_rx,
            messages,
        })
    }
}

/// Cloneable entry point to a running arbiter.
#[derive(Debug, Clone)]
pub struct DisplayHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
    messages: Arc<DisplayMessages>,
}

impl DisplayHandle {
    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(command(reply))
            .map_err(|_| DisplayError::Closed)?;
        rx.await.map_err(|_| DisplayError::Closed)
    }

    /// Open the display, replacing any existing connection.
    ///
    /// Everything queued or running on the previous connection is rejected
    /// with `DisplayError::Superseded`. On success an initial clear is queued.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the device cannot
    /// be opened within the open timeout.
    pub async fn connect(&self, port: impl Into<String>, config: DisplayConfig) -> Result<()> {
        let port = port.into();
        self.request(|reply| Command::Connect {
            port,
            config,
            reply,
        })
        .await?
    }

    /// Close the display. Pending operations are rejected with
    /// `DisplayError::Superseded`. Disconnecting twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `DisplayError::Closed` if the arbiter has stopped.
    pub async fn disconnect(&self) -> Result<()> {
        self.request(|reply| Command::Disconnect { reply }).await?
    }

    /// Snapshot of the connection, queue and counters.
    ///
    /// # Errors
    ///
    /// Returns `DisplayError::Closed` if the arbiter has stopped.
    pub async fn status(&self) -> Result<DisplayStatus> {
        self.request(|reply| Command::Status { reply }).await
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Disconnect and stop the worker.
    ///
    /// # Errors
    ///
    /// Returns `DisplayError::Closed` if the arbiter had already stopped.
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|reply| Command::Shutdown { reply }).await
    }

    /// Submit an operation.
    ///
    /// Resolves immediately with `DisplayError::NotConnected` when no display
    /// is connected.
    pub fn submit(&self, request: OperationRequest) -> OperationHandle {
        if !self.is_connected() {
            return OperationHandle::ready(Err(DisplayError::NotConnected));
        }

        let (reply, rx) = oneshot::channel();
        match self.commands.send(Command::Submit { request, reply }) {
            Ok(()) => OperationHandle::new(rx),
            Err(_) => OperationHandle::ready(Err(DisplayError::Closed)),
        }
    }

    /// Show two left-aligned lines.
    pub fn write_lines(
        &self,
        first: impl Into<String>,
        second: impl Into<String>,
        priority: i32,
    ) -> OperationHandle {
        self.submit(OperationRequest::write_lines(first, second, priority))
    }

    /// Blank the display.
    pub fn clear(&self) -> OperationHandle {
        self.submit(OperationRequest::clear())
    }

    pub fn show_welcome(&self) -> OperationHandle {
        let [first, second] = &self.messages.welcome;
        self.submit(OperationRequest::write(
            [TextLine::center(first), TextLine::center(second)],
            PRIORITY_WELCOME,
        ))
    }

    /// Item name on the first line, price right-aligned below.
    pub fn show_price(&self, item: impl Into<String>, cents: i64) -> OperationHandle {
        let amount = format_amount(cents, &self.messages.currency);
        self.submit(OperationRequest::write(
            [TextLine::left(item), TextLine::right(amount)],
            PRIORITY_PRICE,
        ))
    }

    pub fn show_total(&self, cents: i64) -> OperationHandle {
        let amount = format_amount(cents, &self.messages.currency);
        self.submit(OperationRequest::write(
            [
                TextLine::left(self.messages.total_label.as_str()),
                TextLine::right(amount),
            ],
            PRIORITY_TOTAL,
        ))
    }

    pub fn show_thank_you(&self) -> OperationHandle {
        let [first, second] = &self.messages.thank_you;
        self.submit(OperationRequest::write(
            [TextLine::center(first), TextLine::center(second)],
            PRIORITY_THANK_YOU,
        ))
    }

    pub fn show_error(&self, message: impl Into<String>) -> OperationHandle {
        self.submit(OperationRequest::write(
            [
                TextLine::center(self.messages.error_title.as_str()),
                TextLine::center(message),
            ],
            PRIORITY_ERROR,
        ))
    }
}
