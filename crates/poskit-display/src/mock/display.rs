//! Mock customer display for testing and development.
//!
//! The mock records every frame it receives and can be scripted to fail,
//! hang or slow down, which is how the arbiter's timing and retry behavior
//! is exercised without hardware.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use bytes::Bytes;
use poskit_core::DisplayConfig;
use tokio::time::Instant;

use crate::commands::{DecodedFrame, decode_frame};
use crate::error::{DisplayError, Result};
use crate::traits::DisplayDriver;

/// What the next write attempt does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MockWriteBehavior {
    /// Accept the frame.
    #[default]
    Succeed,

    /// Report a device error.
    Fail,

    /// Never complete.
    Hang,

    /// Panic inside the driver.
    Panic,
}

/// A finished write attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub bytes: Bytes,
    pub started_at: Instant,
    pub finished_at: Instant,
    pub succeeded: bool,
}

impl WriteRecord {
    /// What this frame put on screen.
    pub fn decoded(&self) -> DecodedFrame {
        decode_frame(&self.bytes)
    }
}

#[derive(Debug, Default)]
struct MockState {
    open: bool,
    port: Option<String>,
    config: Option<DisplayConfig>,
    open_count: u32,
    close_count: u32,
    fail_open: bool,
    hang_open: bool,
    script: VecDeque<MockWriteBehavior>,
    default_behavior: MockWriteBehavior,
    write_delay: Duration,
    attempts: u64,
    writes: Vec<WriteRecord>,
    in_flight: usize,
    max_in_flight: usize,
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// Decrements the in-flight counter when a write finishes or is dropped.
struct InFlight(Arc<Mutex<MockState>>);

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut state = lock(&self.0);
        state.in_flight = state.in_flight.saturating_sub(1);
    }
}

/// Mock display driver.
///
/// # Examples
///
/// ```
/// use poskit_display::mock::{MockDisplay, MockWriteBehavior};
/// use poskit_display::traits::DisplayDriver;
/// use poskit_core::DisplayConfig;
///
/// #[tokio::main]
/// async fn main() {
///     let (mut display, handle) = MockDisplay::new();
///     handle.fail_next(1);
///
///     display.open("COM1", &DisplayConfig::default()).await.unwrap();
///     assert!(display.write(&[0x0C]).await.is_err());
///     assert!(display.write(&[0x0C]).await.is_ok());
///     assert_eq!(handle.attempts(), 2);
/// }
/// ```
#[derive(Debug)]
pub struct MockDisplay {
    state: Arc<Mutex<MockState>>,
}

impl MockDisplay {
    /// Create a mock display and the handle that controls it.
    pub fn new() -> (Self, MockDisplayHandle) {
        let state = Arc::new(Mutex::new(MockState::default()));
        let display = Self {
            state: Arc::clone(&state),
        };
        (display, MockDisplayHandle { state })
    }
}

impl Default for MockDisplay {
    fn default() -> Self {
        Self::new().0
    }
}

impl DisplayDriver for MockDisplay {
    async fn open(&mut self, port: &str, config: &DisplayConfig) -> Result<()> {
        let (fail, hang) = {
            let state = lock(&self.state);
            (state.fail_open, state.hang_open)
        };

        if hang {
            return std::future::pending().await;
        }
        if fail {
            return Err(DisplayError::open_failed(port, "simulated open failure"));
        }

        let mut state = lock(&self.state);
        state.open = true;
        state.port = Some(port.to_string());
        state.config = Some(*config);
        state.open_count += 1;
        Ok(())
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let (behavior, delay) = {
            let mut state = lock(&self.state);
            if !state.open {
                return Err(DisplayError::device("port is not open"));
            }
            state.attempts += 1;
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
            let behavior = state.script.pop_front().unwrap_or(state.default_behavior);
            (behavior, state.write_delay)
        };
        let _in_flight = InFlight(Arc::clone(&self.state));
        let started_at = Instant::now();

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let result = match behavior {
            MockWriteBehavior::Succeed => Ok(()),
            MockWriteBehavior::Fail => Err(DisplayError::device("simulated write failure")),
            MockWriteBehavior::Hang => return std::future::pending().await,
            MockWriteBehavior::Panic => panic!("simulated driver panic"),
        };

        lock(&self.state).writes.push(WriteRecord {
            bytes: Bytes::copy_from_slice(bytes),
            started_at,
            finished_at: Instant::now(),
            succeeded: result.is_ok(),
        });
        result
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = lock(&self.state);
        if state.open {
            state.open = false;
            state.close_count += 1;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        lock(&self.state).open
    }
}

/// Handle for scripting and inspecting a [`MockDisplay`].
///
/// Cloneable; every clone observes the same device.
#[derive(Debug, Clone)]
pub struct MockDisplayHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockDisplayHandle {
    /// Queue behaviors for the next write attempts, in order.
    pub fn script(&self, behaviors: impl IntoIterator<Item = MockWriteBehavior>) {
        lock(&self.state).script.extend(behaviors);
    }

    /// Make the next `count` write attempts fail.
    pub fn fail_next(&self, count: usize) {
        self.script(std::iter::repeat_n(MockWriteBehavior::Fail, count));
    }

    /// Make the next write attempt hang forever.
    pub fn hang_next(&self) {
        self.script([MockWriteBehavior::Hang]);
    }

    /// Behavior once the script is exhausted.
    pub fn set_default_behavior(&self, behavior: MockWriteBehavior) {
        lock(&self.state).default_behavior = behavior;
    }

    /// Time every write attempt takes before completing.
    pub fn set_write_delay(&self, delay: Duration) {
        lock(&self.state).write_delay = delay;
    }

    /// Make subsequent opens fail.
    pub fn set_fail_open(&self, fail: bool) {
        lock(&self.state).fail_open = fail;
    }

    /// Make subsequent opens never complete.
    pub fn set_hang_open(&self, hang: bool) {
        lock(&self.state).hang_open = hang;
    }

    /// Finished write attempts in order.
    pub fn writes(&self) -> Vec<WriteRecord> {
        lock(&self.state).writes.clone()
    }

    /// Successful writes in order.
    pub fn successful_writes(&self) -> Vec<WriteRecord> {
        lock(&self.state)
            .writes
            .iter()
            .filter(|record| record.succeeded)
            .cloned()
            .collect()
    }

    /// Screens produced by successful writes, in order.
    pub fn screens(&self) -> Vec<DecodedFrame> {
        self.successful_writes()
            .iter()
            .map(WriteRecord::decoded)
            .collect()
    }

    /// Screen produced by the last successful write.
    pub fn last_screen(&self) -> Option<DecodedFrame> {
        self.screens().pop()
    }

    /// Write attempts started, including ones that never finished.
    pub fn attempts(&self) -> u64 {
        lock(&self.state).attempts
    }

    /// Highest number of writes ever in progress at once.
    pub fn max_concurrent_writes(&self) -> usize {
        lock(&self.state).max_in_flight
    }

    pub fn is_open(&self) -> bool {
        lock(&self.state).open
    }

    pub fn open_count(&self) -> u32 {
        lock(&self.state).open_count
    }

    pub fn close_count(&self) -> u32 {
        lock(&self.state).close_count
    }

    /// Port of the last successful open.
    pub fn port(&self) -> Option<String> {
        lock(&self.state).port.clone()
    }

    /// Configuration of the last successful open.
    pub fn config(&self) -> Option<DisplayConfig> {
        lock(&self.state).config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn opened() -> (MockDisplay, MockDisplayHandle) {
        let (mut display, handle) = MockDisplay::new();
        display
            .open("/dev/ttyUSB0", &DisplayConfig::default())
            .await
            .unwrap();
        (display, handle)
    }

    #[tokio::test]
    async fn test_write_requires_open() {
        let (mut display, handle) = MockDisplay::new();
        assert!(matches!(
            display.write(&[0x0C]).await,
            Err(DisplayError::Device { .. })
        ));
        assert_eq!(handle.attempts(), 0);
    }

    #[tokio::test]
    async fn test_open_close_counts() {
        let (mut display, handle) = opened().await;
        assert!(display.is_open());
        assert_eq!(handle.port().as_deref(), Some("/dev/ttyUSB0"));

        display.close().await.unwrap();
        display.close().await.unwrap();
        assert!(!handle.is_open());
        assert_eq!(handle.open_count(), 1);
        assert_eq!(handle.close_count(), 1);
    }

    #[tokio::test]
    async fn test_fail_open() {
        let (mut display, handle) = MockDisplay::new();
        handle.set_fail_open(true);
        let result = display.open("COM4", &DisplayConfig::default()).await;
        assert!(matches!(result, Err(DisplayError::OpenFailed { .. })));
        assert!(!display.is_open());
    }

    #[tokio::test]
    async fn test_scripted_failures_then_default() {
        let (mut display, handle) = opened().await;
        handle.script([MockWriteBehavior::Fail, MockWriteBehavior::Succeed]);
        handle.set_default_behavior(MockWriteBehavior::Fail);

        assert!(display.write(b"a").await.is_err());
        assert!(display.write(b"b").await.is_ok());
        assert!(display.write(b"c").await.is_err());

        let writes = handle.writes();
        assert_eq!(writes.len(), 3);
        assert_eq!(handle.successful_writes()[0].bytes.as_ref(), b"b");
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_delay_and_hang() {
        let (mut display, handle) = opened().await;
        handle.set_write_delay(Duration::from_millis(40));

        display.write(b"x").await.unwrap();
        let record = &handle.writes()[0];
        assert_eq!(
            record.finished_at - record.started_at,
            Duration::from_millis(40)
        );

        handle.hang_next();
        let hung = tokio::time::timeout(Duration::from_secs(1), display.write(b"y")).await;
        assert!(hung.is_err());
        assert_eq!(handle.attempts(), 2);
        assert_eq!(handle.writes().len(), 1);
        assert_eq!(handle.max_concurrent_writes(), 1);
    }

    #[tokio::test]
    async fn test_last_screen() {
        let (mut display, handle) = opened().await;
        let frame = crate::commands::encode_lines(
            &poskit_core::DisplayLines::pair("HELLO", "WORLD"),
            20,
            true,
        );
        display.write(&frame).await.unwrap();

        let screen = handle.last_screen().unwrap();
        assert!(screen.cleared);
        assert_eq!(screen.row(0), "HELLO");
        assert_eq!(screen.row(1), "WORLD");
    }
}
