//! Operations submitted to the display arbiter.
//!
//! Callers build an [`OperationRequest`] (a payload plus a priority) and get
//! back an [`OperationHandle`] that resolves once the arbiter has executed,
//! skipped or given up on the operation.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use poskit_core::DisplayLines;
use poskit_core::constants::{PRIORITY_CLEAR, PRIORITY_WRITE};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::error::{DisplayError, Result};
use crate::formatter::Alignment;

/// One line of requested text with its placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLine {
    /// Raw text; formatted for the device at admission.
    pub text: String,

    /// Placement within the display width.
    pub alignment: Alignment,
}

impl TextLine {
    pub fn left(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            alignment: Alignment::Left,
        }
    }

    pub fn center(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            alignment: Alignment::Center,
        }
    }

    pub fn right(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            alignment: Alignment::Right,
        }
    }
}

/// What the caller wants on the display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Blank the display.
    Clear,

    /// Show the given lines; missing lines are blanked.
    Write(Vec<TextLine>),
}

/// A submission to the arbiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRequest {
    pub payload: Payload,
    pub priority: i32,
}

impl OperationRequest {
    /// Clear request at the clear priority band.
    pub fn clear() -> Self {
        Self {
            payload: Payload::Clear,
            priority: PRIORITY_CLEAR,
        }
    }

    /// Write request for arbitrary lines.
    pub fn write(lines: impl IntoIterator<Item = TextLine>, priority: i32) -> Self {
        Self {
            payload: Payload::Write(lines.into_iter().collect()),
            priority,
        }
    }

    /// Left-aligned two-line write.
    pub fn write_lines(first: impl Into<String>, second: impl Into<String>, priority: i32) -> Self {
        Self::write([TextLine::left(first), TextLine::left(second)], priority)
    }

    /// Override the priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl Default for OperationRequest {
    fn default() -> Self {
        Self::write(Vec::new(), PRIORITY_WRITE)
    }
}

/// Admitted operation kind. Write lines are already formatted for the
/// connected display and double as the deduplication fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationKind {
    Clear,
    Write(DisplayLines),
}

impl OperationKind {
    /// Deduplication fingerprint; clears have none.
    pub fn fingerprint(&self) -> Option<&DisplayLines> {
        match self {
            Self::Clear => None,
            Self::Write(lines) => Some(lines),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Write(_) => "write",
        }
    }
}

/// An operation owned by the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// Admission sequence number.
    pub id: u64,

    pub kind: OperationKind,

    /// Current priority; raised when the operation is re-queued after a failure.
    pub priority: i32,

    /// Failed attempts so far.
    pub retries: u32,

    pub submitted_at: Instant,
}

impl Operation {
    pub fn new(id: u64, kind: OperationKind, priority: i32, submitted_at: Instant) -> Self {
        Self {
            id,
            kind,
            priority,
            retries: 0,
            submitted_at,
        }
    }
}

/// Why a submission did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Same content was written moments ago.
    Duplicate,
}

/// Successful resolution of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// The operation reached the device.
    Completed {
        id: u64,
        /// Attempts used, including the successful one.
        attempts: u32,
        /// The frame cleared the display before writing.
        cleared: bool,
    },

    /// The operation was intentionally not executed.
    Skipped { reason: SkipReason },
}

impl Outcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

pub(crate) type Responder = oneshot::Sender<Result<Outcome>>;

/// Awaitable result of a submitted operation.
///
/// Dropping the handle does not cancel the operation; the device write still
/// happens on the arbiter's schedule.
#[derive(Debug)]
#[must_use = "the operation runs regardless, but its result is only observable through the handle"]
pub struct OperationHandle {
    rx: oneshot::Receiver<Result<Outcome>>,
}

impl OperationHandle {
    pub(crate) fn new(rx: oneshot::Receiver<Result<Outcome>>) -> Self {
        Self { rx }
    }

    /// Handle that is already resolved.
    pub(crate) fn ready(result: Result<Outcome>) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(result);
        Self { rx }
    }
}

impl Future for OperationHandle {
    type Output = Result<Outcome>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(DisplayError::Closed)))
    }
}
