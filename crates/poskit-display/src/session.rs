//! Live state of a connected display.
//!
//! A [`DisplaySession`] exists exactly while a device is connected. It is
//! owned by the arbiter worker and records what is known about the hardware:
//! its configuration, the content shown by the last successful write and the
//! timing of the last device access.

use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use poskit_core::{DisplayConfig, DisplayLines};
use tokio::time::Instant;

use crate::commands;
use crate::config::ArbiterConfig;
use crate::error::Result;
use crate::formatter::{align_text, format_line};
use crate::operation::{Operation, OperationKind, TextLine};

/// Metadata of the most recently completed operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedOperation {
    pub id: u64,
    pub kind: OperationKind,
    pub submitted_at: Instant,
    pub completed_at: Instant,
}

/// State of the currently connected display.
#[derive(Debug, Clone)]
pub struct DisplaySession {
    port: String,
    config: DisplayConfig,
    connected_at: DateTime<Utc>,
    last_displayed: Option<(DisplayLines, Instant)>,
    last_operation: Option<CompletedOperation>,
    last_access: Option<Instant>,
}

impl DisplaySession {
    pub fn new(port: impl Into<String>, config: DisplayConfig) -> Self {
        Self {
            port: port.into(),
            config,
            connected_at: Utc::now(),
            last_displayed: None,
            last_operation: None,
            last_access: None,
        }
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Content of the last successful write.
    pub fn last_displayed(&self) -> Option<&DisplayLines> {
        self.last_displayed.as_ref().map(|(lines, _)| lines)
    }

    pub fn last_operation(&self) -> Option<&CompletedOperation> {
        self.last_operation.as_ref()
    }

    /// Format requested lines for this display.
    ///
    /// Every line is transliterated, truncated and aligned to the display
    /// width; missing lines are blank.
    ///
    /// # Errors
    ///
    /// Returns an error when more lines are given than the display has.
    pub fn format_lines(&self, lines: &[TextLine]) -> Result<DisplayLines> {
        let columns = self.config.columns;
        let requested = DisplayLines::new(lines.iter().map(|line| line.text.as_str()));
        requested.check_fits(self.config.lines)?;

        Ok(DisplayLines::new((0..self.config.lines).map(|row| {
            lines.get(row).map_or_else(
                || " ".repeat(columns),
                |line| align_text(&format_line(&line.text, columns), columns, line.alignment),
            )
        })))
    }

    /// True when `lines` duplicates the last completed operation.
    ///
    /// The last operation must be a write of the same lines that completed
    /// within `dedup_window` and was submitted within `duplicate_submit_window`.
    pub fn is_duplicate(&self, lines: &DisplayLines, now: Instant, config: &ArbiterConfig) -> bool {
        let Some(last) = &self.last_operation else {
            return false;
        };

        last.kind.fingerprint() == Some(lines)
            && now.saturating_duration_since(last.completed_at) < config.dedup_window()
            && now.saturating_duration_since(last.submitted_at) < config.duplicate_submit_window()
    }

    /// Whether writing `lines` should clear the display first.
    ///
    /// Only identical content that has been on screen longer than `window`
    /// is rewritten in place.
    pub fn should_clear(&self, lines: &DisplayLines, now: Instant, window: Duration) -> bool {
        match &self.last_displayed {
            Some((shown, at)) => !(shown == lines && now.saturating_duration_since(*at) > window),
            None => true,
        }
    }

    /// Earliest instant the device may be accessed again.
    pub fn next_access_at(&self, spacing: Duration) -> Option<Instant> {
        self.last_access.map(|at| at + spacing)
    }

    /// Frame for an operation and whether it clears the display.
    pub fn render(&self, kind: &OperationKind, now: Instant, clear_skip_window: Duration) -> (Bytes, bool) {
        match kind {
            OperationKind::Clear => (commands::encode_clear(), true),
            OperationKind::Write(lines) => {
                let clear = self.should_clear(lines, now, clear_skip_window);
                (commands::encode_lines(lines, self.config.columns, clear), clear)
            }
        }
    }

    /// A device access ended (successfully or not).
    pub fn record_access(&mut self, at: Instant) {
        self.last_access = Some(at);
    }

    /// An operation completed successfully.
    ///
    /// Only writes change the displayed content; a clear is remembered as
    /// the last operation alone.
    pub fn record_success(&mut self, operation: &Operation, at: Instant) {
        if let OperationKind::Write(lines) = &operation.kind {
            self.last_displayed = Some((lines.clone(), at));
        }
        self.last_operation = Some(CompletedOperation {
            id: operation.id,
            kind: operation.kind.clone(),
            submitted_at: operation.submitted_at,
            completed_at: at,
        });
    }
}
