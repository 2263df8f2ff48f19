//! Queue statistics and status snapshots.

use std::time::Duration;

use chrono::{DateTime, Utc};
use poskit_core::{ConnectionState, DisplayConfig, DisplayLines};
use serde::Serialize;
use tokio::time::Instant;

use crate::operation::Operation;

/// Counters accumulated since the last connect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Operations that reached the device.
    pub executed: u64,

    /// Submissions dropped as duplicates.
    pub skipped: u64,

    /// Operations that failed permanently.
    pub errored: u64,

    /// Re-queues after a failed attempt.
    pub retried: u64,

    /// Failed device accesses, including those later retried.
    pub failed_attempts: u64,

    #[serde(skip)]
    total_execution: Duration,
}

impl QueueStats {
    /// Record a successful operation and how long its final attempt took.
    pub fn record_success(&mut self, elapsed: Duration) {
        self.executed += 1;
        self.total_execution += elapsed;
    }

    /// Mean duration of successful attempts.
    pub fn average_execution(&self) -> Option<Duration> {
        if self.executed == 0 {
            return None;
        }
        let executed = u32::try_from(self.executed).unwrap_or(u32::MAX);
        Some(self.total_execution / executed)
    }
}

/// Summary of a queued or running operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingItem {
    pub id: u64,
    pub kind: &'static str,
    pub priority: i32,
    pub retries: u32,
    pub age_ms: u64,
}

impl PendingItem {
    pub fn from_operation(operation: &Operation, now: Instant) -> Self {
        let age = now.saturating_duration_since(operation.submitted_at);
        Self {
            id: operation.id,
            kind: operation.kind.name(),
            priority: operation.priority,
            retries: operation.retries,
            age_ms: u64::try_from(age.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Point-in-time view of the arbiter.
#[derive(Debug, Clone, Serialize)]
pub struct DisplayStatus {
    pub state: ConnectionState,

    /// Port of the current connection.
    pub port: Option<String>,

    pub config: Option<DisplayConfig>,
    pub connected_at: Option<DateTime<Utc>>,

    /// Operations waiting, excluding the running one.
    pub queue_length: usize,

    /// An operation is executing right now.
    pub processing: bool,

    pub stats: QueueStats,
    pub average_execution_ms: Option<f64>,
    pub last_displayed: Option<DisplayLines>,
    pub running: Option<PendingItem>,
    pub pending: Vec<PendingItem>,
}

impl DisplayStatus {
    /// Status with no session details and zeroed counters.
    pub fn new(state: ConnectionState) -> Self {
        Self {
            state,
            port: None,
            config: None,
            connected_at: None,
            queue_length: 0,
            processing: false,
            stats: QueueStats::default(),
            average_execution_ms: None,
            last_displayed: None,
            running: None,
            pending: Vec::new(),
        }
    }
}
