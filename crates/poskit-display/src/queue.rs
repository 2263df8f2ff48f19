//! Priority-ordered operation queue.
//!
//! Entries are kept sorted by priority (descending). New entries go to the
//! back of their priority band, so equal priorities run in admission order.
//! Re-queued failures go to the front of their band instead.
//!
//! The queue only orders entries; it knows nothing about what an operation
//! does on the device.

use std::collections::VecDeque;

use crate::error::Result;
use crate::operation::{Operation, Outcome, Responder};

/// An operation waiting for execution together with its caller's reply channel.
#[derive(Debug)]
pub struct QueuedOperation {
    pub operation: Operation,
    reply: Option<Responder>,
}

impl QueuedOperation {
    /// Entry whose result goes back to a caller.
    pub(crate) fn with_reply(operation: Operation, reply: Responder) -> Self {
        Self {
            operation,
            reply: Some(reply),
        }
    }

    /// Entry nobody waits for (e.g. the clear queued on connect).
    pub fn detached(operation: Operation) -> Self {
        Self {
            operation,
            reply: None,
        }
    }

    /// Deliver the final result. A caller that stopped waiting is ignored.
    pub(crate) fn resolve(self, result: Result<Outcome>) {
        if let Some(reply) = self.reply {
            let _ = reply.send(result);
        }
    }
}

/// Operations ordered by priority, FIFO within a priority.
#[derive(Debug, Default)]
pub struct OperationQueue {
    entries: VecDeque<QueuedOperation>,
}

impl OperationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert behind every entry of equal or higher priority.
    pub fn push(&mut self, entry: QueuedOperation) {
        let priority = entry.operation.priority;
        let index = self
            .entries
            .partition_point(|queued| queued.operation.priority >= priority);
        self.entries.insert(index, entry);
    }

    /// Insert ahead of every other entry of the same priority.
    pub fn push_front_of_band(&mut self, entry: QueuedOperation) {
        let priority = entry.operation.priority;
        let index = self
            .entries
            .partition_point(|queued| queued.operation.priority > priority);
        self.entries.insert(index, entry);
    }

    /// Remove the next entry to execute.
    pub fn pop(&mut self) -> Option<QueuedOperation> {
        self.entries.pop_front()
    }

    pub fn peek(&self) -> Option<&Operation> {
        self.entries.front().map(|entry| &entry.operation)
    }

    /// Remove every entry, highest priority first.
    pub fn drain(&mut self) -> impl Iterator<Item = QueuedOperation> + '_ {
        self.entries.drain(..)
    }

    /// Queued operations in execution order.
    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.entries.iter().map(|entry| &entry.operation)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
