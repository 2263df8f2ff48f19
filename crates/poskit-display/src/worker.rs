//! The arbiter's worker task.
//!
//! One worker owns the driver, the session and the queue. It runs a single
//! loop that multiplexes three event sources:
//!
//! - commands from [`DisplayHandle`](crate::arbiter::DisplayHandle)s,
//! - completion of the running device attempt,
//! - the deadline at which the next queued operation may start.
//!
//! Commands are served while an attempt is in flight, so admission, status
//! and disconnect never wait for a slow device.

use std::future::Future;
use std::ops::ControlFlow;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

use futures::FutureExt;
use poskit_core::constants::{PRIORITY_CLEAR, PRIORITY_RETRY};
use poskit_core::{ConnectionState, DisplayConfig};
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

use crate::config::ArbiterConfig;
use crate::devices::AnyDisplayDriver;
use crate::error::{DisplayError, Result};
use crate::operation::{
    Operation, OperationKind, OperationRequest, Outcome, Payload, Responder, SkipReason,
};
use crate::queue::{OperationQueue, QueuedOperation};
use crate::session::DisplaySession;
use crate::status::{DisplayStatus, PendingItem, QueueStats};
use crate::traits::DisplayDriver;

/// Messages from handles to the worker.
#[derive(Debug)]
pub(crate) enum Command {
    Submit {
        request: OperationRequest,
        reply: Responder,
    },
    Connect {
        port: String,
        config: DisplayConfig,
        reply: oneshot::Sender<Result<()>>,
    },
    Disconnect {
        reply: oneshot::Sender<Result<()>>,
    },
    Status {
        reply: oneshot::Sender<DisplayStatus>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

type Attempt = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// The operation currently on the device.
struct Running {
    entry: QueuedOperation,
    started_at: Instant,
    cleared: bool,
    attempt: Attempt,
}

pub(crate) struct Worker {
    driver: Arc<Mutex<AnyDisplayDriver>>,
    config: ArbiterConfig,
    commands: mpsc::UnboundedReceiver<Command>,
    state: watch::Sender<ConnectionState>,
    session: Option<DisplaySession>,
    queue: OperationQueue,
    running: Option<Running>,
    hold_until: Option<Instant>,
    stats: QueueStats,
    next_id: u64,
}

impl Worker {
    pub(crate) fn new(
        driver: AnyDisplayDriver,
        config: ArbiterConfig,
        commands: mpsc::UnboundedReceiver<Command>,
        state: watch::Sender<ConnectionState>,
    ) -> Self {
        Self {
            driver: Arc::new(Mutex::new(driver)),
            config,
            commands,
            state,
            session: None,
            queue: OperationQueue::new(),
            running: None,
            hold_until: None,
            stats: QueueStats::default(),
            next_id: 1,
        }
    }

    pub(crate) async fn run(mut self) {
        debug!("Display worker started");

        loop {
            let ready_at = self.ready_at();

            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    Some(command) => {
                        if self.handle_command(command).await.is_break() {
                            break;
                        }
                    }
                    None => {
                        debug!("All display handles dropped");
                        self.teardown().await;
                        break;
                    }
                },
                result = poll_running(&mut self.running) => self.finish_running(result),
                () = sleep_until_ready(ready_at) => self.start_next(),
            }
        }

        debug!("Display worker stopped");
    }

    async fn handle_command(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Submit { request, reply } => self.admit(request, reply),
            Command::Connect {
                port,
                config,
                reply,
            } => {
                let result = self.connect(port, config).await;
                let _ = reply.send(result);
            }
            Command::Disconnect { reply } => {
                self.disconnect().await;
                let _ = reply.send(Ok(()));
            }
            Command::Status { reply } => {
                let _ = reply.send(self.status());
            }
            Command::Shutdown { reply } => {
                self.teardown().await;
                let _ = reply.send(());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Format, deduplicate and enqueue a submission.
    fn admit(&mut self, request: OperationRequest, reply: Responder) {
        let Some(session) = self.session.as_ref() else {
            let _ = reply.send(Err(DisplayError::NotConnected));
            return;
        };

        let now = Instant::now();
        let kind = match request.payload {
            Payload::Clear => OperationKind::Clear,
            Payload::Write(lines) => match session.format_lines(&lines) {
                Ok(lines) => OperationKind::Write(lines),
                Err(error) => {
                    let _ = reply.send(Err(error));
                    return;
                }
            },
        };

        if let OperationKind::Write(lines) = &kind
            && session.is_duplicate(lines, now, &self.config)
        {
            debug!(%lines, "Skipping duplicate display write");
            self.stats.skipped += 1;
            let _ = reply.send(Ok(Outcome::Skipped {
                reason: SkipReason::Duplicate,
            }));
            return;
        }

        let operation = Operation::new(self.next_id(), kind, request.priority, now);
        trace!(
            id = operation.id,
            kind = operation.kind.name(),
            priority = operation.priority,
            queued = self.queue.len(),
            "Display operation queued"
        );
        self.queue.push(QueuedOperation::with_reply(operation, reply));
    }

    /// When the next queued operation may start, if one can start at all.
    fn ready_at(&self) -> Option<Instant> {
        if self.running.is_some() || self.queue.is_empty() {
            return None;
        }
        let session = self.session.as_ref()?;

        let spacing = session.next_access_at(self.config.min_spacing());
        let ready = match (self.hold_until, spacing) {
            (Some(hold), Some(spacing)) => hold.max(spacing),
            (Some(at), None) | (None, Some(at)) => at,
            (None, None) => Instant::now(),
        };
        Some(ready)
    }

    /// Pop the next operation and start its device attempt.
    fn start_next(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let Some(entry) = self.queue.pop() else {
            return;
        };

        let now = Instant::now();
        let (frame, cleared) =
            session.render(&entry.operation.kind, now, self.config.clear_skip_window());

        debug!(
            id = entry.operation.id,
            kind = entry.operation.kind.name(),
            priority = entry.operation.priority,
            retries = entry.operation.retries,
            cleared,
            "Executing display operation"
        );

        let driver = Arc::clone(&self.driver);
        let timeout = self.config.operation_timeout();
        let timeout_ms = self.config.operation_timeout_ms;
        let attempt = async move {
            let write = AssertUnwindSafe(async move {
                let mut driver = driver.lock().await;
                driver.write(&frame).await
            })
            .catch_unwind();

            match tokio::time::timeout(timeout, write).await {
                Ok(Ok(result)) => result,
                Ok(Err(_)) => Err(DisplayError::device("driver panicked during write")),
                Err(_) => Err(DisplayError::timeout(timeout_ms)),
            }
        };

        self.running = Some(Running {
            entry,
            started_at: now,
            cleared,
            attempt: Box::pin(attempt),
        });
    }

    /// Settle the attempt that just finished: resolve, retry or reject.
    fn finish_running(&mut self, result: Result<()>) {
        let Some(Running {
            mut entry,
            started_at,
            cleared,
            ..
        }) = self.running.take()
        else {
            return;
        };

        let now = Instant::now();
        if let Some(session) = self.session.as_mut() {
            session.record_access(now);
        }

        match result {
            Ok(()) => {
                self.stats.record_success(now.saturating_duration_since(started_at));
                if let Some(session) = self.session.as_mut() {
                    session.record_success(&entry.operation, now);
                }
                self.hold_until = Some(now + self.config.settle_pause());

                let outcome = Outcome::Completed {
                    id: entry.operation.id,
                    attempts: entry.operation.retries + 1,
                    cleared,
                };
                debug!(
                    id = entry.operation.id,
                    kind = entry.operation.kind.name(),
                    "Display operation completed"
                );
                entry.resolve(Ok(outcome));
            }
            Err(error) => {
                self.stats.failed_attempts += 1;

                if error.is_transient() && entry.operation.retries < self.config.max_retries {
                    entry.operation.retries += 1;
                    entry.operation.priority = entry.operation.priority.max(PRIORITY_RETRY);
                    self.stats.retried += 1;
                    self.hold_until = Some(now + self.config.backoff(entry.operation.retries));

                    warn!(
                        id = entry.operation.id,
                        kind = entry.operation.kind.name(),
                        retry = entry.operation.retries,
                        %error,
                        "Display operation failed, retrying"
                    );
                    self.queue.push_front_of_band(entry);
                } else {
                    self.stats.errored += 1;
                    error!(
                        id = entry.operation.id,
                        kind = entry.operation.kind.name(),
                        retries = entry.operation.retries,
                        %error,
                        "Display operation failed"
                    );
                    entry.resolve(Err(error));
                }
            }
        }
    }

    /// Reject the running operation and everything queued.
    fn supersede_all(&mut self, reason: &'static str) {
        if let Some(running) = self.running.take() {
            warn!(
                id = running.entry.operation.id,
                reason, "Superseding running display operation"
            );
            running.entry.resolve(Err(DisplayError::Superseded));
        }

        let mut superseded = 0usize;
        for entry in self.queue.drain() {
            entry.resolve(Err(DisplayError::Superseded));
            superseded += 1;
        }
        if superseded > 0 {
            warn!(count = superseded, reason, "Superseded queued display operations");
        }
    }

    async fn close_driver(&mut self) {
        let mut driver = self.driver.lock().await;
        if driver.is_open()
            && let Err(error) = driver.close().await
        {
            warn!(%error, "Failed to close display driver");
        }
    }

    async fn connect(&mut self, port: String, config: DisplayConfig) -> Result<()> {
        config.validate()?;

        self.supersede_all("reconnect");
        self.close_driver().await;
        self.session = None;
        self.stats = QueueStats::default();
        self.hold_until = None;
        self.state.send_replace(ConnectionState::Connecting);

        let opened = {
            let mut driver = self.driver.lock().await;
            info!(
                port = %port,
                driver = driver.kind(),
                lines = config.lines,
                columns = config.columns,
                baud_rate = config.baud_rate,
                "Connecting display"
            );
            tokio::time::timeout(self.config.open_timeout(), driver.open(&port, &config)).await
        };

        let error = match opened {
            Ok(Ok(())) => {
                // Opening may already talk to the device
                let mut session = DisplaySession::new(port.clone(), config);
                session.record_access(Instant::now());
                self.session = Some(session);
                self.state.send_replace(ConnectionState::Connected);

                let clear = Operation::new(
                    self.next_id(),
                    OperationKind::Clear,
                    PRIORITY_CLEAR,
                    Instant::now(),
                );
                self.queue.push(QueuedOperation::detached(clear));

                info!(port = %port, "Display connected");
                return Ok(());
            }
            Ok(Err(error)) => error,
            Err(_) => DisplayError::timeout(self.config.open_timeout_ms),
        };

        error!(port = %port, %error, "Failed to connect display");
        self.close_driver().await;
        self.state.send_replace(ConnectionState::Disconnected);
        Err(error)
    }

    async fn disconnect(&mut self) {
        self.supersede_all("disconnect");
        self.close_driver().await;
        self.hold_until = None;
        self.state.send_replace(ConnectionState::Disconnected);

        if let Some(session) = self.session.take() {
            info!(port = session.port(), "Display disconnected");
        }
    }

    async fn teardown(&mut self) {
        self.disconnect().await;
        self.commands.close();
    }

    fn status(&self) -> DisplayStatus {
        let now = Instant::now();
        let mut status = DisplayStatus::new(*self.state.borrow());

        if let Some(session) = &self.session {
            status.port = Some(session.port().to_string());
            status.config = Some(*session.config());
            status.connected_at = Some(session.connected_at());
            status.last_displayed = session.last_displayed().cloned();
        }

        status.stats = self.stats.clone();
        status.average_execution_ms = self
            .stats
            .average_execution()
            .map(|average| average.as_secs_f64() * 1000.0);
        status.queue_length = self.queue.len();
        status.processing = self.running.is_some();
        status.running = self
            .running
            .as_ref()
            .map(|running| PendingItem::from_operation(&running.entry.operation, now));
        status.pending = self
            .queue
            .iter()
            .map(|operation| PendingItem::from_operation(operation, now))
            .collect();
        status
    }
}

async fn poll_running(running: &mut Option<Running>) -> Result<()> {
    match running {
        Some(running) => (&mut running.attempt).await,
        None => std::future::pending().await,
    }
}

async fn sleep_until_ready(ready_at: Option<Instant>) {
    match ready_at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
