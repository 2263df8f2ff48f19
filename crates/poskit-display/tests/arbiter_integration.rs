//! Integration tests for DisplayArbiter
//!
//! These tests drive the arbiter through its public handle against the mock
//! display. Every test runs on tokio's paused clock, so spacing, backoff and
//! timeouts elapse instantly while keeping their exact durations.

use std::time::Duration;

use futures::future::join_all;
use poskit_core::{ConnectionState, DisplayConfig};
use poskit_display::mock::{MockDisplay, MockDisplayHandle, MockWriteBehavior};
use poskit_display::{
    ArbiterConfig, DisplayArbiter, DisplayError, DisplayHandle, OperationRequest, Outcome,
    SkipReason, TextLine,
};
use tokio::time::{Instant, sleep};

const PORT: &str = "/dev/ttyUSB0";

fn start() -> (DisplayHandle, MockDisplayHandle) {
    let (display, mock) = MockDisplay::new();
    let handle = DisplayArbiter::new(display, ArbiterConfig::default())
        .start()
        .unwrap();
    (handle, mock)
}

/// Connected arbiter whose initial clear has already run.
async fn connected() -> (DisplayHandle, MockDisplayHandle) {
    let (handle, mock) = start();
    handle.connect(PORT, DisplayConfig::default()).await.unwrap();
    sleep(Duration::from_secs(1)).await;
    assert_eq!(mock.successful_writes().len(), 1);
    (handle, mock)
}

/// First row of every successful write, skipping blank screens.
fn labels(mock: &MockDisplayHandle) -> Vec<String> {
    mock.screens()
        .iter()
        .map(|screen| screen.row(0).trim().to_string())
        .filter(|label| !label.is_empty())
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_connect_queues_initial_clear() {
    let (handle, mock) = start();
    assert_eq!(handle.state(), ConnectionState::Disconnected);

    handle.connect(PORT, DisplayConfig::default()).await.unwrap();
    let opened_at = Instant::now();
    assert!(handle.is_connected());
    assert_eq!(mock.port().as_deref(), Some(PORT));

    sleep(Duration::from_millis(100)).await;
    assert!(mock.writes().is_empty());

    sleep(Duration::from_millis(200)).await;
    let writes = mock.successful_writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].bytes.as_ref(), &[0x0C]);
    // Opening counts as a device access
    assert!(writes[0].started_at - opened_at >= Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn test_writes_are_serialized() {
    let (handle, mock) = connected().await;
    mock.set_write_delay(Duration::from_millis(30));

    let tasks: Vec<_> = (0..10)
        .map(|i| {
            let handle = handle.clone();
            tokio::spawn(async move { handle.write_lines(format!("OP{i}"), "", i % 3).await })
        })
        .collect();

    for result in join_all(tasks).await {
        assert!(matches!(result.unwrap(), Ok(Outcome::Completed { .. })));
    }

    assert_eq!(mock.max_concurrent_writes(), 1);

    let writes = mock.writes();
    assert_eq!(writes.len(), 11);
    for pair in writes.windows(2) {
        assert!(pair[1].started_at >= pair[0].finished_at);
    }
}

#[tokio::test(start_paused = true)]
async fn test_priority_order_then_submission_order() {
    let (handle, mock) = connected().await;

    // Submitted back to back, so all of them are queued before the first runs
    let handles = vec![
        handle.write_lines("LOW-A", "", 0),
        handle.write_lines("PRICE", "", 6),
        handle.write_lines("LOW-B", "", 0),
        handle.write_lines("TOTAL", "", 7),
        handle.write_lines("PRICE-B", "", 6),
        handle.write_lines("WELCOME", "", 8),
    ];
    for result in join_all(handles).await {
        assert!(result.is_ok());
    }

    assert_eq!(
        labels(&mock),
        vec!["WELCOME", "TOTAL", "PRICE", "PRICE-B", "LOW-A", "LOW-B"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_clear_runs_before_pending_writes() {
    let (handle, mock) = connected().await;

    let write = handle.write_lines("A", "B", 0);
    let clear = handle.clear();

    let clear_outcome = clear.await.unwrap();
    let write_outcome = write.await.unwrap();

    let (Outcome::Completed { id: clear_id, .. }, Outcome::Completed { id: write_id, .. }) =
        (clear_outcome, write_outcome)
    else {
        panic!("both operations should complete");
    };
    assert!(write_id < clear_id);

    let screens = mock.screens();
    assert_eq!(screens.len(), 3);
    assert!(screens[1].rows.is_empty());
    assert_eq!(screens[2].row(0), "A");
    assert_eq!(screens[2].row(1), "B");
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_write_is_skipped() {
    let (handle, mock) = connected().await;

    let first = handle.write_lines("TOTAL", "12.50EUR", 7).await.unwrap();
    assert!(matches!(first, Outcome::Completed { attempts: 1, .. }));

    sleep(Duration::from_millis(100)).await;
    let second = handle.write_lines("TOTAL", "12.50EUR", 7).await.unwrap();
    assert_eq!(
        second,
        Outcome::Skipped {
            reason: SkipReason::Duplicate
        }
    );

    assert_eq!(labels(&mock), vec!["TOTAL"]);

    // Initial clear plus the first write
    let status = handle.status().await.unwrap();
    assert_eq!(status.stats.executed, 2);
    assert_eq!(status.stats.skipped, 1);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_after_window_is_written() {
    let (handle, mock) = connected().await;

    handle.write_lines("TOTAL", "12.50EUR", 7).await.unwrap();
    sleep(Duration::from_millis(600)).await;

    let again = handle.write_lines("TOTAL", "12.50EUR", 7).await.unwrap();
    assert!(matches!(again, Outcome::Completed { cleared: false, .. }));
    assert_eq!(labels(&mock), vec!["TOTAL", "TOTAL"]);
}

#[tokio::test(start_paused = true)]
async fn test_clear_keeps_last_displayed() {
    let (handle, mock) = connected().await;

    handle.write_lines("A", "B", 0).await.unwrap();
    let before = handle.status().await.unwrap().last_displayed;
    assert!(before.is_some());

    handle.clear().await.unwrap();
    let after = handle.status().await.unwrap().last_displayed;
    assert_eq!(after, before);

    // Same content, long on screen: rewritten in place without a clear byte
    sleep(Duration::from_millis(600)).await;
    let outcome = handle.write_lines("A", "B", 0).await.unwrap();
    assert!(matches!(outcome, Outcome::Completed { cleared: false, .. }));

    let writes = mock.successful_writes();
    let last = writes.last().unwrap();
    assert!(!last.bytes.contains(&0x0C));
    assert_eq!(last.decoded().row(0), "A");
}

#[tokio::test(start_paused = true)]
async fn test_retry_is_elevated_to_front_of_clear_band() {
    let (handle, mock) = connected().await;
    mock.set_write_delay(Duration::from_millis(100));
    mock.fail_next(1);

    let retried = handle.write_lines("RETRIED", "", 0);
    sleep(Duration::from_millis(10)).await;

    // Queued behind the running write, before it fails
    let thanks = handle.write_lines("THANKS", "", 9);
    let clear = handle.clear();

    // First attempt failed at 100ms; the retry now waits out its backoff
    sleep(Duration::from_millis(200)).await;
    let status = handle.status().await.unwrap();
    assert!(!status.processing);
    let pending: Vec<_> = status
        .pending
        .iter()
        .map(|item| (item.kind, item.priority, item.retries))
        .collect();
    assert_eq!(
        pending,
        vec![("write", 10, 1), ("clear", 10, 0), ("write", 9, 0)]
    );

    let (retried, clear, thanks) = tokio::join!(retried, clear, thanks);
    assert!(matches!(retried.unwrap(), Outcome::Completed { attempts: 2, .. }));
    assert!(clear.is_ok());
    assert!(thanks.is_ok());

    // Initial clear, then the retried write, the clear and the thank-you
    let screens = mock.screens();
    assert_eq!(screens.len(), 4);
    assert_eq!(screens[1].row(0), "RETRIED");
    assert!(screens[2].rows.is_empty());
    assert_eq!(screens[3].row(0), "THANKS");
}

#[tokio::test(start_paused = true)]
async fn test_different_content_is_not_duplicate() {
    let (handle, mock) = connected().await;

    handle.show_total(1250).await.unwrap();
    let outcome = handle.show_total(1300).await.unwrap();
    assert!(!outcome.is_skipped());

    let screen = mock.last_screen().unwrap();
    assert_eq!(screen.row(1).trim(), "13.00EUR");
}

#[tokio::test(start_paused = true)]
async fn test_retry_then_success() {
    let (handle, mock) = connected().await;
    mock.fail_next(2);

    let started = Instant::now();
    let outcome = handle.write_lines("A", "B", 0).await.unwrap();

    assert!(matches!(outcome, Outcome::Completed { attempts: 3, .. }));
    assert!(started.elapsed() >= Duration::from_millis(1500));
    // Initial clear plus three attempts
    assert_eq!(mock.attempts(), 4);

    let status = handle.status().await.unwrap();
    assert_eq!(status.stats.retried, 2);
    assert_eq!(status.stats.failed_attempts, 2);
    assert_eq!(status.stats.errored, 0);
}

#[tokio::test(start_paused = true)]
async fn test_retry_bound_rejects_after_three_attempts() {
    let (handle, mock) = connected().await;
    mock.fail_next(3);

    let result = handle.write_lines("A", "B", 0).await;
    assert!(matches!(result, Err(DisplayError::Device { .. })));
    assert_eq!(mock.attempts(), 4);

    let status = handle.status().await.unwrap();
    assert_eq!(status.stats.failed_attempts, 3);
    assert_eq!(status.stats.retried, 2);
    assert_eq!(status.stats.errored, 1);
    assert_eq!(status.queue_length, 0);
}

#[tokio::test(start_paused = true)]
async fn test_always_failing_driver() {
    let (handle, mock) = connected().await;
    mock.set_default_behavior(MockWriteBehavior::Fail);

    let result = handle.clear().await;
    assert!(matches!(result, Err(DisplayError::Device { .. })));
    assert_eq!(mock.attempts(), 4);

    // The worker keeps serving after a permanent failure
    mock.set_default_behavior(MockWriteBehavior::Succeed);
    assert!(handle.write_lines("STILL", "ALIVE", 0).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_hung_write_times_out_and_retries() {
    let (handle, mock) = connected().await;
    mock.hang_next();

    let started = Instant::now();
    let outcome = handle.write_lines("A", "B", 0).await.unwrap();

    assert!(matches!(outcome, Outcome::Completed { attempts: 2, .. }));
    assert!(started.elapsed() >= Duration::from_millis(5500));
    assert_eq!(mock.max_concurrent_writes(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_driver_panic_is_contained() {
    let (handle, mock) = connected().await;
    mock.script([MockWriteBehavior::Panic]);

    let outcome = handle.write_lines("A", "B", 0).await.unwrap();
    assert!(matches!(outcome, Outcome::Completed { attempts: 2, .. }));
    assert_eq!(mock.last_screen().unwrap().row(0), "A");
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_supersedes_queue() {
    let (handle, mock) = connected().await;
    mock.set_write_delay(Duration::from_secs(1));

    let running = handle.write_lines("RUNNING", "", 0);
    sleep(Duration::from_millis(10)).await;

    let queued = vec![
        handle.write_lines("Q1", "", 0),
        handle.write_lines("Q2", "", 5),
        handle.clear(),
    ];

    let status = handle.status().await.unwrap();
    assert!(status.processing);
    assert_eq!(status.queue_length, 3);
    assert_eq!(status.pending.len(), 3);
    assert_eq!(status.pending[0].kind, "clear");

    handle.disconnect().await.unwrap();

    assert!(matches!(running.await, Err(DisplayError::Superseded)));
    for result in join_all(queued).await {
        assert!(matches!(result, Err(DisplayError::Superseded)));
    }

    let status = handle.status().await.unwrap();
    assert_eq!(status.state, ConnectionState::Disconnected);
    assert_eq!(status.queue_length, 0);
    assert!(!status.processing);
    assert!(!mock.is_open());

    // Nothing from before the disconnect reaches the new connection
    mock.set_write_delay(Duration::ZERO);
    handle.connect(PORT, DisplayConfig::default()).await.unwrap();
    sleep(Duration::from_secs(2)).await;
    assert!(labels(&mock).is_empty());
    assert_eq!(mock.open_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_supersedes_pending() {
    let (handle, mock) = connected().await;
    mock.set_write_delay(Duration::from_millis(500));

    let first = handle.write_lines("OLD-1", "", 0);
    let second = handle.write_lines("OLD-2", "", 0);
    sleep(Duration::from_millis(10)).await;

    handle.connect("COM7", DisplayConfig::new(2, 16)).await.unwrap();
    assert!(matches!(first.await, Err(DisplayError::Superseded)));
    assert!(matches!(second.await, Err(DisplayError::Superseded)));

    let outcome = handle.write_lines("NEW", "", 0).await.unwrap();
    assert!(matches!(outcome, Outcome::Completed { .. }));

    let status = handle.status().await.unwrap();
    assert_eq!(status.port.as_deref(), Some("COM7"));
    assert_eq!(status.config.map(|config| config.columns), Some(16));
    // Counters restart with the new connection
    assert_eq!(status.stats.executed, 2);
    assert_eq!(labels(&mock), vec!["NEW"]);
}

#[tokio::test(start_paused = true)]
async fn test_minimum_spacing_between_writes() {
    let (handle, mock) = connected().await;
    mock.set_write_delay(Duration::from_millis(20));
    mock.fail_next(1);

    let handles: Vec<_> = (0..5)
        .map(|i| handle.write_lines(format!("S{i}"), "", 0))
        .collect();
    for result in join_all(handles).await {
        assert!(result.is_ok());
    }

    let writes = mock.writes();
    assert_eq!(writes.len(), 7);
    for pair in writes.windows(2) {
        assert!(pair[1].started_at - pair[0].finished_at >= Duration::from_millis(200));
    }
}

#[tokio::test(start_paused = true)]
async fn test_submit_while_disconnected() {
    let (handle, mock) = start();

    assert!(matches!(
        handle.write_lines("A", "B", 0).await,
        Err(DisplayError::NotConnected)
    ));

    handle.connect(PORT, DisplayConfig::default()).await.unwrap();
    handle.disconnect().await.unwrap();
    handle.disconnect().await.unwrap();

    assert!(matches!(
        handle.clear().await,
        Err(DisplayError::NotConnected)
    ));
    assert_eq!(mock.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_open_failure() {
    let (handle, mock) = start();
    mock.set_fail_open(true);

    let result = handle.connect(PORT, DisplayConfig::default()).await;
    assert!(matches!(result, Err(DisplayError::OpenFailed { .. })));
    assert_eq!(handle.state(), ConnectionState::Disconnected);

    let status = handle.status().await.unwrap();
    assert!(status.port.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_open_timeout() {
    let (handle, mock) = start();
    mock.set_hang_open(true);

    let started = Instant::now();
    let result = handle.connect(PORT, DisplayConfig::default()).await;
    assert!(matches!(
        result,
        Err(DisplayError::Timeout { duration_ms: 3000 })
    ));
    assert!(started.elapsed() >= Duration::from_secs(3));
    assert!(!handle.is_connected());
}

#[tokio::test(start_paused = true)]
async fn test_invalid_display_config() {
    let (handle, mock) = start();

    let result = handle.connect(PORT, DisplayConfig::new(2, 0)).await;
    assert!(matches!(result, Err(DisplayError::Core(_))));
    assert_eq!(mock.open_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_too_many_lines() {
    let (handle, _mock) = connected().await;

    let request = OperationRequest::write(
        [
            TextLine::left("1"),
            TextLine::left("2"),
            TextLine::left("3"),
        ],
        0,
    );
    assert!(matches!(
        handle.submit(request).await,
        Err(DisplayError::Core(poskit_core::Error::TooManyLines { given: 3, lines: 2 }))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_dropped_handle_still_executes() {
    let (handle, mock) = connected().await;

    drop(handle.write_lines("FIRE", "FORGET", 0));
    sleep(Duration::from_secs(1)).await;

    assert_eq!(labels(&mock), vec!["FIRE"]);
}

#[tokio::test(start_paused = true)]
async fn test_text_is_formatted_for_device() {
    let (handle, mock) = connected().await;

    handle
        .write_lines("Crème brûlée très délicieuse", "4,50 €", 0)
        .await
        .unwrap();
    let screen = mock.last_screen().unwrap();
    assert_eq!(screen.row(0), "Creme brulee tres de");
    assert_eq!(screen.row(1), "4,50 EUR");
    assert!(screen.cleared);
}

#[tokio::test(start_paused = true)]
async fn test_status_json() {
    let (handle, _mock) = connected().await;
    handle.show_welcome().await.unwrap();

    let status = handle.status().await.unwrap();
    let json = serde_json::to_value(&status).unwrap();

    assert_eq!(json["state"], "connected");
    assert_eq!(json["port"], PORT);
    assert_eq!(json["config"]["columns"], 20);
    assert_eq!(json["stats"]["executed"], 2);
    assert_eq!(json["processing"], false);
    assert!(json["connected_at"].is_string());
    assert_eq!(json["last_displayed"][0].as_str().map(str::trim), Some("WELCOME"));
    assert!(json["pending"].as_array().unwrap().is_empty());
}
