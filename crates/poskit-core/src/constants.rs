//! Core constants for the customer display arbiter.
//!
//! This module defines the priority bands of the named display actions and
//! the default timings used by the operation queue for 2x20 VFD/LCD pole
//! displays. Every timing can be overridden through `ArbiterConfig` in
//! `poskit-display`.
//!
//! # Priority Bands
//!
//! Higher priorities execute sooner. Equal priorities run in submission order.
//!
//! | Band | Value | Action |
//! |------|-------|--------|
//! | [`PRIORITY_WRITE`] | 0 | Generic low priority write |
//! | [`PRIORITY_PRICE`] | 6 | Scanned item with its price |
//! | [`PRIORITY_TOTAL`] | 7 | Cart total |
//! | [`PRIORITY_WELCOME`] | 8 | Welcome screen |
//! | [`PRIORITY_THANK_YOU`] | 9 | Thank-you screen |
//! | [`PRIORITY_ERROR`] | 9 | Error message |
//! | [`PRIORITY_CLEAR`] | 10 | Clear display |
//! | [`PRIORITY_RETRY`] | 10 | Floor for re-queued failed operations |
//!
//! # Usage
//!
//! ```
//! use poskit_core::constants::*;
//! use std::time::Duration;
//!
//! assert!(PRIORITY_CLEAR > PRIORITY_TOTAL);
//!
//! let spacing = Duration::from_millis(DEFAULT_MIN_SPACING_MS);
//! assert_eq!(spacing.as_millis(), 200);
//! ```

// ============================================================================
// Priority Bands
// ============================================================================

/// Generic write submitted without a named action.
pub const PRIORITY_WRITE: i32 = 0;

/// Item name and unit price after a scan.
pub const PRIORITY_PRICE: i32 = 6;

/// Running cart total.
pub const PRIORITY_TOTAL: i32 = 7;

/// Welcome screen shown between customers.
pub const PRIORITY_WELCOME: i32 = 8;

/// Thank-you screen shown after payment.
pub const PRIORITY_THANK_YOU: i32 = 9;

/// Error message shown to the customer.
pub const PRIORITY_ERROR: i32 = 9;

/// Clear display.
pub const PRIORITY_CLEAR: i32 = 10;

/// Minimum priority of an operation re-queued after a failed attempt.
///
/// Failed operations are re-inserted at the front of their band.
pub const PRIORITY_RETRY: i32 = 10;

// ============================================================================
// Queue Timings (milliseconds)
// ============================================================================

/// Minimum delay between the end of one device access and the next.
///
/// Customer displays drop bytes when writes arrive back-to-back.
pub const DEFAULT_MIN_SPACING_MS: u64 = 200;

/// Upper bound for a single device access.
pub const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 5_000;

/// Maximum number of re-attempts after the first failed attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Backoff unit; attempt `n` waits `n * DEFAULT_BACKOFF_STEP_MS`.
pub const DEFAULT_BACKOFF_STEP_MS: u64 = 500;

/// Fixed pause after every successful operation.
pub const DEFAULT_SETTLE_PAUSE_MS: u64 = 50;

/// A write identical to the last completed one is skipped when that one
/// completed less than this long ago.
pub const DEFAULT_DEDUP_WINDOW_MS: u64 = 500;

/// A write identical to the last completed one is skipped only when that
/// one was submitted less than this long ago.
pub const DEFAULT_DUPLICATE_SUBMIT_WINDOW_MS: u64 = 1_000;

/// Identical content older than this is rewritten without a clear first.
pub const DEFAULT_CLEAR_SKIP_WINDOW_MS: u64 = 100;

/// Upper bound for opening the serial connection.
pub const DEFAULT_OPEN_TIMEOUT_MS: u64 = 3_000;

// ============================================================================
// Display Geometry
// ============================================================================

/// Default serial baud rate of pole displays.
pub const DEFAULT_BAUD_RATE: u32 = 9_600;

/// Default number of display lines.
pub const DEFAULT_LINES: usize = 2;

/// Default number of characters per line.
pub const DEFAULT_COLUMNS: usize = 20;

/// Largest supported line count.
pub const MAX_LINES: usize = 4;

/// Largest supported line width.
pub const MAX_COLUMNS: usize = 40;
