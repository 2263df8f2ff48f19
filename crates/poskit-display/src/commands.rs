//! Byte framing for ESC/POS compatible customer displays.
//!
//! Pole displays (VFD and character LCD) understand a small ESC/POS subset:
//!
//! | Bytes | Meaning |
//! |-------|---------|
//! | `ESC @` (0x1B 0x40) | Initialize display |
//! | `FF` (0x0C) | Clear display, cursor home |
//! | `US $ x y` (0x1F 0x24 x y) | Move cursor to column `x`, row `y` (1-based) |
//!
//! Each operation is encoded into a single frame so that it reaches the
//! driver as exactly one `write`.

use bytes::{BufMut, Bytes, BytesMut};
use poskit_core::DisplayLines;

/// Initialize display.
pub const INIT: [u8; 2] = [0x1B, 0x40];

/// Clear display and move the cursor home.
pub const CLEAR: u8 = 0x0C;

/// Prefix of the cursor positioning command.
pub const CURSOR: [u8; 2] = [0x1F, 0x24];

/// Frame sent right after the port is opened.
pub fn encode_init() -> Bytes {
    Bytes::from_static(&INIT)
}

/// Frame for a clear operation.
pub fn encode_clear() -> Bytes {
    Bytes::from_static(&[CLEAR])
}

/// Frame for a write operation.
///
/// Every line is padded to `columns` so that rewriting without a clear still
/// erases leftovers of longer previous content.
pub fn encode_lines(lines: &DisplayLines, columns: usize, clear_first: bool) -> Bytes {
    let mut frame = BytesMut::with_capacity(1 + lines.len() * (CURSOR.len() + 2 + columns));

    if clear_first {
        frame.put_u8(CLEAR);
    }

    for (row, line) in lines.iter().enumerate() {
        frame.put_slice(&CURSOR);
        frame.put_u8(1);
        frame.put_u8(row as u8 + 1);

        let mut written = 0;
        for byte in line.bytes().take(columns) {
            frame.put_u8(byte);
            written += 1;
        }
        frame.put_bytes(b' ', columns - written);
    }

    frame.freeze()
}

/// Screen contents reconstructed from a frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedFrame {
    /// Frame started with `ESC @`.
    pub initialized: bool,

    /// Frame contained a clear.
    pub cleared: bool,

    /// Text written per row (0-based), trailing padding removed.
    pub rows: Vec<String>,
}

impl DecodedFrame {
    /// Text of a row, empty if nothing was written there.
    pub fn row(&self, index: usize) -> &str {
        self.rows.get(index).map(String::as_str).unwrap_or("")
    }
}

/// Reconstruct what a frame puts on screen.
///
/// Used by the mock driver and diagnostics; unknown control bytes are skipped.
pub fn decode_frame(bytes: &[u8]) -> DecodedFrame {
    let mut decoded = DecodedFrame::default();
    let mut row = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            0x1B if bytes.get(i + 1) == Some(&INIT[1]) => {
                decoded.initialized = true;
                i += 2;
            }
            CLEAR => {
                decoded.cleared = true;
                row = 0;
                i += 1;
            }
            0x1F if bytes.get(i + 1) == Some(&CURSOR[1]) && i + 3 < bytes.len() => {
                row = usize::from(bytes[i + 3]).saturating_sub(1);
                i += 4;
            }
            byte @ 0x20..=0x7E => {
                if decoded.rows.len() <= row {
                    decoded.rows.resize(row + 1, String::new());
                }
                decoded.rows[row].push(char::from(byte));
                i += 1;
            }
            _ => i += 1,
        }
    }

    for text in &mut decoded.rows {
        text.truncate(text.trim_end().len());
    }
    decoded
}
