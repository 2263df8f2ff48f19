//! Line formatting for character displays.
//!
//! Customer displays only render printable ASCII (0x20-0x7E). Everything the
//! arbiter writes goes through [`format_line`], which transliterates common
//! Latin characters, drops control characters and truncates to the display
//! width.
//!
//! # Examples
//!
//! ```
//! use poskit_display::formatter::{format_line, format_amount, align_text, Alignment};
//!
//! assert_eq!(format_line("Café crème", 20), "Cafe creme");
//! assert_eq!(format_amount(1250, "EUR"), "12.50EUR");
//! assert_eq!(align_text("12.50EUR", 10, Alignment::Right), "  12.50EUR");
//! ```

/// Text alignment within a fixed width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    /// Padded on the right.
    Left,
    /// Equal padding on both sides (extra space on the right if odd).
    Center,
    /// Padded on the left.
    Right,
}

/// Normalize arbitrary text into a displayable line of at most `max_width` characters.
///
/// The result is printable ASCII, trimmed and not padded.
pub fn format_line(text: &str, max_width: usize) -> String {
    let mut line = String::with_capacity(text.len());

    for c in text.chars() {
        if c.is_ascii() {
            if !c.is_ascii_control() {
                line.push(c);
            } else if c == '\t' {
                line.push(' ');
            }
        } else if let Some(replacement) = transliterate(c) {
            line.push_str(replacement);
        } else if !c.is_control() {
            line.push('?');
        }
    }

    truncate_text(line.trim(), max_width)
}

/// Truncate text to at most `max_chars` characters.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Align text within a fixed width, padding with spaces.
///
/// Text longer than `width` is truncated.
pub fn align_text(text: &str, width: usize, alignment: Alignment) -> String {
    let char_count = text.chars().count();

    if char_count >= width {
        return truncate_text(text, width);
    }

    let padding = width - char_count;

    match alignment {
        Alignment::Left => format!("{}{}", text, " ".repeat(padding)),
        Alignment::Right => format!("{}{}", " ".repeat(padding), text),
        Alignment::Center => {
            let left_pad = padding / 2;
            let right_pad = padding - left_pad;
            format!("{}{}{}", " ".repeat(left_pad), text, " ".repeat(right_pad))
        }
    }
}

/// Format an amount given in minor units (cents) with a currency suffix.
///
/// ```
/// use poskit_display::formatter::format_amount;
///
/// assert_eq!(format_amount(5, "EUR"), "0.05EUR");
/// assert_eq!(format_amount(-1999, "USD"), "-19.99USD");
/// ```
pub fn format_amount(cents: i64, currency: &str) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}{currency}", abs / 100, abs % 100)
}

/// ASCII replacement for common non-ASCII characters.
fn transliterate(c: char) -> Option<&'static str> {
    let replacement = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ą' => "a",
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' | 'Ā' | 'Ą' => "A",
        'ç' | 'ć' | 'č' => "c",
        'Ç' | 'Ć' | 'Č' => "C",
        'ď' | 'đ' => "d",
        'Ď' | 'Đ' => "D",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ę' | 'ě' => "e",
        'È' | 'É' | 'Ê' | 'Ë' | 'Ē' | 'Ę' | 'Ě' => "E",
        'ì' | 'í' | 'î' | 'ï' | 'ī' => "i",
        'Ì' | 'Í' | 'Î' | 'Ï' | 'Ī' => "I",
        'ł' => "l",
        'Ł' => "L",
        'ñ' | 'ń' | 'ň' => "n",
        'Ñ' | 'Ń' | 'Ň' => "N",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => "o",
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' | 'Ō' | 'Ő' => "O",
        'ř' => "r",
        'Ř' => "R",
        'ś' | 'š' | 'ş' => "s",
        'Ś' | 'Š' | 'Ş' => "S",
        'ť' | 'ţ' => "t",
        'Ť' | 'Ţ' => "T",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' => "u",
        'Ù' | 'Ú' | 'Û' | 'Ü' | 'Ū' | 'Ů' | 'Ű' => "U",
        'ý' | 'ÿ' => "y",
        'Ý' | 'Ÿ' => "Y",
        'ź' | 'ż' | 'ž' => "z",
        'Ź' | 'Ż' | 'Ž' => "Z",
        'ß' => "ss",
        'æ' => "ae",
        'Æ' => "AE",
        'œ' => "oe",
        'Œ' => "OE",
        '€' => "EUR",
        '£' => "GBP",
        '‘' | '’' | '´' => "'",
        '“' | '”' | '«' | '»' => "\"",
        '–' | '—' => "-",
        '…' => "...",
        '\u{a0}' => " ",
        _ => return None,
    };
    Some(replacement)
}
