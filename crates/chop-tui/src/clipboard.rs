//! Clipboard via OSC 52.
//!
//! Copy writes the escape sequence straight to the terminal, which most
//! emulators map onto the system clipboard. Reading back is not possible
//! over this channel, so paste reports unavailability as feedback.

use std::io::{self, Write};

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Copies `text` to the clipboard through the terminal.
///
/// # Errors
///
/// Returns an io error when the terminal write fails.
pub fn copy(text: &str) -> io::Result<()> {
    let mut stdout = io::stdout();
    write!(stdout, "\x1b]52;c;{}\x07", base64_encode(text.as_bytes()))?;
    stdout.flush()
}

fn base64_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(3) * 4);
    for chunk in data.chunks(3) {
        let b = [
            chunk[0],
            chunk.get(1).copied().unwrap_or(0),
            chunk.get(2).copied().unwrap_or(0),
        ];
        let word = (u32::from(b[0]) << 16) | (u32::from(b[1]) << 8) | u32::from(b[2]);
        out.push(BASE64[(word >> 18) as usize & 63] as char);
        out.push(BASE64[(word >> 12) as usize & 63] as char);
        out.push(if chunk.len() > 1 {
            BASE64[(word >> 6) as usize & 63] as char
        } else {
            '='
        });
        out.push(if chunk.len() > 2 {
            BASE64[word as usize & 63] as char
        } else {
            '='
        });
    }
    out
}

/// Cleans pasted text for a single-line input: newlines collapse to
/// nothing, tabs to a space, control characters are dropped.
#[must_use]
pub fn clean_paste(text: &str) -> String {
    text.chars()
        .filter_map(|c| match c {
            '\r' | '\n' => None,
            '\t' => Some(' '),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_vectors() {
        assert_eq!(base64_encode(b""), "");
        assert_eq!(base64_encode(b"f"), "Zg==");
        assert_eq!(base64_encode(b"fo"), "Zm8=");
        assert_eq!(base64_encode(b"foo"), "Zm9v");
        assert_eq!(base64_encode(b"foobar"), "Zm9vYmFy");
    }

    #[test]
    fn test_clean_paste() {
        assert_eq!(clean_paste("0xabc\ndef"), "0xabcdef");
        assert_eq!(clean_paste("a\tb"), "a b");
        assert_eq!(clean_paste("plain"), "plain");
        assert_eq!(clean_paste("ctrl\u{7}chars"), "ctrlchars");
    }
}
