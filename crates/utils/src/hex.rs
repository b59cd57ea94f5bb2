//! Hex Formatting Utilities
//!
//! TEAM_039: Relocated from the console code for testability.
//!
//! Byte-slice dumps for register access tracing, formatted without allocating.

use core::fmt;

/// Nibble 0-9 maps to '0'-'9', 10-15 maps to 'a'-'f'.
#[inline]
#[must_use]
pub fn nibble_to_hex(nibble: u8) -> char {
    if nibble < 10 {
        (b'0' + nibble) as char
    } else {
        (b'a' + (nibble - 10)) as char
    }
}

/// Displays a byte slice as lowercase hex pairs, e.g. `"00 22 b9"`.
#[derive(Debug, Clone, Copy)]
pub struct HexBytes<'a> {
    bytes: &'a [u8],
    separator: Option<char>,
}

impl<'a> HexBytes<'a> {
    /// Space-separated dump of `bytes`.
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            separator: Some(' '),
        }
    }

    /// Dump of at most the first `max` bytes.
    pub fn truncated(bytes: &'a [u8], max: usize) -> Self {
        Self::new(&bytes[..bytes.len().min(max)])
    }

    /// Use `separator` between pairs, or none at all.
    #[must_use]
    pub const fn separated_by(mut self, separator: Option<char>) -> Self {
        self.separator = separator;
        self
    }
}

impl fmt::Display for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use core::fmt::Write;

        for (i, byte) in self.bytes.iter().enumerate() {
            if i > 0 {
                if let Some(sep) = self.separator {
                    f.write_char(sep)?;
                }
            }
            f.write_char(nibble_to_hex(byte >> 4))?;
            f.write_char(nibble_to_hex(byte & 0xf))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use std::format;

    #[test]
    fn test_nibble_to_hex_digits() {
        assert_eq!(nibble_to_hex(0), '0');
        assert_eq!(nibble_to_hex(5), '5');
        assert_eq!(nibble_to_hex(9), '9');
    }

    #[test]
    fn test_nibble_to_hex_letters() {
        assert_eq!(nibble_to_hex(10), 'a');
        assert_eq!(nibble_to_hex(13), 'd');
        assert_eq!(nibble_to_hex(15), 'f');
    }

    #[test]
    fn test_hex_bytes_spaced() {
        assert_eq!(format!("{}", HexBytes::new(&[0x00, 0x22, 0xb9])), "00 22 b9");
    }

    #[test]
    fn test_hex_bytes_empty() {
        assert_eq!(format!("{}", HexBytes::new(&[])), "");
    }

    #[test]
    fn test_hex_bytes_custom_separator() {
        let oui = [0x90, 0xcc, 0x24];
        assert_eq!(
            format!("{}", HexBytes::new(&oui).separated_by(Some('-'))),
            "90-cc-24"
        );
        assert_eq!(format!("{}", HexBytes::new(&oui).separated_by(None)), "90cc24");
    }

    #[test]
    fn test_hex_bytes_truncated() {
        let data = [0xffu8; 32];
        let dump = format!("{}", HexBytes::truncated(&data, 20));
        assert_eq!(dump.split(' ').count(), 20);
        assert_eq!(format!("{}", HexBytes::truncated(&data[..2], 20)), "ff ff");
    }
}
