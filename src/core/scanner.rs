//! SIMD-accelerated XML scanning using memchr
//!
//! Byte cursor over the raw input. Delimiter searches go through memchr so
//! long text runs and comment bodies are skipped in bulk.

use memchr::{memchr, memmem};

/// Scanner for XML delimiter detection
pub struct Scanner<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    /// Create a new scanner for the given input
    #[inline]
    pub fn new(input: &'a [u8]) -> Self {
        Scanner { input, pos: 0 }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Get remaining bytes
    #[inline]
    pub fn remaining(&self) -> &'a [u8] {
        &self.input[self.pos..]
    }

    /// Peek at current byte without advancing
    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    #[inline]
    pub fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    #[inline]
    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.remaining().starts_with(prefix)
    }

    /// Skip whitespace characters (space, tab, newline, carriage return)
    #[inline]
    pub fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.peek() {
            self.pos += 1;
        }
    }

    /// Absolute position of the next occurrence of `byte`
    #[inline]
    pub fn find_byte(&self, byte: u8) -> Option<usize> {
        memchr(byte, self.remaining()).map(|i| self.pos + i)
    }

    /// Absolute position of the next occurrence of `needle`
    #[inline]
    pub fn find_seq(&self, needle: &[u8]) -> Option<usize> {
        memmem::find(self.remaining(), needle).map(|i| self.pos + i)
    }

    /// Consume an XML name and return it, or None if no name starts here
    pub fn read_name(&mut self) -> Option<&'a [u8]> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if is_name_byte(b) {
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.pos == start {
            None
        } else {
            Some(&self.input[start..self.pos])
        }
    }
}

/// Name bytes: ASCII name characters plus any non-ASCII byte (UTF-8 continuation)
#[inline]
pub fn is_name_byte(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' | b'.' | b':') || b >= 0x80
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_byte() {
        let scanner = Scanner::new(b"hello<world");
        assert_eq!(scanner.find_byte(b'<'), Some(5));
    }

    #[test]
    fn test_read_name_stops_at_delimiter() {
        let mut scanner = Scanner::new(b"dtb:level1 id='x'");
        assert_eq!(scanner.read_name(), Some(&b"dtb:level1"[..]));
        scanner.skip_whitespace();
        assert!(scanner.starts_with(b"id="));
    }

    #[test]
    fn test_find_seq() {
        let scanner = Scanner::new(b"<!-- a -- b -->tail");
        assert_eq!(scanner.find_seq(b"-->"), Some(12));
    }
}
