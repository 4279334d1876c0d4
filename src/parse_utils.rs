//! Position-tracked lexical cursor over query text.

use crate::errors::{Error, Result};
use crate::patterns::nucleotide_code;

/// A cursor over the raw bytes of a query string.
///
/// The cursor tracks the absolute byte offset plus the line and column, so
/// parse failures can point at the exact spot in the input.
pub struct Cursor<'a> {
    input: &'a [u8],
    index: usize,
    line: u32,
    column: u32,
}

impl<'a> Cursor<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            index: 0,
            line: 1,
            column: 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.index >= self.input.len()
    }

    /// Absolute byte offset of the next unconsumed character.
    pub fn offset(&self) -> usize {
        self.index
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.index).copied()
    }

    pub fn advance(&mut self) {
        if let Some(&c) = self.input.get(self.index) {
            if c == b'\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.index += 1;
    }

    /// The input consumed since `start`, as text.
    pub fn slice_from(&self, start: usize) -> &'a str {
        std::str::from_utf8(&self.input[start..self.index]).unwrap_or("")
    }

    /// Parse a decimal integer. Fails if no digits are consumed.
    pub fn parse_int(&mut self) -> Result<u32> {
        let start = self.index;
        let mut accumulator: u32 = 0;
        while let Some(c @ b'0'..=b'9') = self.peek() {
            accumulator = accumulator
                .checked_mul(10)
                .and_then(|a| a.checked_add((c - b'0') as u32))
                .ok_or_else(|| Error::parse(start, "Integer is too large."))?;
            self.advance();
        }
        if start == self.index {
            return Err(Error::parse(start, "Expected integer."));
        }
        Ok(accumulator)
    }

    /// Parse a floating point literal using the standard library parser.
    /// Fails if no characters are consumed.
    pub fn parse_double(&mut self) -> Result<f64> {
        let start = self.index;
        if matches!(self.peek(), Some(b'+') | Some(b'-')) {
            self.advance();
        }
        while let Some(b'0'..=b'9') = self.peek() {
            self.advance();
        }
        if self.peek() == Some(b'.') {
            self.advance();
            while let Some(b'0'..=b'9') = self.peek() {
                self.advance();
            }
        }
        if matches!(self.peek(), Some(b'e') | Some(b'E')) {
            self.advance();
            if matches!(self.peek(), Some(b'+') | Some(b'-')) {
                self.advance();
            }
            while let Some(b'0'..=b'9') = self.peek() {
                self.advance();
            }
        }
        self.slice_from(start)
            .parse::<f64>()
            .map_err(|_| Error::parse(start, "Expected floating point number."))
    }

    /// Parse a non-empty run of characters drawn from `chars`, or, when
    /// `reject` is set, a run of characters *not* in `chars`.
    pub fn parse_str(&mut self, chars: &str, reject: bool) -> Result<&'a str> {
        let start = self.index;
        while let Some(c) = self.peek() {
            if chars.as_bytes().contains(&c) == reject {
                break;
            }
            self.advance();
        }
        if start == self.index {
            return Err(Error::parse(start, "Unexpected character."));
        }
        Ok(self.slice_from(start))
    }

    /// Skip whitespace and `#`-to-end-of-line comments. Returns whether
    /// anything was consumed.
    pub fn parse_space(&mut self) -> bool {
        let start = self.index;
        loop {
            let mut again = false;
            while matches!(self.peek(), Some(c) if c.is_ascii_whitespace()) {
                self.advance();
            }
            if self.peek() == Some(b'#') {
                while matches!(self.peek(), Some(c) if c != b'\n' && c != b'\r') {
                    self.advance();
                }
                again = true;
            }
            if !again {
                break;
            }
        }
        start != self.index
    }

    /// Require a single character, skipping any surrounding whitespace.
    pub fn parse_char_in_space(&mut self, c: char) -> Result<()> {
        self.parse_space();
        if self.peek() != Some(c as u8) {
            return Err(Error::parse(self.index, format!("Expected `{c}'.")));
        }
        self.advance();
        self.parse_space();
        Ok(())
    }

    /// Match a fixed keyword, but only when it is not immediately followed
    /// by an alphanumeric character, so `true` never matches inside `truex`.
    pub fn parse_keyword(&mut self, keyword: &str) -> bool {
        let bytes = keyword.as_bytes();
        if self.input[self.index..].len() < bytes.len()
            || &self.input[self.index..self.index + bytes.len()] != bytes
        {
            return false;
        }
        if let Some(&c) = self.input.get(self.index + bytes.len()) {
            if c.is_ascii_alphanumeric() {
                return false;
            }
        }
        for _ in 0..bytes.len() {
            self.advance();
        }
        true
    }

    /// Consume one character and interpret it as an IUPAC nucleotide code,
    /// returning its degenerate base bitmask (0 for an invalid code).
    pub fn parse_nucleotide(&mut self) -> u8 {
        let Some(c) = self.peek() else {
            return 0;
        };
        self.advance();
        nucleotide_code(c)
    }
}
