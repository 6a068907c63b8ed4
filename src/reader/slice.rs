//! Slice Reader
//!
//! Pull parser over a UTF-8 string slice. Names, comments and CDATA are
//! borrowed from the input; text and attribute values are only copied when
//! they contain entity references.

use super::events::{Attribute, ParseError, StartElement, XmlEvent};
use crate::core::entities::decode_text;
use crate::core::scanner::Scanner;

/// Pull-style XML reader from a string slice
pub struct SliceReader<'a> {
    input: &'a str,
    scanner: Scanner<'a>,
}

impl<'a> SliceReader<'a> {
    pub fn new(input: &'a str) -> Self {
        let input = input.strip_prefix('\u{feff}').unwrap_or(input);
        SliceReader {
            input,
            scanner: Scanner::new(input.as_bytes()),
        }
    }

    /// Current byte offset in the input
    pub fn offset(&self) -> usize {
        self.scanner.position()
    }

    // Only ever called with ASCII-delimited offsets, so the slice is on char boundaries.
    fn text(&self, start: usize, end: usize) -> &'a str {
        &self.input[start..end]
    }

    fn err(&self, message: &str) -> ParseError {
        ParseError::new(message, self.scanner.position())
    }

    /// Get the next XML event, `Ok(None)` at end of input
    pub fn next_event(&mut self) -> Result<Option<XmlEvent<'a>>, ParseError> {
        if self.scanner.is_eof() {
            return Ok(None);
        }

        if self.scanner.peek() != Some(b'<') {
            let start = self.scanner.position();
            let end = self.scanner.find_byte(b'<').unwrap_or(self.input.len());
            self.scanner.advance(end - start);
            return Ok(Some(XmlEvent::Text(decode_text(self.text(start, end)))));
        }

        if self.scanner.starts_with(b"<!--") {
            self.scanner.advance(4);
            let start = self.scanner.position();
            let end = self
                .scanner
                .find_seq(b"-->")
                .ok_or_else(|| self.err("Unterminated comment"))?;
            self.scanner.advance(end - start + 3);
            return Ok(Some(XmlEvent::Comment(self.text(start, end))));
        }

        if self.scanner.starts_with(b"<![CDATA[") {
            self.scanner.advance(9);
            let start = self.scanner.position();
            let end = self
                .scanner
                .find_seq(b"]]>")
                .ok_or_else(|| self.err("Unterminated CDATA section"))?;
            self.scanner.advance(end - start + 3);
            return Ok(Some(XmlEvent::CData(self.text(start, end))));
        }

        if self.scanner.starts_with(b"<!DOCTYPE") {
            return self.read_doctype().map(Some);
        }

        if self.scanner.starts_with(b"<?") {
            return self.read_processing_instruction().map(Some);
        }

        if self.scanner.starts_with(b"</") {
            self.scanner.advance(2);
            let name = self
                .scanner
                .read_name()
                .ok_or_else(|| self.err("Expected element name after </"))?;
            self.scanner.skip_whitespace();
            if self.scanner.peek() != Some(b'>') {
                return Err(self.err("Expected > to close end tag"));
            }
            self.scanner.advance(1);
            return Ok(Some(XmlEvent::EndElement {
                name: utf8_name(name),
            }));
        }

        self.read_start_tag().map(Some)
    }

    fn read_start_tag(&mut self) -> Result<XmlEvent<'a>, ParseError> {
        self.scanner.advance(1);
        let name = self
            .scanner
            .read_name()
            .ok_or_else(|| self.err("Expected element name after <"))?;
        let mut attributes = Vec::new();

        loop {
            self.scanner.skip_whitespace();
            match self.scanner.peek() {
                Some(b'>') => {
                    self.scanner.advance(1);
                    return Ok(XmlEvent::StartElement(StartElement {
                        name: utf8_name(name),
                        attributes,
                        empty: false,
                    }));
                }
                Some(b'/') => {
                    self.scanner.advance(1);
                    if self.scanner.peek() != Some(b'>') {
                        return Err(self.err("Expected > after /"));
                    }
                    self.scanner.advance(1);
                    return Ok(XmlEvent::StartElement(StartElement {
                        name: utf8_name(name),
                        attributes,
                        empty: true,
                    }));
                }
                Some(_) => {
                    let attr = self.read_attribute()?;
                    if attributes.iter().any(|a: &Attribute<'_>| a.name == attr.name) {
                        return Err(self.err(&format!("Duplicate attribute: {}", attr.name)));
                    }
                    attributes.push(attr);
                }
                None => return Err(self.err("Unexpected end of input inside tag")),
            }
        }
    }

    fn read_attribute(&mut self) -> Result<Attribute<'a>, ParseError> {
        let name = self
            .scanner
            .read_name()
            .ok_or_else(|| self.err("Expected attribute name"))?;
        self.scanner.skip_whitespace();
        if self.scanner.peek() != Some(b'=') {
            return Err(self.err("Expected = after attribute name"));
        }
        self.scanner.advance(1);
        self.scanner.skip_whitespace();
        let quote = match self.scanner.peek() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => return Err(self.err("Expected quoted attribute value")),
        };
        self.scanner.advance(1);
        let start = self.scanner.position();
        let end = self
            .scanner
            .find_byte(quote)
            .ok_or_else(|| self.err("Unterminated attribute value"))?;
        self.scanner.advance(end - start + 1);
        Ok(Attribute {
            name: utf8_name(name),
            value: decode_text(self.text(start, end)),
        })
    }

    fn read_processing_instruction(&mut self) -> Result<XmlEvent<'a>, ParseError> {
        self.scanner.advance(2);
        let target = self
            .scanner
            .read_name()
            .ok_or_else(|| self.err("Expected processing instruction target"))?;
        let start = self.scanner.position();
        let end = self
            .scanner
            .find_seq(b"?>")
            .ok_or_else(|| self.err("Unterminated processing instruction"))?;
        self.scanner.advance(end - start + 2);
        let target = utf8_name(target);
        if target.eq_ignore_ascii_case("xml") {
            return Ok(XmlEvent::XmlDeclaration);
        }
        Ok(XmlEvent::ProcessingInstruction {
            target,
            data: self.text(start, end).trim(),
        })
    }

    /// Skip a DOCTYPE, including an internal subset in brackets
    fn read_doctype(&mut self) -> Result<XmlEvent<'a>, ParseError> {
        self.scanner.advance(9);
        let start = self.scanner.position();
        let mut depth = 0usize;
        let mut quote: Option<u8> = None;
        while let Some(b) = self.scanner.peek() {
            match (quote, b) {
                (Some(q), _) if b == q => quote = None,
                (Some(_), _) => {}
                (None, b'"' | b'\'') => quote = Some(b),
                (None, b'[') => depth += 1,
                (None, b']') => depth = depth.saturating_sub(1),
                (None, b'>') if depth == 0 => {
                    let end = self.scanner.position();
                    self.scanner.advance(1);
                    return Ok(XmlEvent::DocType(self.text(start, end).trim()));
                }
                _ => {}
            }
            self.scanner.advance(1);
        }
        Err(self.err("Unterminated DOCTYPE"))
    }
}

// Names are cut at ASCII delimiters from a &str, so they are valid UTF-8.
fn utf8_name(bytes: &[u8]) -> &str {
    std::str::from_utf8(bytes).unwrap_or("")
}
