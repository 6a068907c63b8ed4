//! XML Event Types
//!
//! Event types for pull-parser style XML processing.

use std::borrow::Cow;
use std::fmt;

/// XML parsing event
#[derive(Debug, Clone, PartialEq)]
pub enum XmlEvent<'a> {
    /// Start of an element: `<name attrs...>` or `<name attrs.../>` when `empty`
    StartElement(StartElement<'a>),
    /// End of an element: `</name>`
    EndElement { name: &'a str },
    /// Text content between tags, entities decoded
    Text(Cow<'a, str>),
    /// CDATA section content
    CData(&'a str),
    /// Comment content
    Comment(&'a str),
    /// Processing instruction: `<?target data?>`
    ProcessingInstruction { target: &'a str, data: &'a str },
    /// XML declaration: `<?xml version="1.0"?>`
    XmlDeclaration,
    /// DOCTYPE declaration (raw content, never resolved)
    DocType(&'a str),
}

/// Start element event data
#[derive(Debug, Clone, PartialEq)]
pub struct StartElement<'a> {
    /// Full element name (may include prefix)
    pub name: &'a str,
    pub attributes: Vec<Attribute<'a>>,
    /// True for `<name/>`
    pub empty: bool,
}

impl<'a> StartElement<'a> {
    /// Namespace prefix (before colon), if any
    pub fn prefix(&self) -> Option<&'a str> {
        split_name(self.name).0
    }

    /// Get an attribute value by qualified name
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_ref())
    }
}

/// A parsed attribute with its value entity-decoded
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute<'a> {
    pub name: &'a str,
    pub value: Cow<'a, str>,
}

/// Split a qualified name into (prefix, local name)
#[inline]
pub fn split_name(name: &str) -> (Option<&str>, &str) {
    match memchr::memchr(b':', name.as_bytes()) {
        Some(pos) => (Some(&name[..pos]), &name[pos + 1..]),
        None => (None, name),
    }
}

/// Well-formedness error with the byte offset where it was detected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        ParseError {
            message: message.into(),
            offset,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at byte {}", self.message, self.offset)
    }
}
