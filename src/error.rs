//! Error types
//!
//! One enum per area, combined into [`Error`] for callers that do not care
//! which layer failed. XPath internals report plain strings and are wrapped
//! here at the boundary.

use std::path::PathBuf;

use thiserror::Error;

/// Failures while building or mutating a DOM
#[derive(Debug, Error)]
pub enum DomError {
    #[error("XML syntax error: {message} (byte {offset})")]
    Syntax { message: String, offset: usize },

    #[error("input is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("malformed document: {0}")]
    Malformed(String),

    #[error("unbound namespace prefix `{0}`")]
    UnboundPrefix(String),

    #[error("XInclude of `{href}` failed: {message}")]
    XInclude { href: String, message: String },

    #[error("node {0} does not exist or has the wrong kind")]
    InvalidNode(u32),
}

impl From<crate::reader::ParseError> for DomError {
    fn from(err: crate::reader::ParseError) -> Self {
        DomError::Syntax {
            message: err.message,
            offset: err.offset,
        }
    }
}

/// Failures while building a section tree
#[derive(Debug, Error)]
pub enum SectionError {
    #[error("structural parse error at <{element}>: {message}")]
    StructuralParse { element: String, message: String },

    #[error("duplicate section id `{0}`")]
    DuplicateId(String),

    #[error("document `{0}` is already loaded")]
    DuplicateDocument(String),

    #[error(transparent)]
    Dom(#[from] DomError),

    #[error("cannot read document source: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures while resolving, compiling or running a transform
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("cannot configure transform `{name}`: {message}")]
    Configuration { name: String, message: String },

    #[error("transform `{name}` failed: {message}")]
    Execution { name: String, message: String },

    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("invalid XPath `{expression}`: {message}")]
    XPathSyntax { expression: String, message: String },

    #[error("transform `{0}` is already registered")]
    DuplicateTransform(String),

    #[error("no document named `{0}`")]
    UnknownDocument(String),

    #[error("no section `{section}` in document `{document}`")]
    UnknownSection { document: String, section: String },

    #[error(transparent)]
    Dom(#[from] DomError),
}

impl TransformError {
    pub fn configuration(name: impl Into<String>, message: impl Into<String>) -> Self {
        TransformError::Configuration {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn execution(name: impl Into<String>, message: impl Into<String>) -> Self {
        TransformError::Execution {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Failures while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for `{key}`: {message}")]
    Invalid { key: String, message: String },
}

/// Any error produced by this crate
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Dom(#[from] DomError),

    #[error(transparent)]
    Section(#[from] SectionError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_conversion() {
        let err: DomError = crate::reader::ParseError::new("Expected >", 7).into();
        assert_eq!(err.to_string(), "XML syntax error: Expected > (byte 7)");
    }

    #[test]
    fn test_combined_error_is_transparent() {
        let err: Error = TransformError::ResourceNotFound("book.xsl".into()).into();
        assert_eq!(err.to_string(), "resource not found: book.xsl");
    }
}
