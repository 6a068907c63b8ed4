//! DOM transforms
//!
//! A `Transform` maps a standalone document (a cloned section element as
//! its root) to another document, or to nothing. Variants:
//! - `TransformChain`: sub-transforms in order, stopping at the first `None`
//! - `ElementFilterTransform`: keeps only the nodes an XPath selects
//! - `StylesheetTransform`: runs a compiled stylesheet, recompiling when
//!   its files change

pub mod chain;
pub mod filter;
pub mod lite;
pub mod registry;
pub mod resolver;
pub mod stylesheet;

pub use chain::TransformChain;
pub use filter::ElementFilterTransform;
pub use lite::LiteEngine;
pub use registry::TransformRegistry;
pub use resolver::ResourceResolver;
pub use stylesheet::{StylesheetEngine, StylesheetTransform, StylesheetTransformer, Templates};

use crate::dom::XmlDocument;
use crate::error::TransformError;
use crate::xpath::XPathValue;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::time::SystemTime;

/// A DOM-to-DOM transformation with a freshness timestamp
pub trait Transform: Send + Sync {
    /// Transform `input`; `Ok(None)` means the transform produced nothing
    fn apply(
        &self,
        input: XmlDocument,
        params: Option<&TransformParameters>,
    ) -> Result<Option<XmlDocument>, TransformError>;

    /// When the transform's behavior last changed; `None` if it never does
    fn last_modified(&self, params: Option<&TransformParameters>) -> Option<SystemTime>;
}

/// A transform parameter value
#[derive(Debug, Clone)]
pub enum ParamValue {
    String(String),
    Number(f64),
    Bool(bool),
}

impl PartialEq for ParamValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ParamValue::String(a), ParamValue::String(b)) => a == b,
            (ParamValue::Number(a), ParamValue::Number(b)) => a.to_bits() == b.to_bits(),
            (ParamValue::Bool(a), ParamValue::Bool(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ParamValue {}

impl Hash for ParamValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            ParamValue::String(s) => s.hash(state),
            ParamValue::Number(n) => n.to_bits().hash(state),
            ParamValue::Bool(b) => b.hash(state),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::String(s) => f.write_str(s),
            ParamValue::Number(n) => write!(f, "{}", XPathValue::Number(*n).to_string_value()),
            ParamValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::String(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::String(s)
    }
}

impl From<f64> for ParamValue {
    fn from(n: f64) -> Self {
        ParamValue::Number(n)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

impl From<&ParamValue> for XPathValue {
    fn from(value: &ParamValue) -> Self {
        match value {
            ParamValue::String(s) => XPathValue::String(s.clone()),
            ParamValue::Number(n) => XPathValue::Number(*n),
            ParamValue::Bool(b) => XPathValue::Boolean(*b),
        }
    }
}

/// Ordered string-keyed parameters. A key may be present with no value;
/// such entries take part in cache keys but are never handed to a
/// stylesheet engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TransformParameters {
    entries: BTreeMap<String, Option<ParamValue>>,
}

impl TransformParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<ParamValue>) -> &mut Self {
        self.entries.insert(key.to_string(), Some(value.into()));
        self
    }

    pub fn set_null(&mut self, key: &str) -> &mut Self {
        self.entries.insert(key.to_string(), None);
        self
    }

    pub fn with(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// The value for `key`, if present and not null
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.get(key).and_then(Option::as_ref)
    }

    pub fn remove(&mut self, key: &str) -> Option<Option<ParamValue>> {
        self.entries.remove(key)
    }

    /// Entries with a value, in key order
    pub fn non_null(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries
            .iter()
            .filter_map(|(k, v)| v.as_ref().map(|v| (k.as_str(), v)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for TransformParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match value {
                Some(value) => write!(f, "{}={}", key, value)?,
                None => write!(f, "{}=null", key)?,
            }
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_parameters_are_ordered_and_hashable() {
        let a = TransformParameters::new().with("b", 1.0).with("a", "x");
        let mut b = TransformParameters::new();
        b.set("a", "x").set("b", 1.0);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "{a=x, b=1}");

        let mut keys = HashSet::new();
        keys.insert(Some(a.clone()));
        keys.insert(Some(TransformParameters::new()));
        keys.insert(None);
        assert_eq!(keys.len(), 3);
        assert!(keys.contains(&Some(b)));
    }

    #[test]
    fn test_null_entries() {
        let mut params = TransformParameters::new();
        params.set_null("skip").set("keep", true);
        assert!(params.contains_key("skip"));
        assert_eq!(params.get("skip"), None);
        let forwarded: Vec<&str> = params.non_null().map(|(k, _)| k).collect();
        assert_eq!(forwarded, vec!["keep"]);
        assert_ne!(params, TransformParameters::new().with("keep", true));
    }
}
