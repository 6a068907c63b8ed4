//! XPath Value Types
//!
//! XPath 1.0 has four data types: node-set, boolean, number, and string.
//! Attribute steps produce a `StringList`, since attributes are not arena
//! nodes; it behaves like a node-set of attribute nodes in conversions and
//! comparisons.

use crate::dom::{node_string_value, DocumentAccess, NodeId};

/// XPath value types
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum XPathValue {
    /// A set of nodes (document order, no duplicates)
    NodeSet(Vec<NodeId>),
    Boolean(bool),
    Number(f64),
    String(String),
    /// Attribute values in document order
    StringList(Vec<String>),
}

impl XPathValue {
    pub fn single_node(id: NodeId) -> Self {
        XPathValue::NodeSet(vec![id])
    }

    /// boolean() semantics
    pub fn to_boolean(&self) -> bool {
        match self {
            XPathValue::NodeSet(nodes) => !nodes.is_empty(),
            XPathValue::Boolean(b) => *b,
            XPathValue::Number(n) => *n != 0.0 && !n.is_nan(),
            XPathValue::String(s) => !s.is_empty(),
            XPathValue::StringList(list) => !list.is_empty(),
        }
    }

    /// number() semantics for values that need no document
    pub fn to_number(&self) -> f64 {
        match self {
            XPathValue::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            XPathValue::Number(n) => *n,
            _ => parse_number(&self.to_string_value()),
        }
    }

    /// string() semantics for values that need no document. A node-set
    /// yields the empty string here; use `string_in` when one is at hand.
    pub fn to_string_value(&self) -> String {
        match self {
            XPathValue::NodeSet(_) => String::new(),
            XPathValue::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
            XPathValue::Number(n) => format_number(*n),
            XPathValue::String(s) => s.clone(),
            XPathValue::StringList(list) => list.first().cloned().unwrap_or_default(),
        }
    }

    /// string() with node-sets resolved to the first node's string-value
    pub fn string_in<D: DocumentAccess + ?Sized>(&self, doc: &D) -> String {
        match self {
            XPathValue::NodeSet(nodes) => nodes
                .first()
                .map(|&first| node_string_value(doc, first))
                .unwrap_or_default(),
            _ => self.to_string_value(),
        }
    }

    /// number() with node-sets resolved through `string_in`
    pub fn number_in<D: DocumentAccess + ?Sized>(&self, doc: &D) -> f64 {
        match self {
            XPathValue::NodeSet(_) => parse_number(&self.string_in(doc)),
            _ => self.to_number(),
        }
    }

    /// String-values of every member, for node-sets and attribute lists
    pub fn member_strings<D: DocumentAccess + ?Sized>(&self, doc: &D) -> Option<Vec<String>> {
        match self {
            XPathValue::NodeSet(nodes) => {
                Some(nodes.iter().map(|&n| node_string_value(doc, n)).collect())
            }
            XPathValue::StringList(list) => Some(list.clone()),
            _ => None,
        }
    }

    pub fn as_nodeset(&self) -> Option<&Vec<NodeId>> {
        match self {
            XPathValue::NodeSet(nodes) => Some(nodes),
            _ => None,
        }
    }

    /// Consume into a node list; non node-set values give an empty list
    pub fn into_nodes(self) -> Vec<NodeId> {
        match self {
            XPathValue::NodeSet(nodes) => nodes,
            _ => Vec::new(),
        }
    }
}

/// XPath number parsing: surrounding whitespace allowed, anything else NaN
pub fn parse_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty()
        || !trimmed
            .bytes()
            .all(|b| b.is_ascii_digit() || b == b'.' || b == b'-')
    {
        return f64::NAN;
    }
    trimmed.parse().unwrap_or(f64::NAN)
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl Default for XPathValue {
    fn default() -> Self {
        XPathValue::NodeSet(Vec::new())
    }
}

impl From<bool> for XPathValue {
    fn from(b: bool) -> Self {
        XPathValue::Boolean(b)
    }
}

impl From<f64> for XPathValue {
    fn from(n: f64) -> Self {
        XPathValue::Number(n)
    }
}

impl From<String> for XPathValue {
    fn from(s: String) -> Self {
        XPathValue::String(s)
    }
}

impl From<&str> for XPathValue {
    fn from(s: &str) -> Self {
        XPathValue::String(s.to_string())
    }
}

impl From<Vec<NodeId>> for XPathValue {
    fn from(nodes: Vec<NodeId>) -> Self {
        XPathValue::NodeSet(nodes)
    }
}
