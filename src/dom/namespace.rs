//! Namespace Resolution
//!
//! Two pieces: a stack-based resolver used while building a document, and
//! the `NamespaceContext` that binds prefixes for XPath name tests.

use std::collections::BTreeMap;

/// Well-known namespace URIs
pub mod ns {
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";
    pub const XINCLUDE: &str = "http://www.w3.org/2001/XInclude";
    pub const DTBOOK: &str = "http://www.daisy.org/z3986/2005/dtbook/";
    pub const XHTML: &str = "http://www.w3.org/1999/xhtml";
    pub const XSLT: &str = "http://www.w3.org/1999/XSL/Transform";
}

#[derive(Debug, Clone)]
struct NsBinding {
    /// Empty prefix is the default namespace
    prefix: String,
    uri: String,
    depth: u16,
}

/// Stack-based namespace resolver used during tree construction
#[derive(Debug)]
pub struct NamespaceResolver {
    bindings: Vec<NsBinding>,
    depth: u16,
}

impl Default for NamespaceResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespaceResolver {
    /// Create a resolver with the `xml` prefix pre-bound
    pub fn new() -> Self {
        NamespaceResolver {
            bindings: vec![NsBinding {
                prefix: "xml".to_string(),
                uri: ns::XML.to_string(),
                depth: 0,
            }],
            depth: 0,
        }
    }

    pub fn push_scope(&mut self) {
        self.depth += 1;
    }

    /// Leave an element scope, removing any bindings declared in it
    pub fn pop_scope(&mut self) {
        while let Some(binding) = self.bindings.last() {
            if binding.depth < self.depth {
                break;
            }
            self.bindings.pop();
        }
        self.depth = self.depth.saturating_sub(1);
    }

    /// Declare a binding in the current scope; an empty prefix sets the default namespace
    pub fn declare(&mut self, prefix: &str, uri: &str) {
        self.bindings.push(NsBinding {
            prefix: prefix.to_string(),
            uri: uri.to_string(),
            depth: self.depth,
        });
    }

    /// Resolve a prefix (None = default namespace). An empty URI undeclares.
    pub fn resolve(&self, prefix: Option<&str>) -> Option<&str> {
        let prefix = prefix.unwrap_or("");
        self.bindings
            .iter()
            .rev()
            .find(|b| b.prefix == prefix)
            .map(|b| b.uri.as_str())
            .filter(|uri| !uri.is_empty())
    }
}

/// Prefix bindings available to XPath expressions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceContext {
    prefixes: BTreeMap<String, String>,
}

impl Default for NamespaceContext {
    fn default() -> Self {
        let mut ctx = NamespaceContext::empty();
        ctx.bind("dtb", ns::DTBOOK);
        ctx.bind("xhtml", ns::XHTML);
        ctx.bind("xsl", ns::XSLT);
        ctx.bind("xi", ns::XINCLUDE);
        ctx
    }
}

impl NamespaceContext {
    /// A context with only the `xml` prefix
    pub fn empty() -> Self {
        let mut prefixes = BTreeMap::new();
        prefixes.insert("xml".to_string(), ns::XML.to_string());
        NamespaceContext { prefixes }
    }

    pub fn bind(&mut self, prefix: &str, uri: &str) -> &mut Self {
        self.prefixes.insert(prefix.to_string(), uri.to_string());
        self
    }

    pub fn uri_for(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(String::as_str)
    }

    pub fn prefix_for(&self, uri: &str) -> Option<&str> {
        self.prefixes
            .iter()
            .find(|(_, u)| u.as_str() == uri)
            .map(|(p, _)| p.as_str())
    }
}
