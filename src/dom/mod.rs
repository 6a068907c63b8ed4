//! DOM Module - Arena-based XML Document
//!
//! Implements an owned, mutable DOM representation using:
//! - Arena allocation for nodes
//! - NodeId (u32) indices for cache-friendly traversal
//! - String interning for names and text
//! - Namespace resolution stack during parsing

pub mod document;
pub mod namespace;
pub mod node;
pub mod serialize;
pub mod strings;
pub mod xinclude;

pub use document::{ParseOptions, XmlDocument};
pub use namespace::{ns, NamespaceContext};
pub use node::{NodeId, NodeKind, XmlAttribute, XmlNode, DOCUMENT_NODE};
pub use serialize::{serialize, serialize_inner};
pub use strings::StringPool;

/// Read access to an arena document, the surface XPath evaluates against
pub trait DocumentAccess {
    /// Get root element ID
    fn root_element_id(&self) -> Option<NodeId>;

    fn document_node_id(&self) -> NodeId {
        DOCUMENT_NODE
    }

    fn get_node(&self, id: NodeId) -> Option<&XmlNode>;

    fn node_kind_of(&self, id: NodeId) -> Option<NodeKind> {
        self.get_node(id).map(|n| n.kind)
    }

    fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.parent
    }

    fn next_sibling_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.next_sibling
    }

    fn prev_sibling_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.prev_sibling
    }

    /// Qualified name of an element or PI target
    fn node_name(&self, id: NodeId) -> Option<&str>;

    /// Get node local name (without prefix)
    fn node_local_name(&self, id: NodeId) -> Option<&str> {
        self.node_name(id).map(|name| crate::reader::split_name(name).1)
    }

    fn node_namespace_uri(&self, id: NodeId) -> Option<&str>;

    /// Content of a text, CDATA or comment node
    fn text_content(&self, id: NodeId) -> Option<&str>;

    fn processing_instruction_data(&self, id: NodeId) -> Option<&str>;

    fn attributes(&self, id: NodeId) -> &[XmlAttribute];

    fn get_attribute(&self, node_id: NodeId, name: &str) -> Option<&str> {
        let strings = self.strings();
        self.attributes(node_id)
            .iter()
            .find(|attr| strings.get_str(attr.name_id) == Some(name))
            .and_then(|attr| strings.get_str(attr.value_id))
    }

    /// Get all attribute names and values
    fn get_attribute_values(&self, node_id: NodeId) -> Vec<(&str, &str)> {
        let strings = self.strings();
        self.attributes(node_id)
            .iter()
            .filter_map(|attr| Some((strings.get_str(attr.name_id)?, strings.get_str(attr.value_id)?)))
            .collect()
    }

    /// Get the string pool for direct access
    fn strings(&self) -> &StringPool;

    /// Children as a collected Vec for trait object compatibility
    fn children_vec(&self, id: NodeId) -> Vec<NodeId>;

    /// Descendants (document order, excluding `id`) as a collected Vec
    fn descendants_vec(&self, id: NodeId) -> Vec<NodeId>;
}

/// XPath string-value of a node: concatenated descendant text for elements
/// and the document, own content for everything else
pub fn node_string_value<D: DocumentAccess + ?Sized>(doc: &D, id: NodeId) -> String {
    match doc.node_kind_of(id) {
        Some(NodeKind::Document) | Some(NodeKind::Element) => {
            let mut out = String::new();
            for d in doc.descendants_vec(id) {
                if matches!(doc.node_kind_of(d), Some(NodeKind::Text | NodeKind::CData)) {
                    if let Some(text) = doc.text_content(d) {
                        out.push_str(text);
                    }
                }
            }
            out
        }
        Some(NodeKind::Text | NodeKind::CData | NodeKind::Comment) => {
            doc.text_content(id).unwrap_or_default().to_string()
        }
        Some(NodeKind::ProcessingInstruction) => doc
            .processing_instruction_data(id)
            .unwrap_or_default()
            .to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_value_skips_comments() {
        let doc = XmlDocument::parse(b"<p>First <!-- c --><em>p</em></p>").unwrap();
        let root = doc.root_element_id().unwrap();
        assert_eq!(node_string_value(&doc, root), "First p");
        assert_eq!(node_string_value(&doc, DOCUMENT_NODE), "First p");
    }

    #[test]
    fn test_trait_defaults() {
        let doc = XmlDocument::parse(b"<a:r xmlns:a='urn:a' k='v'><c/></a:r>").unwrap();
        let access: &dyn DocumentAccess = &doc;
        let root = access.root_element_id().unwrap();
        assert_eq!(access.node_local_name(root), Some("r"));
        assert_eq!(access.get_attribute(root, "k"), Some("v"));
        assert_eq!(access.children_vec(root).len(), 1);
        assert_eq!(access.parent_of(root), Some(access.document_node_id()));
    }
}
