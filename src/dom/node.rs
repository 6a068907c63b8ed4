//! XML Node representation
//!
//! Uses NodeId (u32) for compact, cache-friendly node references.

/// Compact node identifier (index into arena)
pub type NodeId = u32;

/// The document node is always the first arena slot
pub const DOCUMENT_NODE: NodeId = 0;

/// Type of XML node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Document root
    Document,
    Element,
    Text,
    CData,
    Comment,
    ProcessingInstruction,
}

/// An XML node in the arena
#[derive(Debug, Clone)]
pub struct XmlNode {
    pub kind: NodeKind,
    /// Parent node (None for the document node and detached nodes)
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub prev_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    /// String id of the qualified name (elements, PI targets) or the content (text, comments)
    pub name_id: u32,
    /// String id of the resolved namespace URI, or 0
    pub namespace_id: u32,
    /// PI data for processing instructions, 0 otherwise
    pub data_id: u32,
    /// Start of attributes in the attribute arena (elements)
    pub attr_start: u32,
    pub attr_count: u16,
}

impl XmlNode {
    pub fn new(kind: NodeKind, name_id: u32, parent: Option<NodeId>) -> Self {
        XmlNode {
            kind,
            parent,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            name_id,
            namespace_id: 0,
            data_id: 0,
            attr_start: 0,
            attr_count: 0,
        }
    }

    pub fn document() -> Self {
        Self::new(NodeKind::Document, 0, None)
    }

    #[inline]
    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    #[inline]
    pub fn has_children(&self) -> bool {
        self.first_child.is_some()
    }
}

/// Stored attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XmlAttribute {
    /// Qualified attribute name
    pub name_id: u32,
    pub value_id: u32,
    /// Resolved namespace URI for prefixed attributes, or 0
    pub namespace_id: u32,
}

impl XmlAttribute {
    pub fn new(name_id: u32, value_id: u32) -> Self {
        XmlAttribute {
            name_id,
            value_id,
            namespace_id: 0,
        }
    }
}
