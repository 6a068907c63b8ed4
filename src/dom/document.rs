//! XML Document - Arena-based DOM representation
//!
//! Efficient DOM storage with:
//! - Arena allocation for nodes
//! - NodeId indices for traversal
//! - String interning for names and text
//! - A flat attribute arena, one contiguous range per element
//!
//! Documents are owned and mutable so that sections can be cloned out of a
//! parsed tree and handed to transforms. Node ids of a document built by
//! parsing, `extract` or in-order appends follow document order.

use std::path::PathBuf;

use super::namespace::{ns, NamespaceResolver};
use super::node::{NodeId, NodeKind, XmlAttribute, XmlNode, DOCUMENT_NODE};
use super::strings::StringPool;
use super::DocumentAccess;
use crate::error::DomError;
use crate::reader::{split_name, SliceReader, StartElement, XmlEvent};

/// Options applied after the raw parse
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Resolve `xi:include` elements relative to this path
    pub xinclude_base: Option<PathBuf>,
}

/// An XML document stored in arena format
#[derive(Debug, Clone)]
pub struct XmlDocument {
    nodes: Vec<XmlNode>,
    attributes: Vec<XmlAttribute>,
    /// Interned strings
    pub strings: StringPool,
    /// Root element node ID (not document node)
    root_element: Option<NodeId>,
}

impl Default for XmlDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlDocument {
    /// An empty document holding only the document node
    pub fn new() -> Self {
        XmlDocument {
            nodes: vec![XmlNode::document()],
            attributes: Vec::new(),
            strings: StringPool::new(),
            root_element: None,
        }
    }

    /// Parse a UTF-8 encoded XML document
    pub fn parse(input: &[u8]) -> Result<Self, DomError> {
        let text = std::str::from_utf8(input)?;
        Self::parse_str(text)
    }

    pub fn parse_str(input: &str) -> Result<Self, DomError> {
        let mut doc = XmlDocument {
            nodes: Vec::with_capacity(256),
            attributes: Vec::with_capacity(128),
            strings: StringPool::new(),
            root_element: None,
        };
        doc.nodes.push(XmlNode::document());
        doc.build_from_events(input)?;
        Ok(doc)
    }

    /// Parse, then apply XInclude processing if a base is configured
    pub fn parse_with_options(input: &[u8], options: &ParseOptions) -> Result<Self, DomError> {
        let doc = Self::parse(input)?;
        match &options.xinclude_base {
            Some(base) => super::xinclude::resolve(&doc, base),
            None => Ok(doc),
        }
    }

    fn build_from_events(&mut self, input: &str) -> Result<(), DomError> {
        let mut reader = SliceReader::new(input);
        let mut stack: Vec<NodeId> = vec![DOCUMENT_NODE];
        let mut resolver = NamespaceResolver::new();

        while let Some(event) = reader.next_event()? {
            let parent = stack.last().copied().unwrap_or(DOCUMENT_NODE);
            match event {
                XmlEvent::StartElement(elem) => {
                    if parent == DOCUMENT_NODE && self.root_element.is_some() {
                        return Err(DomError::Malformed(format!(
                            "multiple root elements, second is <{}>",
                            elem.name
                        )));
                    }
                    let id = self.handle_element(&elem, parent, &mut resolver)?;
                    if elem.empty {
                        resolver.pop_scope();
                    } else {
                        stack.push(id);
                    }
                }

                XmlEvent::EndElement { name } => {
                    if stack.len() == 1 {
                        return Err(DomError::Malformed(format!(
                            "end tag </{}> without matching start tag",
                            name
                        )));
                    }
                    let open = stack.pop().unwrap_or(DOCUMENT_NODE);
                    let open_name = self.node_name(open).unwrap_or("");
                    if open_name != name {
                        return Err(DomError::Malformed(format!(
                            "tag mismatch: <{}> closed with </{}>",
                            open_name, name
                        )));
                    }
                    resolver.pop_scope();
                }

                XmlEvent::Text(content) => {
                    if parent == DOCUMENT_NODE {
                        if !content.trim().is_empty() {
                            return Err(DomError::Malformed(
                                "text content outside the root element".to_string(),
                            ));
                        }
                        continue;
                    }
                    let text_id = self.strings.intern(&content);
                    self.push_node(XmlNode::new(NodeKind::Text, text_id, Some(parent)));
                }

                XmlEvent::CData(content) => {
                    if parent == DOCUMENT_NODE {
                        return Err(DomError::Malformed(
                            "CDATA section outside the root element".to_string(),
                        ));
                    }
                    let text_id = self.strings.intern(content);
                    self.push_node(XmlNode::new(NodeKind::CData, text_id, Some(parent)));
                }

                XmlEvent::Comment(content) => {
                    let text_id = self.strings.intern(content);
                    self.push_node(XmlNode::new(NodeKind::Comment, text_id, Some(parent)));
                }

                XmlEvent::ProcessingInstruction { target, data } => {
                    let mut node = XmlNode::new(
                        NodeKind::ProcessingInstruction,
                        self.strings.intern(target),
                        Some(parent),
                    );
                    node.data_id = self.strings.intern(data);
                    self.push_node(node);
                }

                // External DTDs are never fetched
                XmlEvent::XmlDeclaration | XmlEvent::DocType(_) => {}
            }
        }

        if stack.len() > 1 {
            let unclosed = stack.get(1).and_then(|&id| self.node_name(id)).unwrap_or("");
            return Err(DomError::Malformed(format!("unclosed tag <{}>", unclosed)));
        }
        if self.root_element.is_none() {
            return Err(DomError::Malformed("no root element".to_string()));
        }
        Ok(())
    }

    /// Create an element node from a start tag, resolving namespaces
    fn handle_element(
        &mut self,
        elem: &StartElement<'_>,
        parent: NodeId,
        resolver: &mut NamespaceResolver,
    ) -> Result<NodeId, DomError> {
        resolver.push_scope();
        for attr in &elem.attributes {
            if attr.name == "xmlns" {
                resolver.declare("", &attr.value);
            } else if let Some(prefix) = attr.name.strip_prefix("xmlns:") {
                resolver.declare(prefix, &attr.value);
            }
        }

        let namespace_id = match elem.prefix() {
            Some(prefix) => {
                let uri = resolver
                    .resolve(Some(prefix))
                    .ok_or_else(|| DomError::UnboundPrefix(prefix.to_string()))?;
                self.strings.intern(uri)
            }
            None => resolver
                .resolve(None)
                .map(|uri| self.strings.intern(uri))
                .unwrap_or(0),
        };

        let mut node = XmlNode::new(NodeKind::Element, self.strings.intern(elem.name), Some(parent));
        node.namespace_id = namespace_id;
        node.attr_start = self.attributes.len() as u32;
        node.attr_count = elem.attributes.len().min(u16::MAX as usize) as u16;

        for attr in elem.attributes.iter().take(u16::MAX as usize) {
            let mut stored = XmlAttribute::new(
                self.strings.intern(attr.name),
                self.strings.intern(&attr.value),
            );
            if let (Some(prefix), _) = split_name(attr.name) {
                if prefix == "xmlns" {
                    stored.namespace_id = self.strings.intern(ns::XMLNS);
                } else {
                    let uri = resolver
                        .resolve(Some(prefix))
                        .ok_or_else(|| DomError::UnboundPrefix(prefix.to_string()))?;
                    stored.namespace_id = self.strings.intern(uri);
                }
            }
            self.attributes.push(stored);
        }

        let id = self.push_node(node);
        if parent == DOCUMENT_NODE {
            self.root_element = Some(id);
        }
        Ok(id)
    }

    /// Add a node to the arena and link it as the last child of its parent
    fn push_node(&mut self, node: XmlNode) -> NodeId {
        let id = self.nodes.len() as NodeId;
        let parent = node.parent;
        self.nodes.push(node);
        if let Some(parent_id) = parent {
            self.link_child(parent_id, id);
        }
        id
    }

    fn link_child(&mut self, parent_id: NodeId, child_id: NodeId) {
        let last_child = self.nodes[parent_id as usize].last_child;
        if let Some(last_id) = last_child {
            self.nodes[child_id as usize].prev_sibling = Some(last_id);
            self.nodes[last_id as usize].next_sibling = Some(child_id);
        } else {
            self.nodes[parent_id as usize].first_child = Some(child_id);
        }
        self.nodes[parent_id as usize].last_child = Some(child_id);
    }

    fn check_container(&self, id: NodeId) -> Result<(), DomError> {
        match self.get_node(id) {
            Some(node) if matches!(node.kind, NodeKind::Document | NodeKind::Element) => Ok(()),
            _ => Err(DomError::InvalidNode(id)),
        }
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Append a new element as the last child of `parent`
    pub fn append_element(
        &mut self,
        parent: NodeId,
        name: &str,
        namespace_uri: Option<&str>,
    ) -> Result<NodeId, DomError> {
        self.check_container(parent)?;
        if parent == DOCUMENT_NODE && self.root_element.is_some() {
            return Err(DomError::Malformed(
                "document already has a root element".to_string(),
            ));
        }
        let mut node = XmlNode::new(NodeKind::Element, self.strings.intern(name), Some(parent));
        node.namespace_id = namespace_uri.map(|uri| self.strings.intern(uri)).unwrap_or(0);
        node.attr_start = self.attributes.len() as u32;
        let id = self.push_node(node);
        if parent == DOCUMENT_NODE {
            self.root_element = Some(id);
        }
        Ok(id)
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> Result<NodeId, DomError> {
        self.append_character_data(parent, NodeKind::Text, text)
    }

    pub fn append_comment(&mut self, parent: NodeId, text: &str) -> Result<NodeId, DomError> {
        self.append_character_data(parent, NodeKind::Comment, text)
    }

    pub fn append_processing_instruction(
        &mut self,
        parent: NodeId,
        target: &str,
        data: &str,
    ) -> Result<NodeId, DomError> {
        self.check_container(parent)?;
        let mut node = XmlNode::new(
            NodeKind::ProcessingInstruction,
            self.strings.intern(target),
            Some(parent),
        );
        node.data_id = self.strings.intern(data);
        Ok(self.push_node(node))
    }

    fn append_character_data(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        text: &str,
    ) -> Result<NodeId, DomError> {
        self.check_container(parent)?;
        if parent == DOCUMENT_NODE && kind != NodeKind::Comment {
            return Err(DomError::Malformed(
                "text content outside the root element".to_string(),
            ));
        }
        let text_id = self.strings.intern(text);
        Ok(self.push_node(XmlNode::new(kind, text_id, Some(parent))))
    }

    /// Set an attribute, replacing the value of an existing one with the same name
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let namespace_uri = match split_name(name).0 {
            Some("xml") => Some(ns::XML),
            Some("xmlns") => Some(ns::XMLNS),
            _ => None,
        };
        self.set_attribute_ns(id, name, value, namespace_uri)
    }

    /// Set an attribute with an explicit namespace URI
    pub fn set_attribute_ns(
        &mut self,
        id: NodeId,
        name: &str,
        value: &str,
        namespace_uri: Option<&str>,
    ) -> Result<(), DomError> {
        let (start, count) = match self.get_node(id) {
            Some(node) if node.is_element() => (node.attr_start as usize, node.attr_count as usize),
            _ => return Err(DomError::InvalidNode(id)),
        };
        let name_id = self.strings.intern(name);
        let value_id = self.strings.intern(value);

        if let Some(existing) = self.attributes[start..start + count]
            .iter_mut()
            .find(|a| a.name_id == name_id)
        {
            existing.value_id = value_id;
            return Ok(());
        }
        if count >= u16::MAX as usize {
            return Err(DomError::Malformed(format!("too many attributes on node {}", id)));
        }

        let mut attr = XmlAttribute::new(name_id, value_id);
        attr.namespace_id = namespace_uri.map(|uri| self.strings.intern(uri)).unwrap_or(0);

        // The element's range must end the arena before it can grow in place
        let mut new_start = start;
        if start + count != self.attributes.len() {
            new_start = self.attributes.len();
            self.attributes.extend_from_within(start..start + count);
        }
        self.attributes.push(attr);

        let node = &mut self.nodes[id as usize];
        node.attr_start = new_start as u32;
        node.attr_count += 1;
        Ok(())
    }

    /// Deep-copy a node from another document and append it under `parent`
    pub fn import_subtree(
        &mut self,
        parent: NodeId,
        src: &XmlDocument,
        src_node: NodeId,
    ) -> Result<NodeId, DomError> {
        let node = src.get_node(src_node).ok_or(DomError::InvalidNode(src_node))?;
        match node.kind {
            NodeKind::Document => Err(DomError::InvalidNode(src_node)),
            NodeKind::Element => {
                let name = src.node_name(src_node).unwrap_or("");
                let id = self.append_element(parent, name, src.node_namespace_uri(src_node))?;
                for attr in src.attributes(src_node) {
                    let attr_name = src.strings.get_str(attr.name_id).unwrap_or("");
                    let attr_value = src.strings.get_str(attr.value_id).unwrap_or("");
                    let attr_ns = src.strings.get_str(attr.namespace_id).filter(|s| !s.is_empty());
                    self.set_attribute_ns(id, attr_name, attr_value, attr_ns)?;
                }
                for child in src.children(src_node) {
                    self.import_subtree(id, src, child)?;
                }
                Ok(id)
            }
            NodeKind::Text | NodeKind::CData | NodeKind::Comment => {
                let text = src.strings.get_str(node.name_id).unwrap_or("");
                self.append_character_data(parent, node.kind, text)
            }
            NodeKind::ProcessingInstruction => {
                let target = src.strings.get_str(node.name_id).unwrap_or("");
                let data = src.strings.get_str(node.data_id).unwrap_or("");
                self.append_processing_instruction(parent, target, data)
            }
        }
    }

    /// Clone the subtree rooted at `node` into a fresh document whose root
    /// element is the clone. Extracting the document node clones everything.
    pub fn extract(&self, node: NodeId) -> Result<XmlDocument, DomError> {
        if node == DOCUMENT_NODE {
            return Ok(self.clone());
        }
        match self.node_kind_of(node) {
            Some(NodeKind::Element) => {
                let mut out = XmlDocument::new();
                out.import_subtree(DOCUMENT_NODE, self, node)?;
                Ok(out)
            }
            _ => Err(DomError::InvalidNode(node)),
        }
    }

    /// Copy only the element itself (name, namespace, attributes) into a new document
    pub fn extract_shallow(&self, node: NodeId) -> Result<XmlDocument, DomError> {
        if self.node_kind_of(node) != Some(NodeKind::Element) {
            return Err(DomError::InvalidNode(node));
        }
        let mut out = XmlDocument::new();
        let root = out.append_element(
            DOCUMENT_NODE,
            self.node_name(node).unwrap_or(""),
            self.node_namespace_uri(node),
        )?;
        for attr in self.attributes(node) {
            out.set_attribute_ns(
                root,
                self.strings.get_str(attr.name_id).unwrap_or(""),
                self.strings.get_str(attr.value_id).unwrap_or(""),
                self.strings.get_str(attr.namespace_id).filter(|s| !s.is_empty()),
            )?;
        }
        Ok(out)
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    pub fn root_element_id(&self) -> Option<NodeId> {
        self.root_element
    }

    pub fn get_node(&self, id: NodeId) -> Option<&XmlNode> {
        self.nodes.get(id as usize)
    }

    pub fn node_kind_of(&self, id: NodeId) -> Option<NodeKind> {
        self.get_node(id).map(|n| n.kind)
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.parent
    }

    pub fn next_sibling_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.next_sibling
    }

    pub fn prev_sibling_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.prev_sibling
    }

    /// Qualified name of an element or PI target
    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        match node.kind {
            NodeKind::Element | NodeKind::ProcessingInstruction => self.strings.get_str(node.name_id),
            _ => None,
        }
    }

    /// Get node local name (without prefix)
    pub fn node_local_name(&self, id: NodeId) -> Option<&str> {
        self.node_name(id).map(|name| split_name(name).1)
    }

    pub fn node_namespace_uri(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        if node.namespace_id == 0 {
            return None;
        }
        self.strings.get_str(node.namespace_id)
    }

    /// Content of a text, CDATA or comment node
    pub fn text_content(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        match node.kind {
            NodeKind::Text | NodeKind::CData | NodeKind::Comment => self.strings.get_str(node.name_id),
            _ => None,
        }
    }

    pub fn processing_instruction_data(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        if node.kind != NodeKind::ProcessingInstruction {
            return None;
        }
        self.strings.get_str(node.data_id)
    }

    /// Concatenated text of all descendant text nodes
    pub fn string_value(&self, id: NodeId) -> String {
        super::node_string_value(self, id)
    }

    pub fn attributes(&self, id: NodeId) -> &[XmlAttribute] {
        match self.get_node(id) {
            Some(node) if node.is_element() => {
                let start = node.attr_start as usize;
                let end = start + node.attr_count as usize;
                self.attributes.get(start..end).unwrap_or(&[])
            }
            _ => &[],
        }
    }

    pub fn get_attribute(&self, node_id: NodeId, name: &str) -> Option<&str> {
        self.attributes(node_id)
            .iter()
            .find(|attr| self.strings.get_str(attr.name_id) == Some(name))
            .and_then(|attr| self.strings.get_str(attr.value_id))
    }

    /// Get all attribute names and values for a node
    pub fn get_attribute_values(&self, node_id: NodeId) -> Vec<(&str, &str)> {
        self.attributes(node_id)
            .iter()
            .filter_map(|attr| {
                let name = self.strings.get_str(attr.name_id)?;
                let value = self.strings.get_str(attr.value_id)?;
                Some((name, value))
            })
            .collect()
    }

    pub fn children(&self, id: NodeId) -> ChildIter<'_> {
        let first = self.get_node(id).and_then(|n| n.first_child);
        ChildIter { doc: self, next: first }
    }

    /// Element children only
    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .filter(move |&child| self.node_kind_of(child) == Some(NodeKind::Element))
    }

    /// Iterate over all descendants of a node in document order (excluding the node)
    pub fn descendants(&self, id: NodeId) -> DescendantIter<'_> {
        let mut stack = Vec::new();
        if let Some(node) = self.get_node(id) {
            let mut child_id = node.last_child;
            while let Some(cid) = child_id {
                stack.push(cid);
                child_id = self.get_node(cid).and_then(|n| n.prev_sibling);
            }
        }
        DescendantIter { doc: self, stack }
    }

    /// Descendant elements with the given local name, in document order
    pub fn descendants_named(&self, id: NodeId, local_name: &str) -> Vec<NodeId> {
        self.descendants(id)
            .filter(|&d| {
                self.node_kind_of(d) == Some(NodeKind::Element)
                    && self.node_local_name(d) == Some(local_name)
            })
            .collect()
    }

    /// Name of the root element, if any
    pub fn root_name(&self) -> Option<&str> {
        self.root_element.and_then(|id| self.node_name(id))
    }
}

/// Iterator over child nodes
pub struct ChildIter<'d> {
    doc: &'d XmlDocument,
    next: Option<NodeId>,
}

impl Iterator for ChildIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.get_node(current).and_then(|n| n.next_sibling);
        Some(current)
    }
}

/// Iterator over descendant nodes (depth-first, document order)
pub struct DescendantIter<'d> {
    doc: &'d XmlDocument,
    stack: Vec<NodeId>,
}

impl Iterator for DescendantIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        if let Some(node) = self.doc.get_node(current) {
            let mut child_id = node.last_child;
            while let Some(id) = child_id {
                self.stack.push(id);
                child_id = self.doc.get_node(id).and_then(|n| n.prev_sibling);
            }
        }
        Some(current)
    }
}

impl DocumentAccess for XmlDocument {
    fn root_element_id(&self) -> Option<NodeId> {
        self.root_element
    }

    fn get_node(&self, id: NodeId) -> Option<&XmlNode> {
        self.nodes.get(id as usize)
    }

    fn node_name(&self, id: NodeId) -> Option<&str> {
        XmlDocument::node_name(self, id)
    }

    fn node_namespace_uri(&self, id: NodeId) -> Option<&str> {
        XmlDocument::node_namespace_uri(self, id)
    }

    fn text_content(&self, id: NodeId) -> Option<&str> {
        XmlDocument::text_content(self, id)
    }

    fn processing_instruction_data(&self, id: NodeId) -> Option<&str> {
        XmlDocument::processing_instruction_data(self, id)
    }

    fn attributes(&self, id: NodeId) -> &[XmlAttribute] {
        XmlDocument::attributes(self, id)
    }

    fn strings(&self) -> &StringPool {
        &self.strings
    }

    fn children_vec(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id).collect()
    }

    fn descendants_vec(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let doc = XmlDocument::parse(b"<root>hello</root>").unwrap();
        let root = doc.root_element_id().unwrap();
        assert_eq!(doc.node_name(root), Some("root"));
        assert_eq!(doc.string_value(root), "hello");
    }

    #[test]
    fn test_descendants_in_document_order() {
        let doc = XmlDocument::parse(b"<root><a/><b><c/></b><d/></root>").unwrap();
        let root = doc.root_element_id().unwrap();
        let names: Vec<_> = doc
            .descendants(root)
            .filter_map(|id| doc.node_name(id))
            .collect();
        assert_eq!(names, ["a", "b", "c", "d"]);
        let ids: Vec<_> = doc.descendants(root).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_siblings() {
        let doc = XmlDocument::parse(b"<root><a/><b/><c/></root>").unwrap();
        let root = doc.root_element_id().unwrap();
        let children: Vec<_> = doc.children(root).collect();
        assert_eq!(children.len(), 3);
        assert_eq!(doc.prev_sibling_of(children[0]), None);
        assert_eq!(doc.next_sibling_of(children[0]), Some(children[1]));
        assert_eq!(doc.parent_of(children[2]), Some(root));
    }

    #[test]
    fn test_well_formedness_errors() {
        assert!(matches!(
            XmlDocument::parse(b"<a><b></a>"),
            Err(DomError::Malformed(_))
        ));
        assert!(matches!(
            XmlDocument::parse(b"<a/><b/>"),
            Err(DomError::Malformed(_))
        ));
        assert!(matches!(
            XmlDocument::parse(b"<a>"),
            Err(DomError::Malformed(_))
        ));
        assert!(matches!(
            XmlDocument::parse(b"<a/>trailing"),
            Err(DomError::Malformed(_))
        ));
        assert!(matches!(
            XmlDocument::parse(b"<x:a/>"),
            Err(DomError::UnboundPrefix(_))
        ));
    }

    #[test]
    fn test_namespaces_resolved() {
        let doc = XmlDocument::parse(
            br#"<dtbook xmlns="http://www.daisy.org/z3986/2005/dtbook/" xmlns:x="urn:x"><x:note x:kind="a"/><p/></dtbook>"#,
        )
        .unwrap();
        let root = doc.root_element_id().unwrap();
        assert_eq!(doc.node_namespace_uri(root), Some(ns::DTBOOK));
        let children: Vec<_> = doc.children(root).collect();
        assert_eq!(doc.node_namespace_uri(children[0]), Some("urn:x"));
        assert_eq!(doc.node_local_name(children[0]), Some("note"));
        assert_eq!(doc.node_namespace_uri(children[1]), Some(ns::DTBOOK));
        let attr = doc.attributes(children[0])[0];
        assert_eq!(doc.strings.get_str(attr.namespace_id), Some("urn:x"));
    }

    #[test]
    fn test_set_attribute_relocates_range() {
        let mut doc = XmlDocument::parse(b"<r><a x='1'/><b y='2'/></r>").unwrap();
        let root = doc.root_element_id().unwrap();
        let a = doc.child_elements(root).next().unwrap();
        doc.set_attribute(a, "id", "gen0").unwrap();
        doc.set_attribute(a, "x", "3").unwrap();
        assert_eq!(doc.get_attribute(a, "id"), Some("gen0"));
        assert_eq!(doc.get_attribute(a, "x"), Some("3"));
        let b = doc.child_elements(root).nth(1).unwrap();
        assert_eq!(doc.get_attribute_values(b), vec![("y", "2")]);
    }

    #[test]
    fn test_extract_clones_subtree() {
        let doc = XmlDocument::parse(b"<r><s id='a'><p>one</p><p>two</p></s><s/></r>").unwrap();
        let root = doc.root_element_id().unwrap();
        let first = doc.child_elements(root).next().unwrap();
        let copy = doc.extract(first).unwrap();
        let copy_root = copy.root_element_id().unwrap();
        assert_eq!(copy.node_name(copy_root), Some("s"));
        assert_eq!(copy.get_attribute(copy_root, "id"), Some("a"));
        assert_eq!(copy.string_value(copy_root), "onetwo");
        assert_eq!(copy.parent_of(copy_root), Some(DOCUMENT_NODE));
    }

    #[test]
    fn test_append_builds_in_order() {
        let mut doc = XmlDocument::new();
        let root = doc.append_element(DOCUMENT_NODE, "level1", None).unwrap();
        let p = doc.append_element(root, "p", None).unwrap();
        doc.append_text(p, "text").unwrap();
        doc.append_comment(root, "note").unwrap();
        doc.append_comment(DOCUMENT_NODE, "trailer").unwrap();
        assert!(doc.append_element(DOCUMENT_NODE, "second", None).is_err());
        assert!(doc.append_text(DOCUMENT_NODE, "stray").is_err());
        assert_eq!(doc.string_value(root), "text");
        assert_eq!(
            crate::dom::serialize(&doc, root),
            "<level1><p>text</p><!--note--></level1>"
        );
    }
}
