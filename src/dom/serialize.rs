//! XML serialization
//!
//! Iterative with an explicit stack so deep documents cannot overflow the
//! call stack. Subtrees cut out of a larger document may rely on namespace
//! declarations made by ancestors they no longer have; the writer tracks the
//! bindings it has emitted and adds the missing `xmlns` attributes.

use super::node::{NodeId, NodeKind};
use super::DocumentAccess;
use crate::core::entities::{escape_attr, escape_text};
use crate::reader::split_name;

/// Serialize a node and its subtree (outer XML)
pub fn serialize<D: DocumentAccess + ?Sized>(doc: &D, node_id: NodeId) -> String {
    let mut writer = Writer::default();
    writer.write(doc, node_id);
    writer.buf
}

/// Serialize only the children of a node
pub fn serialize_inner<D: DocumentAccess + ?Sized>(doc: &D, node_id: NodeId) -> String {
    let mut writer = Writer::default();
    for child in doc.children_vec(node_id) {
        writer.write(doc, child);
    }
    writer.buf
}

enum StackEntry {
    Enter(NodeId),
    /// Closing tag plus the binding count to restore
    Close(NodeId, usize),
}

#[derive(Default)]
struct Writer {
    buf: String,
    /// (prefix, uri) bindings in effect; empty prefix is the default namespace
    bindings: Vec<(String, String)>,
}

impl Writer {
    fn lookup(&self, prefix: &str) -> &str {
        self.bindings
            .iter()
            .rev()
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
            .unwrap_or("")
    }

    fn write<D: DocumentAccess + ?Sized>(&mut self, doc: &D, node_id: NodeId) {
        let mut stack = vec![StackEntry::Enter(node_id)];

        while let Some(entry) = stack.pop() {
            match entry {
                StackEntry::Close(id, depth) => {
                    self.buf.push_str("</");
                    self.buf.push_str(doc.node_name(id).unwrap_or(""));
                    self.buf.push('>');
                    self.bindings.truncate(depth);
                }
                StackEntry::Enter(current_id) => {
                    let node = match doc.get_node(current_id) {
                        Some(n) => n,
                        None => continue,
                    };

                    match node.kind {
                        NodeKind::Element => {
                            let depth = self.bindings.len();
                            self.open_tag(doc, current_id);
                            if node.first_child.is_none() {
                                self.buf.push_str("/>");
                                self.bindings.truncate(depth);
                            } else {
                                self.buf.push('>');
                                stack.push(StackEntry::Close(current_id, depth));
                                let mut child_id = node.last_child;
                                while let Some(cid) = child_id {
                                    stack.push(StackEntry::Enter(cid));
                                    child_id = doc.get_node(cid).and_then(|n| n.prev_sibling);
                                }
                            }
                        }
                        NodeKind::Text => {
                            let content = doc.text_content(current_id).unwrap_or("");
                            self.buf.push_str(&escape_text(content));
                        }
                        NodeKind::CData => {
                            self.buf.push_str("<![CDATA[");
                            self.buf.push_str(doc.text_content(current_id).unwrap_or(""));
                            self.buf.push_str("]]>");
                        }
                        NodeKind::Comment => {
                            self.buf.push_str("<!--");
                            self.buf.push_str(doc.text_content(current_id).unwrap_or(""));
                            self.buf.push_str("-->");
                        }
                        NodeKind::ProcessingInstruction => {
                            self.buf.push_str("<?");
                            self.buf.push_str(doc.node_name(current_id).unwrap_or(""));
                            let data = doc.processing_instruction_data(current_id).unwrap_or("");
                            if !data.is_empty() {
                                self.buf.push(' ');
                                self.buf.push_str(data);
                            }
                            self.buf.push_str("?>");
                        }
                        NodeKind::Document => {
                            let mut child_id = node.last_child;
                            while let Some(cid) = child_id {
                                stack.push(StackEntry::Enter(cid));
                                child_id = doc.get_node(cid).and_then(|n| n.prev_sibling);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Write `<name attrs...` including any namespace declarations the
    /// output needs, leaving the tag open
    fn open_tag<D: DocumentAccess + ?Sized>(&mut self, doc: &D, id: NodeId) {
        let name = doc.node_name(id).unwrap_or("");
        self.buf.push('<');
        self.buf.push_str(name);

        let strings = doc.strings();
        let attrs = doc.attributes(id);

        // Declarations written by the document itself
        for attr in attrs {
            let attr_name = strings.get_str(attr.name_id).unwrap_or("");
            let value = strings.get_str(attr.value_id).unwrap_or("");
            if attr_name == "xmlns" {
                self.bindings.push((String::new(), value.to_string()));
            } else if let Some(prefix) = attr_name.strip_prefix("xmlns:") {
                self.bindings.push((prefix.to_string(), value.to_string()));
            }
        }

        let prefix = split_name(name).0.unwrap_or("");
        let uri = doc.node_namespace_uri(id).unwrap_or("");
        self.ensure_binding(prefix, uri);

        for attr in attrs {
            let attr_name = strings.get_str(attr.name_id).unwrap_or("");
            if let (Some(attr_prefix), _) = split_name(attr_name) {
                if attr_prefix != "xmlns" && attr_prefix != "xml" {
                    let attr_uri = strings.get_str(attr.namespace_id).unwrap_or("");
                    self.ensure_binding(attr_prefix, attr_uri);
                }
            }
        }

        for attr in attrs {
            self.buf.push(' ');
            self.buf.push_str(strings.get_str(attr.name_id).unwrap_or(""));
            self.buf.push_str("=\"");
            self.buf
                .push_str(&escape_attr(strings.get_str(attr.value_id).unwrap_or("")));
            self.buf.push('"');
        }
    }

    fn ensure_binding(&mut self, prefix: &str, uri: &str) {
        if self.lookup(prefix) == uri || (!prefix.is_empty() && uri.is_empty()) {
            return;
        }
        self.buf.push_str(" xmlns");
        if !prefix.is_empty() {
            self.buf.push(':');
            self.buf.push_str(prefix);
        }
        self.buf.push_str("=\"");
        self.buf.push_str(&escape_attr(uri));
        self.buf.push('"');
        self.bindings.push((prefix.to_string(), uri.to_string()));
    }
}
