//! XInclude processing
//!
//! Rebuilds a parsed document into a fresh arena, replacing `xi:include`
//! elements as they are met so node ids stay in document order.

use std::path::{Path, PathBuf};

use log::{debug, warn};

use super::namespace::ns;
use super::node::{NodeId, NodeKind, DOCUMENT_NODE};
use super::XmlDocument;
use crate::error::DomError;

/// Maximum nesting of includes inside included documents
const MAX_DEPTH: usize = 16;

/// Resolve every include in `doc`; relative hrefs are taken against `base`
/// (a directory, or the file the document was read from)
pub(crate) fn resolve(doc: &XmlDocument, base: &Path) -> Result<XmlDocument, DomError> {
    let base_dir = if base.is_dir() {
        base.to_path_buf()
    } else {
        base.parent().map(Path::to_path_buf).unwrap_or_default()
    };
    let mut out = XmlDocument::new();
    for child in doc.children(DOCUMENT_NODE) {
        copy(&mut out, DOCUMENT_NODE, doc, child, &base_dir, 0)?;
    }
    Ok(out)
}

fn is_xi(doc: &XmlDocument, id: NodeId, local: &str) -> bool {
    doc.node_namespace_uri(id) == Some(ns::XINCLUDE) && doc.node_local_name(id) == Some(local)
}

fn copy(
    out: &mut XmlDocument,
    parent: NodeId,
    src: &XmlDocument,
    node: NodeId,
    base_dir: &Path,
    depth: usize,
) -> Result<(), DomError> {
    if src.node_kind_of(node) != Some(NodeKind::Element) {
        out.import_subtree(parent, src, node)?;
        return Ok(());
    }
    if is_xi(src, node, "include") {
        return include(out, parent, src, node, base_dir, depth);
    }

    let id = out.append_element(
        parent,
        src.node_name(node).unwrap_or(""),
        src.node_namespace_uri(node),
    )?;
    for attr in src.attributes(node) {
        out.set_attribute_ns(
            id,
            src.strings.get_str(attr.name_id).unwrap_or(""),
            src.strings.get_str(attr.value_id).unwrap_or(""),
            src.strings.get_str(attr.namespace_id).filter(|s| !s.is_empty()),
        )?;
    }
    for child in src.children(node) {
        copy(out, id, src, child, base_dir, depth)?;
    }
    Ok(())
}

fn include(
    out: &mut XmlDocument,
    parent: NodeId,
    src: &XmlDocument,
    node: NodeId,
    base_dir: &Path,
    depth: usize,
) -> Result<(), DomError> {
    let href = src.get_attribute(node, "href").unwrap_or("");
    let fail = |message: String| DomError::XInclude {
        href: href.to_string(),
        message,
    };
    if href.is_empty() {
        return Err(fail("missing href".to_string()));
    }
    if depth >= MAX_DEPTH {
        return Err(fail("includes nested too deeply".to_string()));
    }

    let path: PathBuf = base_dir.join(href);
    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(err) => {
            let fallback = src.child_elements(node).find(|&c| is_xi(src, c, "fallback"));
            return match fallback {
                Some(fb) => {
                    warn!("XInclude of {} failed ({}), using fallback", path.display(), err);
                    for child in src.children(fb) {
                        copy(out, parent, src, child, base_dir, depth)?;
                    }
                    Ok(())
                }
                None => Err(fail(err.to_string())),
            };
        }
    };

    debug!("XInclude {} (depth {})", path.display(), depth);
    match src.get_attribute(node, "parse").unwrap_or("xml") {
        "xml" => {
            let included = XmlDocument::parse(&bytes).map_err(|e| fail(e.to_string()))?;
            let root = included
                .root_element_id()
                .ok_or_else(|| fail("included document is empty".to_string()))?;
            let nested_base = path.parent().unwrap_or(base_dir);
            copy(out, parent, &included, root, nested_base, depth + 1)
        }
        "text" => {
            let text = String::from_utf8(bytes).map_err(|e| fail(e.to_string()))?;
            out.append_text(parent, &text)?;
            Ok(())
        }
        other => Err(fail(format!("unsupported parse mode `{}`", other))),
    }
}
