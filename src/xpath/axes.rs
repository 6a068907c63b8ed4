//! XPath Axes Implementation
//!
//! Node axes return nodes in axis order: document order for forward axes,
//! nearest-first for reverse axes, so predicate positions count the way
//! XPath defines them. Attributes are not arena nodes; the attribute axis
//! yields values (see `attribute_values`) and the namespace axis is empty.

use super::compiler::CompiledNodeTest;
use super::parser::Axis;
use crate::dom::{DocumentAccess, NodeId, NodeKind};

/// Navigate along a node axis from a context node
pub fn navigate<D: DocumentAccess + ?Sized>(doc: &D, context: NodeId, axis: Axis) -> Vec<NodeId> {
    match axis {
        Axis::Child => doc.children_vec(context),
        Axis::Descendant => doc.descendants_vec(context),
        Axis::DescendantOrSelf => {
            let mut result = vec![context];
            result.extend(doc.descendants_vec(context));
            result
        }
        Axis::Parent => doc.parent_of(context).into_iter().collect(),
        Axis::Ancestor => ancestors(doc, context),
        Axis::AncestorOrSelf => {
            let mut result = vec![context];
            result.extend(ancestors(doc, context));
            result
        }
        Axis::FollowingSibling => siblings(doc, context, |d, id| d.next_sibling_of(id)),
        Axis::PrecedingSibling => siblings(doc, context, |d, id| d.prev_sibling_of(id)),
        Axis::Following => following(doc, context),
        Axis::Preceding => preceding(doc, context),
        Axis::Self_ => vec![context],
        Axis::Attribute | Axis::Namespace => Vec::new(),
    }
}

/// Reverse axes count positions from the context node outwards
pub fn is_reverse(axis: Axis) -> bool {
    matches!(
        axis,
        Axis::Ancestor | Axis::AncestorOrSelf | Axis::PrecedingSibling | Axis::Preceding
    )
}

fn ancestors<D: DocumentAccess + ?Sized>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut current = context;
    while let Some(parent) = doc.parent_of(current) {
        result.push(parent);
        current = parent;
    }
    result
}

fn siblings<D, F>(doc: &D, context: NodeId, next: F) -> Vec<NodeId>
where
    D: DocumentAccess + ?Sized,
    F: Fn(&D, NodeId) -> Option<NodeId>,
{
    let mut result = Vec::new();
    let mut sibling = next(doc, context);
    while let Some(id) = sibling {
        result.push(id);
        sibling = next(doc, id);
    }
    result
}

/// All nodes after the context in document order, excluding descendants
fn following<D: DocumentAccess + ?Sized>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut current = Some(context);
    while let Some(id) = current {
        let mut sibling = doc.next_sibling_of(id);
        while let Some(sib) = sibling {
            result.push(sib);
            result.extend(doc.descendants_vec(sib));
            sibling = doc.next_sibling_of(sib);
        }
        current = doc.parent_of(id);
    }
    result
}

/// All nodes before the context, excluding ancestors, nearest first
fn preceding<D: DocumentAccess + ?Sized>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut current = Some(context);
    while let Some(id) = current {
        let mut sibling = doc.prev_sibling_of(id);
        while let Some(sib) = sibling {
            let mut subtree = vec![sib];
            subtree.extend(doc.descendants_vec(sib));
            result.extend(subtree.into_iter().rev());
            sibling = doc.prev_sibling_of(sib);
        }
        current = doc.parent_of(id);
    }
    result
}

/// Check if a node matches a node test
pub fn matches_node_test<D: DocumentAccess + ?Sized>(
    doc: &D,
    node_id: NodeId,
    test: &CompiledNodeTest,
) -> bool {
    let kind = match doc.node_kind_of(node_id) {
        Some(kind) => kind,
        None => return false,
    };

    match test {
        CompiledNodeTest::Any => kind == NodeKind::Element,
        CompiledNodeTest::Name(name) => {
            kind == NodeKind::Element && doc.node_local_name(node_id) == Some(name.as_str())
        }
        CompiledNodeTest::QName { uri, local } => {
            kind == NodeKind::Element
                && doc.node_local_name(node_id) == Some(local.as_str())
                && doc.node_namespace_uri(node_id) == Some(uri.as_str())
        }
        CompiledNodeTest::NamespaceWildcard(uri) => {
            kind == NodeKind::Element && doc.node_namespace_uri(node_id) == Some(uri.as_str())
        }
        CompiledNodeTest::Node => true,
        CompiledNodeTest::Text => kind == NodeKind::Text || kind == NodeKind::CData,
        CompiledNodeTest::Comment => kind == NodeKind::Comment,
        CompiledNodeTest::ProcessingInstruction(target) => {
            kind == NodeKind::ProcessingInstruction
                && target
                    .as_deref()
                    .map_or(true, |t| doc.node_name(node_id) == Some(t))
        }
    }
}

/// Values of the attributes of `node` that match `test`. Namespace
/// declarations are not attributes in the XPath data model.
pub fn attribute_values<D: DocumentAccess + ?Sized>(
    doc: &D,
    node: NodeId,
    test: &CompiledNodeTest,
) -> Vec<String> {
    let strings = doc.strings();
    doc.attributes(node)
        .iter()
        .filter_map(|attr| {
            let name = strings.get_str(attr.name_id)?;
            if name == "xmlns" || name.starts_with("xmlns:") {
                return None;
            }
            let local = crate::reader::split_name(name).1;
            let uri = strings.get_str(attr.namespace_id).unwrap_or("");
            let matched = match test {
                CompiledNodeTest::Any | CompiledNodeTest::Node => true,
                CompiledNodeTest::Name(n) => name == n,
                CompiledNodeTest::QName { uri: u, local: l } => local == l && uri == u,
                CompiledNodeTest::NamespaceWildcard(u) => uri == u,
                _ => false,
            };
            if matched {
                strings.get_str(attr.value_id).map(str::to_string)
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::XmlDocument;

    fn doc(xml: &str) -> XmlDocument {
        XmlDocument::parse_str(xml).unwrap()
    }

    #[test]
    fn test_child_and_descendant_axes() {
        let d = doc("<root><a><b/></a><c/></root>");
        let root = d.root_element_id().unwrap();
        assert_eq!(navigate(&d, root, Axis::Child).len(), 2);
        assert_eq!(navigate(&d, root, Axis::Descendant).len(), 3);
    }

    #[test]
    fn test_ancestor_axis_nearest_first() {
        let d = doc("<root><a><b/></a></root>");
        let root = d.root_element_id().unwrap();
        let a = d.children_vec(root)[0];
        let b = d.children_vec(a)[0];
        assert_eq!(navigate(&d, b, Axis::Ancestor), vec![a, root, 0]);
    }

    #[test]
    fn test_following_and_preceding() {
        let d = doc("<r><a><x/></a><b/><c><y/></c></r>");
        let root = d.root_element_id().unwrap();
        let kids = d.children_vec(root);
        let (a, b, c) = (kids[0], kids[1], kids[2]);
        let x = d.children_vec(a)[0];
        let y = d.children_vec(c)[0];
        assert_eq!(navigate(&d, b, Axis::Following), vec![c, y]);
        assert_eq!(navigate(&d, b, Axis::Preceding), vec![x, a]);
        assert_eq!(navigate(&d, y, Axis::Preceding), vec![b, x, a]);
    }

    #[test]
    fn test_attribute_values_skip_declarations() {
        let d = doc("<r xmlns:x='urn:x' id='a' x:k='v'/>");
        let root = d.root_element_id().unwrap();
        assert_eq!(attribute_values(&d, root, &CompiledNodeTest::Any), vec!["a", "v"]);
        let qname = CompiledNodeTest::QName {
            uri: "urn:x".to_string(),
            local: "k".to_string(),
        };
        assert_eq!(attribute_values(&d, root, &qname), vec!["v"]);
    }
}
