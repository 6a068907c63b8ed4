//! Parsed section tree: DOM, section arena and id index.
//!
//! Sections are allocated in pre-order, so "next section in reading order"
//! is the next arena slot and ordering by `SectionRef` is pre-order.

use super::index::DocumentIndex;
use super::node::{SectionNode, SectionRef, ROOT_SECTION};
use super::parser::StructuralParser;
use super::rules::ElementRules;
use crate::dom::{ParseOptions, XmlDocument};
use crate::error::{DomError, SectionError};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::SystemTime;

/// Assigns labels (e.g. "Page", "Chapter") to sections
pub type Labeler = dyn Fn(&SectionTree, SectionRef) -> Vec<String> + Send + Sync;

/// A parsed document. Immutable once built, so it can be shared freely.
#[derive(Debug, Clone)]
pub struct SectionTree {
    document_name: String,
    document_order: u32,
    source_modified: Option<SystemTime>,
    dom: XmlDocument,
    sections: Vec<SectionNode>,
    index: DocumentIndex,
    labels: HashMap<String, Vec<SectionRef>>,
    warnings: Vec<String>,
}

impl SectionTree {
    pub(crate) fn from_parts(
        document_name: &str,
        dom: XmlDocument,
        sections: Vec<SectionNode>,
        index: DocumentIndex,
        warnings: Vec<String>,
    ) -> Self {
        SectionTree {
            document_name: document_name.to_string(),
            document_order: 0,
            source_modified: None,
            dom,
            sections,
            index,
            labels: HashMap::new(),
            warnings,
        }
    }

    /// Parse XML bytes and build the section tree in one step
    pub fn parse(
        document_name: &str,
        input: &[u8],
        rules: &ElementRules,
        options: &ParseOptions,
    ) -> Result<Self, SectionError> {
        let dom = XmlDocument::parse_with_options(input, options)?;
        StructuralParser::new(rules).parse(dom, document_name)
    }

    pub fn with_document_order(mut self, order: u32) -> Self {
        self.document_order = order;
        self
    }

    pub fn with_source_modified(mut self, modified: Option<SystemTime>) -> Self {
        self.source_modified = modified;
        self
    }

    /// Build the label map by asking `labeler` about every section in order
    pub fn with_labels(mut self, labeler: &Labeler) -> Self {
        let mut labels: HashMap<String, Vec<SectionRef>> = HashMap::new();
        for section in self.iter() {
            for label in labeler(&self, section) {
                labels.entry(label).or_default().push(section);
            }
        }
        self.labels = labels;
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn document_name(&self) -> &str {
        &self.document_name
    }

    pub fn document_order(&self) -> u32 {
        self.document_order
    }

    pub fn source_modified(&self) -> Option<SystemTime> {
        self.source_modified
    }

    pub fn dom(&self) -> &XmlDocument {
        &self.dom
    }

    pub fn index(&self) -> &DocumentIndex {
        &self.index
    }

    /// Problems that were logged and skipped during parsing
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn root(&self) -> &SectionNode {
        &self.sections[ROOT_SECTION as usize]
    }

    /// Panics if `section` did not come from this tree
    pub fn node(&self, section: SectionRef) -> &SectionNode {
        &self.sections[section as usize]
    }

    pub fn get(&self, section: SectionRef) -> Option<&SectionNode> {
        self.sections.get(section as usize)
    }

    /// Section by its own id
    pub fn find(&self, id: &str) -> Option<SectionRef> {
        self.index.section(id)
    }

    /// Section by own id or by any anchor id inside its content
    pub fn find_enclosing(&self, id: &str) -> Option<SectionRef> {
        self.index.get(id)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// All sections in pre-order
    pub fn iter(&self) -> impl Iterator<Item = SectionRef> {
        0..self.sections.len() as SectionRef
    }

    /// Deep copy of the section's element as a standalone document
    pub fn extract(&self, section: SectionRef) -> Result<XmlDocument, DomError> {
        let node = self.get(section).ok_or(DomError::InvalidNode(section))?;
        self.dom.extract(node.element)
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Position within the parent's children; 0 for the root
    pub fn index_of(&self, section: SectionRef) -> usize {
        self.node(section).position
    }

    pub fn parent(&self, section: SectionRef) -> Option<SectionRef> {
        self.node(section).parent
    }

    pub fn child(&self, section: SectionRef, n: usize) -> Option<SectionRef> {
        self.node(section).children.get(n).copied()
    }

    pub fn children(&self, section: SectionRef) -> &[SectionRef] {
        &self.node(section).children
    }

    pub fn has_children(&self, section: SectionRef) -> bool {
        self.node(section).has_children()
    }

    pub fn next(&self, section: SectionRef) -> Option<SectionRef> {
        let node = self.node(section);
        self.child(node.parent?, node.position + 1)
    }

    pub fn prev(&self, section: SectionRef) -> Option<SectionRef> {
        let node = self.node(section);
        let position = node.position.checked_sub(1)?;
        self.child(node.parent?, position)
    }

    /// Next sibling, else the nearest ancestor's next sibling
    pub fn following(&self, section: SectionRef) -> Option<SectionRef> {
        let mut current = section;
        loop {
            if let Some(next) = self.next(current) {
                return Some(next);
            }
            current = self.parent(current)?;
        }
    }

    /// Previous sibling, else the nearest ancestor's previous sibling
    pub fn preceding(&self, section: SectionRef) -> Option<SectionRef> {
        let mut current = section;
        loop {
            if let Some(prev) = self.prev(current) {
                return Some(prev);
            }
            current = self.parent(current)?;
        }
    }

    /// Next section in reading order with the given element type
    pub fn following_of_type(&self, section: SectionRef, element_type: &str) -> Option<SectionRef> {
        (section + 1..self.sections.len() as SectionRef)
            .find(|&s| self.node(s).element_type == element_type)
    }

    /// Previous section in reading order with the given element type
    pub fn preceding_of_type(&self, section: SectionRef, element_type: &str) -> Option<SectionRef> {
        (0..section)
            .rev()
            .find(|&s| self.node(s).element_type == element_type)
    }

    pub fn following_same_type(&self, section: SectionRef) -> Option<SectionRef> {
        self.following_of_type(section, self.element_type(section))
    }

    pub fn preceding_same_type(&self, section: SectionRef) -> Option<SectionRef> {
        self.preceding_of_type(section, self.element_type(section))
    }

    /// The section itself or its nearest ancestor with the given element type
    pub fn ancestor_of_type(&self, section: SectionRef, element_type: &str) -> Option<SectionRef> {
        let mut current = Some(section);
        while let Some(s) = current {
            if self.node(s).element_type == element_type {
                return Some(s);
            }
            current = self.parent(s);
        }
        None
    }

    /// True if `other` is a proper descendant of `section`
    pub fn is_ancestor_of(&self, section: SectionRef, other: SectionRef) -> bool {
        let mut current = self.parent(other);
        while let Some(s) = current {
            if s == section {
                return true;
            }
            current = self.parent(s);
        }
        false
    }

    /// Path from the root to `section`, dropping `strip_start` entries from
    /// the front and `strip_end` from the back
    pub fn breadcrumbs(&self, section: SectionRef, strip_start: usize, strip_end: usize) -> Vec<SectionRef> {
        let mut path = vec![section];
        let mut current = section;
        while let Some(parent) = self.parent(current) {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        let end = path.len().saturating_sub(strip_end);
        let start = strip_start.min(end);
        path[start..end].to_vec()
    }

    /// The section and its siblings; the root is its own only sibling
    pub fn siblings(&self, section: SectionRef) -> Vec<SectionRef> {
        match self.parent(section) {
            Some(parent) => self.children(parent).to_vec(),
            None => vec![section],
        }
    }

    /// 1-based outline number over the last `depth` levels, e.g. "2.1.3"
    pub fn numbering(&self, section: SectionRef, depth: usize, separator: &str) -> String {
        let mut parts = vec![(self.index_of(section) + 1).to_string()];
        let mut current = section;
        for _ in 1..depth {
            match self.parent(current) {
                Some(parent) => {
                    parts.push((self.index_of(parent) + 1).to_string());
                    current = parent;
                }
                None => break,
            }
        }
        parts.reverse();
        parts.join(separator)
    }

    pub fn element_type(&self, section: SectionRef) -> &str {
        &self.node(section).element_type
    }

    // =========================================================================
    // Labels
    // =========================================================================

    /// The `n`th (1-based) section carrying `label`
    pub fn by_label(&self, label: &str, n: usize) -> Option<SectionRef> {
        let n = n.checked_sub(1)?;
        self.labels.get(label)?.get(n).copied()
    }

    pub fn label_count(&self, label: &str) -> usize {
        self.labels.get(label).map_or(0, Vec::len)
    }

    /// 1-based position of `section` among sections carrying `label`
    pub fn label_index(&self, label: &str, section: SectionRef) -> Option<usize> {
        self.labels
            .get(label)?
            .iter()
            .position(|&s| s == section)
            .map(|i| i + 1)
    }
}

/// Order by sort order within a document, by document order across documents
pub fn compare_sections(
    a_tree: &SectionTree,
    a: SectionRef,
    b_tree: &SectionTree,
    b: SectionRef,
) -> Ordering {
    if a_tree.document_name == b_tree.document_name {
        a_tree.node(a).sort_order.cmp(&b_tree.node(b).sort_order)
    } else {
        a_tree
            .document_order
            .cmp(&b_tree.document_order)
            .then_with(|| a_tree.document_name.cmp(&b_tree.document_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::Rule;

    // r
    // ├── a (s)
    // │   ├── a1 (t)
    // │   └── a2 (t)
    // └── b (s)
    //     └── b1 (t)
    fn tree() -> SectionTree {
        let rules = ElementRules::new()
            .with("r", Rule::sections("s"))
            .with("s", Rule::sections("t").with_title("h"))
            .with("t", Rule::leaf().with_title("h"));
        let xml = "<r><s id='a'><h>A</h><t id='a1'/><t id='a2'/></s>\
                   <s id='b'><h>B</h><t id='b1'/></s></r>";
        SectionTree::parse("doc", xml.as_bytes(), &rules, &ParseOptions::default()).unwrap()
    }

    fn id(t: &SectionTree, s: Option<SectionRef>) -> Option<&str> {
        s.map(|s| t.node(s).id.as_str())
    }

    #[test]
    fn test_find_enclosing_resolves_anchors() {
        let rules = ElementRules::new()
            .with("r", Rule::sections("s"))
            .with("s", Rule::leaf());
        let xml = "<r><s id='a'><p id='para'/></s></r>";
        let t = SectionTree::parse("doc", xml.as_bytes(), &rules, &ParseOptions::default()).unwrap();
        assert_eq!(t.find("para"), None);
        assert_eq!(t.find_enclosing("para"), t.find("a"));
        assert_eq!(t.find_enclosing("a"), t.find("a"));
    }

    #[test]
    fn test_siblings_and_positions() {
        let t = tree();
        let a = t.find("a").unwrap();
        let a2 = t.find("a2").unwrap();
        assert_eq!(t.index_of(a2), 1);
        assert_eq!(id(&t, t.next(a)), Some("b"));
        assert_eq!(id(&t, t.prev(a)), None);
        assert_eq!(id(&t, t.child(a, 0)), Some("a1"));
        assert_eq!(t.child(a, 5), None);
        assert_eq!(t.siblings(a2).len(), 2);
        assert_eq!(t.siblings(ROOT_SECTION), vec![ROOT_SECTION]);
    }

    #[test]
    fn test_following_and_preceding() {
        let t = tree();
        let a2 = t.find("a2").unwrap();
        let b = t.find("b").unwrap();
        assert_eq!(id(&t, t.following(a2)), Some("b"));
        assert_eq!(id(&t, t.preceding(b)), Some("a"));
        assert_eq!(t.following(t.find("b1").unwrap()), None);
    }

    #[test]
    fn test_typed_traversal() {
        let t = tree();
        let a2 = t.find("a2").unwrap();
        assert_eq!(id(&t, t.following_same_type(a2)), Some("b1"));
        assert_eq!(id(&t, t.preceding_same_type(a2)), Some("a1"));
        assert_eq!(id(&t, t.following_of_type(a2, "s")), Some("b"));
        assert_eq!(id(&t, t.preceding_of_type(a2, "s")), Some("a"));
        assert_eq!(id(&t, t.ancestor_of_type(a2, "s")), Some("a"));
        assert_eq!(id(&t, t.ancestor_of_type(a2, "t")), Some("a2"));
    }

    #[test]
    fn test_breadcrumbs_and_numbering() {
        let t = tree();
        let b1 = t.find("b1").unwrap();
        let crumbs: Vec<&str> = t
            .breadcrumbs(b1, 1, 0)
            .into_iter()
            .map(|s| t.node(s).id.as_str())
            .collect();
        assert_eq!(crumbs, vec!["b", "b1"]);
        assert!(t.breadcrumbs(b1, 5, 5).is_empty());
        assert_eq!(t.numbering(b1, 2, "."), "2.1");
        assert_eq!(t.numbering(b1, 1, "."), "1");
        assert!(t.is_ancestor_of(t.find("b").unwrap(), b1));
        assert!(!t.is_ancestor_of(b1, b1));
    }

    #[test]
    fn test_labels() {
        let labeler = |tree: &SectionTree, s: SectionRef| {
            if tree.element_type(s) == "t" {
                vec!["Page".to_string()]
            } else {
                Vec::new()
            }
        };
        let t = tree().with_labels(&labeler);
        assert_eq!(t.label_count("Page"), 3);
        assert_eq!(id(&t, t.by_label("Page", 3)), Some("b1"));
        assert_eq!(t.by_label("Page", 0), None);
        assert_eq!(t.label_index("Page", t.find("a2").unwrap()), Some(2));
        assert_eq!(t.label_index("Chapter", ROOT_SECTION), None);
    }

    #[test]
    fn test_compare_sections() {
        let first = tree().with_document_order(0);
        let second = SectionTree::parse(
            "other",
            b"<r/>",
            &ElementRules::new().with("r", Rule::leaf()),
            &ParseOptions::default(),
        )
        .unwrap()
        .with_document_order(1);
        let a = first.find("a").unwrap();
        let b1 = first.find("b1").unwrap();
        assert_eq!(compare_sections(&first, a, &first, b1), Ordering::Less);
        assert_eq!(compare_sections(&second, 0, &first, b1), Ordering::Greater);
    }
}
