//! Structural parser: DOM plus rule table to section tree.

use super::index::DocumentIndex;
use super::node::{SectionNode, SectionRef, ROOT_SECTION};
use super::rules::{ElementRules, Rule};
use super::tree::SectionTree;
use super::{DEFAULT_ROOT_TITLE, DEFAULT_TITLE, DOCUMENT_ID, GENERATED_ID_PREFIX};
use crate::dom::{NodeId, NodeKind, XmlDocument};
use crate::error::SectionError;

/// Builds a `SectionTree` from a parsed document.
///
/// The id generator and the document-order counter live on the parser and
/// restart with every `parse` call.
pub struct StructuralParser<'r> {
    rules: &'r ElementRules,
    id_serial: u32,
    counter: u32,
}

struct Build {
    dom: XmlDocument,
    sections: Vec<SectionNode>,
    index: DocumentIndex,
    warnings: Vec<String>,
}

impl<'r> StructuralParser<'r> {
    pub fn new(rules: &'r ElementRules) -> Self {
        StructuralParser {
            rules,
            id_serial: 0,
            counter: 0,
        }
    }

    /// Parse `dom` into a section tree named `document_name`. Elements
    /// without an `id` that become sections get a generated one, written
    /// back onto the DOM.
    pub fn parse(&mut self, dom: XmlDocument, document_name: &str) -> Result<SectionTree, SectionError> {
        self.id_serial = 0;
        self.counter = 0;

        let root_element = dom.root_element_id().ok_or_else(|| SectionError::StructuralParse {
            element: String::new(),
            message: "document has no root element".to_string(),
        })?;
        let root_type = dom.node_local_name(root_element).unwrap_or("").to_string();

        let mut build = Build {
            dom,
            sections: vec![SectionNode::new(
                DOCUMENT_ID.to_string(),
                DEFAULT_ROOT_TITLE,
                root_element,
                &root_type,
                None,
                0,
            )],
            index: DocumentIndex::new(),
            warnings: Vec::new(),
        };

        self.fill_in(&mut build, ROOT_SECTION, root_element)?;
        log::debug!(
            "parsed {}: {} sections, {} ids",
            document_name,
            build.sections.len(),
            build.index.len()
        );

        Ok(SectionTree::from_parts(
            document_name,
            build.dom,
            build.sections,
            build.index,
            build.warnings,
        ))
    }

    fn fill_in(&mut self, build: &mut Build, section: SectionRef, elt: NodeId) -> Result<(), SectionError> {
        let own_id = build.sections[section as usize].id.clone();
        build.index.insert_section(&own_id, section)?;

        let local = build.dom.node_local_name(elt).unwrap_or("").to_string();
        let rules = self.rules;
        let rule: &'r Rule = match rules.get(&local) {
            Some(rule) => rule,
            None => {
                log::error!("Unexpected element type: {}", local);
                build
                    .warnings
                    .push(format!("unexpected element type <{}> in section {}", local, own_id));
                return Ok(());
            }
        };

        let title = rule
            .title_child
            .as_deref()
            .and_then(|name| child_text(&build.dom, elt, name));
        let sub_title = rule
            .sub_title_child
            .as_deref()
            .and_then(|name| child_text(&build.dom, elt, name));
        let class_name = build.dom.get_attribute(elt, "class").map(str::to_string);

        let node = &mut build.sections[section as usize];
        if let Some(title) = title {
            node.title = title;
        }
        if sub_title.is_some() {
            node.sub_title = sub_title;
        }
        if class_name.is_some() {
            node.class_name = class_name;
        }
        node.sort_order = self.counter;
        self.counter += 1;

        // Content anchors resolve to this section until a deeper one claims them
        let anchored: Vec<String> = std::iter::once(elt)
            .chain(build.dom.descendants(elt))
            .filter(|&d| build.dom.node_kind_of(d) == Some(NodeKind::Element))
            .filter_map(|d| build.dom.get_attribute(d, "id"))
            .map(str::to_string)
            .collect();
        for id in &anchored {
            build.index.insert_anchor(id, section);
        }

        let child_type = match &rule.structural_child {
            Some(child_type) => child_type.as_str(),
            None => return Ok(()),
        };
        let matches = build.dom.descendants_named(elt, child_type);

        if !rule.multi_valued {
            if matches.len() != 1 {
                return Err(SectionError::StructuralParse {
                    element: local,
                    message: format!("expected a single <{}>, found {}", child_type, matches.len()),
                });
            }
            return self.fill_in(build, section, matches[0]);
        }

        for child in matches {
            let id = match build.dom.get_attribute(child, "id") {
                Some(id) if !id.is_empty() => id.to_string(),
                _ => {
                    let id = format!("{}{}", GENERATED_ID_PREFIX, self.id_serial);
                    self.id_serial += 1;
                    build.dom.set_attribute(child, "id", &id)?;
                    id
                }
            };
            let child_section = add_child(build, section, id, child);
            self.fill_in(build, child_section, child)?;
        }
        Ok(())
    }
}

fn add_child(build: &mut Build, parent: SectionRef, id: String, element: NodeId) -> SectionRef {
    let element_type = build.dom.node_local_name(element).unwrap_or("").to_string();
    let child = build.sections.len() as SectionRef;
    let position = build.sections[parent as usize].children.len();
    build.sections.push(SectionNode::new(
        id,
        DEFAULT_TITLE,
        element,
        &element_type,
        Some(parent),
        position,
    ));
    build.sections[parent as usize].children.push(child);
    child
}

/// Whitespace-normalized text of the first direct child element named `name`
fn child_text(dom: &XmlDocument, elt: NodeId, name: &str) -> Option<String> {
    dom.child_elements(elt)
        .find(|&c| dom.node_local_name(c) == Some(name))
        .map(|c| normalize_title(&dom.string_value(c)))
}

/// Collapse whitespace runs to single spaces and trim
pub fn normalize_title(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOK: &str = r#"<dtbook xmlns="http://www.daisy.org/z3986/2005/dtbook/">
  <book>
    <doctitle>  A   Book </doctitle>
    <bodymatter>
      <level1 id="ch1" class="chapter">
        <h1>Chapter
          One</h1>
        <covertitle>Intro</covertitle>
        <level2><h2>Part A</h2><p id="anchor-a">text</p></level2>
        <level2 id="ch1b"><h2>Part B</h2></level2>
      </level1>
      <level1><h1>Chapter Two</h1></level1>
    </bodymatter>
  </book>
</dtbook>"#;

    fn parse(xml: &str, rules: &ElementRules) -> Result<SectionTree, SectionError> {
        let dom = XmlDocument::parse_str(xml).unwrap();
        StructuralParser::new(rules).parse(dom, "book")
    }

    #[test]
    fn test_dtbook_structure() {
        let tree = parse(BOOK, &ElementRules::dtbook()).unwrap();
        let root = tree.root();
        assert_eq!(root.id, DOCUMENT_ID);
        assert_eq!(root.title, "A Book");
        assert_eq!(root.element_type, "dtbook");
        assert_eq!(root.children.len(), 2);

        let ch1 = tree.node(root.children[0]);
        assert_eq!(ch1.id, "ch1");
        assert_eq!(ch1.title, "Chapter One");
        assert_eq!(ch1.sub_title.as_deref(), Some("Intro"));
        assert_eq!(ch1.class_name.as_deref(), Some("chapter"));
        assert_eq!(ch1.children.len(), 2);

        let ch2 = tree.node(root.children[1]);
        assert_eq!(ch2.title, "Chapter Two");
        assert!(ch2.sub_title.is_none());
    }

    #[test]
    fn test_generated_ids_written_back() {
        let tree = parse(BOOK, &ElementRules::dtbook()).unwrap();
        let part_a = tree.find("gen0").unwrap();
        let node = tree.node(part_a);
        assert_eq!(node.title, "Part A");
        assert_eq!(tree.dom().get_attribute(node.element, "id"), Some("gen0"));
        assert!(tree.find("gen1").is_some());
    }

    #[test]
    fn test_anchors_resolve_to_enclosing_section() {
        let tree = parse(BOOK, &ElementRules::dtbook()).unwrap();
        let part_a = tree.find("gen0").unwrap();
        assert_eq!(tree.index().get("anchor-a"), Some(part_a));
        assert_eq!(tree.index().section("anchor-a"), None);
        assert_eq!(tree.index().get("ch1b"), tree.find("ch1b"));
    }

    #[test]
    fn test_sort_orders_follow_counter() {
        let rules = ElementRules::new()
            .with("level1", Rule::sections("level2"))
            .with("level2", Rule::leaf());
        let xml = "<level1><level2><p>First p</p><p><em>Second p</em></p></level2>\
                   <level2><p>Third p</p></level2><p>Fourth p</p></level1>";
        let tree = parse(xml, &rules).unwrap();
        let orders: Vec<u32> = tree.iter().map(|s| tree.node(s).sort_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        assert_eq!(tree.root().element_type, "level1");
    }

    #[test]
    fn test_unknown_element_is_a_warning() {
        let tree = parse("<mystery><level1/></mystery>", &ElementRules::dtbook()).unwrap();
        assert_eq!(tree.len(), 1);
        assert!(!tree.root().has_children());
        assert_eq!(tree.root().title, DEFAULT_ROOT_TITLE);
        assert_eq!(tree.warnings().len(), 1);
    }

    #[test]
    fn test_pass_through_requires_single_child() {
        let err = parse("<dtbook><book/><book/></dtbook>", &ElementRules::dtbook()).unwrap_err();
        assert!(matches!(err, SectionError::StructuralParse { element, .. } if element == "dtbook"));
    }

    #[test]
    fn test_duplicate_section_ids() {
        let rules = ElementRules::new()
            .with("r", Rule::sections("s"))
            .with("s", Rule::leaf());
        let err = parse("<r><s id='x'/><s id='x'/></r>", &rules).unwrap_err();
        assert!(matches!(err, SectionError::DuplicateId(id) if id == "x"));
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("\n  a \t b  "), "a b");
        assert_eq!(normalize_title(""), "");
    }
}
