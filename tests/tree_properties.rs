//! Structural invariants of parsed section trees over generated documents.

use proptest::prelude::*;
use sectiondom::dom::ParseOptions;
use sectiondom::section::{SectionRef, ROOT_SECTION};
use sectiondom::{ElementRules, SectionTree};
use std::collections::HashSet;

/// level1 sections, each a list of level2 sections holding some level3
/// sections; the flag gives a section an explicit id
type Shape = Vec<(bool, Vec<(bool, Vec<bool>)>)>;

fn shape() -> impl Strategy<Value = Shape> {
    prop::collection::vec(
        (
            any::<bool>(),
            prop::collection::vec((any::<bool>(), prop::collection::vec(any::<bool>(), 0..3)), 0..4),
        ),
        0..5,
    )
}

fn open(xml: &mut String, tag: &str, explicit: bool, serial: &mut usize) {
    *serial += 1;
    if explicit {
        xml.push_str(&format!("<{} id='x{}'>", tag, serial));
    } else {
        xml.push_str(&format!("<{}>", tag));
    }
    xml.push_str(&format!("<h{n}>Title {s}</h{n}><p>text</p>", n = &tag[5..], s = serial));
}

fn render(shape: &Shape) -> String {
    let mut serial = 0;
    let mut xml = String::from("<dtbook><book><doctitle>Book</doctitle><bodymatter>");
    for (explicit, level2s) in shape {
        open(&mut xml, "level1", *explicit, &mut serial);
        for (explicit, level3s) in level2s {
            open(&mut xml, "level2", *explicit, &mut serial);
            for explicit in level3s {
                open(&mut xml, "level3", *explicit, &mut serial);
                xml.push_str("</level3>");
            }
            xml.push_str("</level2>");
        }
        xml.push_str("</level1>");
    }
    xml.push_str("</bodymatter></book></dtbook>");
    xml
}

fn pre_order(tree: &SectionTree, section: SectionRef, out: &mut Vec<SectionRef>) {
    out.push(section);
    for &child in tree.children(section) {
        pre_order(tree, child, out);
    }
}

fn count(shape: &Shape) -> usize {
    1 + shape
        .iter()
        .map(|(_, level2s)| 1 + level2s.iter().map(|(_, l3)| 1 + l3.len()).sum::<usize>())
        .sum::<usize>()
}

proptest! {
    #[test]
    fn test_section_tree_invariants(shape in shape()) {
        let xml = render(&shape);
        let tree = SectionTree::parse("doc", xml.as_bytes(), &ElementRules::dtbook(), &ParseOptions::default())
            .unwrap();
        prop_assert_eq!(tree.len(), count(&shape));

        let mut ids = HashSet::new();
        for section in tree.iter() {
            let node = tree.node(section);
            prop_assert!(ids.insert(node.id.clone()), "duplicate id {}", node.id);
            prop_assert_eq!(tree.find(&node.id), Some(section));
        }

        let mut order = Vec::new();
        pre_order(&tree, ROOT_SECTION, &mut order);
        prop_assert_eq!(order.len(), tree.len());
        for pair in order.windows(2) {
            prop_assert!(tree.node(pair[0]).sort_order < tree.node(pair[1]).sort_order);
        }

        for section in tree.iter().skip(1) {
            let node = tree.node(section);
            let parent = node.parent.unwrap();
            prop_assert_eq!(tree.children(parent)[node.position], section);
            prop_assert_eq!(tree.parent(section), Some(parent));
        }
    }
}
