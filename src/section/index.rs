//! Identifier lookup for one parsed document.

use super::node::SectionRef;
use crate::error::SectionError;
use std::collections::HashMap;

/// Maps section ids and content anchors to their section.
///
/// Structural ids are unique and always map to their own section. Anchor
/// ids (any `id` attribute in a section's content) map to the nearest
/// enclosing section; a later, deeper registration replaces an earlier one.
#[derive(Debug, Clone, Default)]
pub struct DocumentIndex {
    ids: HashMap<String, SectionRef>,
    structural: HashMap<String, SectionRef>,
}

impl DocumentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a section's own id
    pub fn insert_section(&mut self, id: &str, section: SectionRef) -> Result<(), SectionError> {
        match self.structural.get(id) {
            Some(&existing) if existing != section => {
                return Err(SectionError::DuplicateId(id.to_string()));
            }
            Some(_) => {}
            None => {
                self.structural.insert(id.to_string(), section);
            }
        }
        self.ids.insert(id.to_string(), section);
        Ok(())
    }

    /// Register a content anchor; never displaces another section's own id
    pub fn insert_anchor(&mut self, id: &str, section: SectionRef) {
        if self
            .structural
            .get(id)
            .is_some_and(|&owner| owner != section)
        {
            return;
        }
        self.ids.insert(id.to_string(), section);
    }

    /// Section for a structural id or anchor
    pub fn get(&self, id: &str) -> Option<SectionRef> {
        self.ids.get(id).copied()
    }

    /// Section whose own id is `id`
    pub fn section(&self, id: &str) -> Option<SectionRef> {
        self.structural.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_section_id() {
        let mut index = DocumentIndex::new();
        index.insert_section("a", 1).unwrap();
        index.insert_section("a", 1).unwrap();
        assert!(matches!(
            index.insert_section("a", 2),
            Err(SectionError::DuplicateId(id)) if id == "a"
        ));
    }

    #[test]
    fn test_anchor_overwrites_but_not_section_ids() {
        let mut index = DocumentIndex::new();
        index.insert_anchor("p1", 0);
        index.insert_anchor("p1", 3);
        assert_eq!(index.get("p1"), Some(3));

        index.insert_section("s1", 1).unwrap();
        index.insert_anchor("s1", 0);
        assert_eq!(index.get("s1"), Some(1));
        assert_eq!(index.section("p1"), None);
    }

    #[test]
    fn test_section_id_claims_earlier_anchor() {
        let mut index = DocumentIndex::new();
        index.insert_anchor("s1", 0);
        index.insert_section("s1", 2).unwrap();
        assert_eq!(index.get("s1"), Some(2));
    }
}
