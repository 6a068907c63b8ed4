//! Section node representation

use crate::dom::NodeId;

/// Index of a section in its tree's arena. Sections are allocated in
/// pre-order, so comparing two refs compares their pre-order position.
pub type SectionRef = u32;

/// The root section is always the first arena slot
pub const ROOT_SECTION: SectionRef = 0;

/// One structural unit of a document
#[derive(Debug, Clone)]
pub struct SectionNode {
    pub id: String,
    pub title: String,
    pub sub_title: Option<String>,
    pub class_name: Option<String>,
    /// Local name of the originating element
    pub element_type: String,
    /// Originating element in the tree's DOM
    pub element: NodeId,
    /// Document-order counter value; strictly increases in pre-order
    pub sort_order: u32,
    pub parent: Option<SectionRef>,
    pub children: Vec<SectionRef>,
    /// Index within the parent's children (0 for the root)
    pub position: usize,
}

impl SectionNode {
    pub(crate) fn new(
        id: String,
        title: &str,
        element: NodeId,
        element_type: &str,
        parent: Option<SectionRef>,
        position: usize,
    ) -> Self {
        SectionNode {
            id,
            title: title.to_string(),
            sub_title: None,
            class_name: None,
            element_type: element_type.to_string(),
            element,
            sort_order: 0,
            parent,
            children: Vec::new(),
            position,
        }
    }

    #[inline]
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}
