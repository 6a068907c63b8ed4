//! Section trees
//!
//! A `SectionTree` is the structural view of one document: the sections
//! named by an `ElementRules` table, their titles and ordering, and an
//! index from ids (including content anchors) to sections.

pub mod index;
pub mod node;
pub mod parser;
pub mod rules;
pub mod tree;

pub use index::DocumentIndex;
pub use node::{SectionNode, SectionRef, ROOT_SECTION};
pub use parser::{normalize_title, StructuralParser};
pub use rules::{ElementRules, Rule};
pub use tree::{compare_sections, Labeler, SectionTree};

/// Id of every document's root section
pub const DOCUMENT_ID: &str = "docID";

/// Root title when the document declares none
pub const DEFAULT_ROOT_TITLE: &str = "DocumentTitle";

/// Section title when no title child is present
pub const DEFAULT_TITLE: &str = "Title Unknown";

/// Prefix for ids generated for sections without one
pub const GENERATED_ID_PREFIX: &str = "gen";
