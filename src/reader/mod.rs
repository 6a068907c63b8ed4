//! Pull reader producing XML events from a string slice

pub mod events;
pub mod slice;

pub use events::{split_name, Attribute, ParseError, StartElement, XmlEvent};
pub use slice::SliceReader;
