//! sectiondom - structural section trees over XML, with cached transforms
//!
//! Layers, bottom up:
//! - `reader` / `core`: zero-copy event reader and entity handling
//! - `dom`: owned arena DOM with namespaces, XInclude and serialization
//! - `xpath`: XPath 1.0 over the DOM, with a caching `XPathFactory`
//! - `section`: the section tree a rule table derives from a document
//! - `source`: re-parseable documents backed by a `Resource`
//! - `transform`: the `Transform` trait, chains, XPath filters and
//!   stylesheets
//! - `cache`: freshness-checked cache of transformed sections
//! - `service`: `XmlService`, the facade request threads share
//!
//! ```no_run
//! use sectiondom::{ElementRules, FileResource, ServiceConfig, XmlService};
//! use std::sync::Arc;
//!
//! # fn main() -> sectiondom::Result<()> {
//! let service = XmlService::new(ServiceConfig::default())?;
//! service.load_document(
//!     "guide",
//!     Arc::new(FileResource::new("guide.xml")),
//!     Arc::new(ElementRules::dtbook()),
//! )?;
//! if let Some(result) = service.filter("guide", "intro", ".//dtb:p")? {
//!     println!("{}", result.inner_xml());
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod cache;
pub mod config;
pub mod core;
pub mod dom;
pub mod error;
pub mod reader;
pub mod section;
pub mod service;
pub mod source;
pub mod transform;
pub mod xpath;

pub use cache::{CacheKey, TransformCache, TransformedResult};
pub use config::ServiceConfig;
pub use dom::{serialize, serialize_inner, NamespaceContext, XmlDocument};
pub use error::{ConfigError, DomError, Error, Result, SectionError, TransformError};
pub use section::{ElementRules, Rule, SectionNode, SectionRef, SectionTree};
pub use service::XmlService;
pub use source::{FileResource, MemoryResource, Resource, SourceDocument};
pub use transform::{
    ElementFilterTransform, LiteEngine, ParamValue, StylesheetTransform, Transform, TransformChain,
    TransformParameters, TransformRegistry,
};
pub use xpath::{XPathFactory, XPathValue};
