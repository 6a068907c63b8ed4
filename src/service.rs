//! Service facade: documents, transforms and the result cache behind one
//! handle that request threads share.

use crate::cache::{Outcome, TransformCache};
use crate::config::ServiceConfig;
use crate::error::{SectionError, TransformError};
use crate::section::{ElementRules, Labeler};
use crate::source::{Resource, SourceDocument};
use crate::transform::{
    ElementFilterTransform, LiteEngine, ResourceResolver, StylesheetEngine, StylesheetTransform,
    Transform, TransformParameters, TransformRegistry,
};
use crate::xpath::XPathFactory;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Default)]
struct Library {
    documents: HashMap<String, Arc<SourceDocument>>,
    next_order: u32,
}

pub struct XmlService {
    config: ServiceConfig,
    xpath: Arc<XPathFactory>,
    registry: Arc<TransformRegistry>,
    cache: TransformCache,
    library: RwLock<Library>,
}

impl XmlService {
    /// A service using the built-in stylesheet engine
    pub fn new(config: ServiceConfig) -> Result<Self, TransformError> {
        let engine = Arc::new(LiteEngine::with_namespaces(config.namespace_context()));
        Self::with_engine(config, engine)
    }

    /// A service compiling stylesheets with `engine`. The XPath filter is
    /// registered as `FilterElements`.
    pub fn with_engine(
        config: ServiceConfig,
        engine: Arc<dyn StylesheetEngine>,
    ) -> Result<Self, TransformError> {
        let xpath = Arc::new(XPathFactory::new(
            config.namespace_context(),
            config.xpath_cache_capacity,
        ));
        let resolver = Arc::new(ResourceResolver::with_directories(
            config.transformer_directories.iter().cloned(),
        ));
        let registry = Arc::new(TransformRegistry::new(
            resolver,
            engine,
            config.update_check_interval(),
        ));
        registry.register(
            ElementFilterTransform::NAME,
            Arc::new(ElementFilterTransform::new(Arc::clone(&xpath))),
        )?;
        let cache = TransformCache::new(Arc::clone(&registry), config.cache_capacity);
        Ok(XmlService {
            config,
            xpath,
            registry,
            cache,
            library: RwLock::new(Library::default()),
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn xpath(&self) -> &Arc<XPathFactory> {
        &self.xpath
    }

    pub fn registry(&self) -> &Arc<TransformRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &TransformCache {
        &self.cache
    }

    pub fn add_transformer_directory(&self, directory: impl Into<PathBuf>) {
        self.registry.resolver().add_directory(directory);
    }

    /// Parse and register a document. Documents are ordered by load order.
    pub fn load_document(
        &self,
        name: &str,
        resource: Arc<dyn Resource>,
        rules: Arc<ElementRules>,
    ) -> Result<Arc<SourceDocument>, SectionError> {
        self.load(name, resource, rules, None)
    }

    pub fn load_document_with_labeler(
        &self,
        name: &str,
        resource: Arc<dyn Resource>,
        rules: Arc<ElementRules>,
        labeler: Arc<Labeler>,
    ) -> Result<Arc<SourceDocument>, SectionError> {
        self.load(name, resource, rules, Some(labeler))
    }

    fn load(
        &self,
        name: &str,
        resource: Arc<dyn Resource>,
        rules: Arc<ElementRules>,
        labeler: Option<Arc<Labeler>>,
    ) -> Result<Arc<SourceDocument>, SectionError> {
        let mut library = self.library.write().unwrap_or_else(PoisonError::into_inner);
        if library.documents.contains_key(name) {
            return Err(SectionError::DuplicateDocument(name.to_string()));
        }
        let mut builder = SourceDocument::builder(name, resource)
            .rules(rules)
            .sort_order(library.next_order)
            .update_check_interval(self.config.update_check_interval());
        if let Some(labeler) = labeler {
            builder = builder.labeler(labeler);
        }
        let document = Arc::new(builder.load()?);
        log::info!("loaded document {} ({} sections)", name, document.tree().len());
        library.next_order += 1;
        library
            .documents
            .insert(name.to_string(), Arc::clone(&document));
        Ok(document)
    }

    pub fn document(&self, name: &str) -> Option<Arc<SourceDocument>> {
        self.library
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .documents
            .get(name)
            .cloned()
    }

    /// Loaded document names in load order
    pub fn document_names(&self) -> Vec<String> {
        let library = self.library.read().unwrap_or_else(PoisonError::into_inner);
        let mut documents: Vec<&Arc<SourceDocument>> = library.documents.values().collect();
        documents.sort_by_key(|d| d.sort_order());
        documents.iter().map(|d| d.name().to_string()).collect()
    }

    /// Forget a document and its cached results
    pub fn remove_document(&self, name: &str) -> bool {
        let removed = self
            .library
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .documents
            .remove(name)
            .is_some();
        if removed {
            self.cache.invalidate_document(name);
        }
        removed
    }

    pub fn register_transform(
        &self,
        name: &str,
        transform: Arc<dyn Transform>,
    ) -> Result<(), TransformError> {
        self.registry.register(name, transform)
    }

    pub fn load_stylesheet(
        &self,
        name: &str,
        file: &str,
        dependents: &[&str],
    ) -> Result<Arc<StylesheetTransform>, TransformError> {
        self.registry.load_stylesheet(name, file, dependents)
    }

    /// Transform the section `section_id` of `document`, after giving the
    /// document a chance to pick up changes to its source. An anchor id
    /// inside a section's content addresses that section.
    pub fn get_transformed(
        &self,
        document: &str,
        section_id: &str,
        transform: &str,
        params: Option<&TransformParameters>,
    ) -> Outcome {
        let source = self
            .document(document)
            .ok_or_else(|| TransformError::UnknownDocument(document.to_string()))?;
        if source.check_for_update() {
            let dropped = self.cache.invalidate_document(document);
            log::debug!("{} changed; dropped {} cached results", document, dropped);
        }
        let tree = source.tree();
        let section = tree
            .find_enclosing(section_id)
            .ok_or_else(|| TransformError::UnknownSection {
                document: document.to_string(),
                section: section_id.to_string(),
            })?;
        self.cache.get_transformed(&tree, section, transform, params)
    }

    /// Shorthand for the `FilterElements` transform with `xpath`
    pub fn filter(&self, document: &str, section_id: &str, xpath: &str) -> Outcome {
        let params = TransformParameters::new().with(ElementFilterTransform::XPATH, xpath);
        self.get_transformed(document, section_id, ElementFilterTransform::NAME, Some(&params))
    }
}
