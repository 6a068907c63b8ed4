//! Named transforms.

use super::stylesheet::{StylesheetEngine, StylesheetTransform};
use super::{LiteEngine, ResourceResolver, Transform};
use crate::error::TransformError;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

/// Transforms by name, plus what is needed to load stylesheets into it.
/// Owned by the cache and the service rather than shared globally.
pub struct TransformRegistry {
    transforms: RwLock<HashMap<String, Arc<dyn Transform>>>,
    resolver: Arc<ResourceResolver>,
    engine: Arc<dyn StylesheetEngine>,
    check_interval: Duration,
}

impl TransformRegistry {
    pub fn new(
        resolver: Arc<ResourceResolver>,
        engine: Arc<dyn StylesheetEngine>,
        check_interval: Duration,
    ) -> Self {
        TransformRegistry {
            transforms: RwLock::new(HashMap::new()),
            resolver,
            engine,
            check_interval,
        }
    }

    pub fn resolver(&self) -> &Arc<ResourceResolver> {
        &self.resolver
    }

    /// Register `transform` under `name`; names are never replaced
    pub fn register(
        &self,
        name: impl Into<String>,
        transform: Arc<dyn Transform>,
    ) -> Result<(), TransformError> {
        let name = name.into();
        let mut transforms = self
            .transforms
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if transforms.contains_key(&name) {
            return Err(TransformError::DuplicateTransform(name));
        }
        log::debug!("registered transform {}", name);
        transforms.insert(name, transform);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Transform>> {
        self.transforms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .transforms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Find `file` and the `dependents` it imports in the resolver's
    /// directories and register a stylesheet transform for them
    pub fn load_stylesheet(
        &self,
        name: &str,
        file: &str,
        dependents: &[&str],
    ) -> Result<Arc<StylesheetTransform>, TransformError> {
        let path = self.resolver.find(file)?;
        let mut transform = StylesheetTransform::new(
            name,
            path,
            Arc::clone(&self.engine),
            Arc::clone(&self.resolver),
        )
        .with_check_interval(self.check_interval);
        for dependent in dependents {
            transform = transform.add_dependent(self.resolver.find(dependent)?);
        }
        let transform = Arc::new(transform);
        self.register(name, transform.clone())?;
        Ok(transform)
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        TransformRegistry::new(
            Arc::default(),
            Arc::new(LiteEngine::new()),
            Duration::from_secs(10),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::XmlDocument;
    use crate::transform::TransformChain;
    use std::fs;

    #[test]
    fn test_duplicate_names_rejected() {
        let registry = TransformRegistry::default();
        registry
            .register("identity", Arc::new(TransformChain::default()))
            .unwrap();
        let err = registry
            .register("identity", Arc::new(TransformChain::default()))
            .unwrap_err();
        assert!(matches!(err, TransformError::DuplicateTransform(n) if n == "identity"));
        assert_eq!(registry.names(), vec!["identity"]);
        assert!(registry.get("other").is_none());
    }

    #[test]
    fn test_load_stylesheet_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("title.xsl"),
            "<xsl:stylesheet version='1.0' xmlns:xsl='http://www.w3.org/1999/XSL/Transform'>\
             <xsl:template match='*'><h1><xsl:value-of select='h2'/></h1></xsl:template>\
             </xsl:stylesheet>",
        )
        .unwrap();
        fs::write(dir.path().join("common.xsl"), "<x/>").unwrap();

        let registry = TransformRegistry::default();
        registry.resolver().add_directory(dir.path());
        let loaded = registry
            .load_stylesheet("title", "title.xsl", &["common.xsl"])
            .unwrap();
        assert_eq!(loaded.dependents().len(), 1);

        let transform = registry.get("title").unwrap();
        let input = XmlDocument::parse_str("<level2><h2>Intro</h2></level2>").unwrap();
        let out = transform.apply(input, None).unwrap().unwrap();
        assert_eq!(out.root_name(), Some("h1"));
        assert_eq!(out.string_value(out.root_element_id().unwrap()), "Intro");

        assert!(matches!(
            registry.load_stylesheet("missing", "missing.xsl", &[]),
            Err(TransformError::ResourceNotFound(_))
        ));
        assert!(matches!(
            registry.load_stylesheet("title2", "title.xsl", &["nope.xsl"]),
            Err(TransformError::ResourceNotFound(_))
        ));
    }
}
