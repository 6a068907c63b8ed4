//! Shared XPath compilation with an LRU cache of compiled expressions.

use super::compiler::{compile_with, CompiledExpr};
use crate::dom::NamespaceContext;
use crate::error::TransformError;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

/// Compiles expressions against one set of prefix bindings and caches them
/// by source text. Safe to share between threads.
pub struct XPathFactory {
    namespaces: NamespaceContext,
    cache: Mutex<LruCache<String, Arc<CompiledExpr>>>,
}

impl XPathFactory {
    pub fn new(namespaces: NamespaceContext, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        XPathFactory {
            namespaces,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn namespaces(&self) -> &NamespaceContext {
        &self.namespaces
    }

    /// Compile `expression`, reusing a cached compilation when present
    pub fn compile(&self, expression: &str) -> Result<Arc<CompiledExpr>, TransformError> {
        {
            let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(hit) = cache.get(expression) {
                return Ok(Arc::clone(hit));
            }
        }

        let compiled = compile_with(expression, &self.namespaces).map_err(|message| {
            TransformError::XPathSyntax {
                expression: expression.to_string(),
                message,
            }
        })?;
        let compiled = Arc::new(compiled);
        log::trace!("compiled xpath {:?}", expression);

        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.put(expression.to_string(), Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Number of cached compilations
    pub fn cached(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for XPathFactory {
    fn default() -> Self {
        XPathFactory::new(NamespaceContext::default(), 256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_is_cached() {
        let factory = XPathFactory::default();
        let a = factory.compile("//dtb:p").unwrap();
        let b = factory.compile("//dtb:p").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(factory.cached(), 1);
    }

    #[test]
    fn test_syntax_error_names_expression() {
        let factory = XPathFactory::default();
        match factory.compile("//p[") {
            Err(TransformError::XPathSyntax { expression, .. }) => assert_eq!(expression, "//p["),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_capacity_evicts() {
        let factory = XPathFactory::new(NamespaceContext::default(), 1);
        let first = factory.compile("a").unwrap();
        factory.compile("b").unwrap();
        let again = factory.compile("a").unwrap();
        assert!(!Arc::ptr_eq(&first, &again));
    }
}
