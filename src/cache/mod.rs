//! Transformed-section cache
//!
//! Results are keyed by document, section id, transform name and
//! parameters. An entry is served while it is no older than the transform's
//! current modification time and was computed from the same version of the
//! source as the tree asking for it; otherwise the section is transformed
//! again. The map lock is never held while a
//! transform runs, so two threads missing on the same key both compute and
//! the later insert wins.

use crate::dom::{serialize, serialize_inner, XmlDocument};
use crate::error::TransformError;
use crate::section::{SectionRef, SectionTree};
use crate::transform::{TransformParameters, TransformRegistry};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub document: String,
    pub section: String,
    pub transform: String,
    pub params: Option<TransformParameters>,
}

/// A transform's output and the modification time it reflects
#[derive(Debug, Clone)]
pub struct TransformedResult {
    pub element: Arc<XmlDocument>,
    pub timestamp: SystemTime,
}

impl TransformedResult {
    /// Outer XML of the result's root element
    pub fn to_xml(&self) -> String {
        self.element
            .root_element_id()
            .map(|root| serialize(self.element.as_ref(), root))
            .unwrap_or_default()
    }

    /// XML of the root element's children only
    pub fn inner_xml(&self) -> String {
        self.element
            .root_element_id()
            .map(|root| serialize_inner(self.element.as_ref(), root))
            .unwrap_or_default()
    }
}

#[derive(Debug)]
struct CacheEntry {
    result: TransformedResult,
    /// Source stamp of the tree the result was computed from
    source_modified: Option<SystemTime>,
}

impl CacheEntry {
    /// Stale on any change of source stamp, older included
    fn is_fresh(&self, transform_modified: Option<SystemTime>, source_modified: Option<SystemTime>) -> bool {
        transform_modified.map_or(true, |m| m <= self.result.timestamp)
            && source_modified == self.source_modified
    }
}

pub type Outcome = Result<Option<TransformedResult>, TransformError>;

pub struct TransformCache {
    registry: Arc<TransformRegistry>,
    entries: Mutex<LruCache<CacheKey, CacheEntry>>,
}

impl TransformCache {
    pub fn new(registry: Arc<TransformRegistry>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        TransformCache {
            registry,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn registry(&self) -> &Arc<TransformRegistry> {
        &self.registry
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<CacheKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Transform one section, reusing a fresh cached result.
    ///
    /// `Ok(None)` means the transform produced nothing; that outcome and
    /// errors are never cached.
    pub fn get_transformed(
        &self,
        tree: &SectionTree,
        section: SectionRef,
        transform_name: &str,
        params: Option<&TransformParameters>,
    ) -> Outcome {
        let node = tree.get(section).ok_or_else(|| TransformError::UnknownSection {
            document: tree.document_name().to_string(),
            section: section.to_string(),
        })?;
        let transform = self
            .registry
            .get(transform_name)
            .ok_or_else(|| TransformError::ResourceNotFound(format!("transform `{}`", transform_name)))?;

        let key = CacheKey {
            document: tree.document_name().to_string(),
            section: node.id.clone(),
            transform: transform_name.to_string(),
            params: params.cloned(),
        };
        let modified = transform.last_modified(params);

        if let Some(entry) = self.lock().get(&key) {
            if entry.is_fresh(modified, tree.source_modified()) {
                log::trace!("cache hit {}#{} via {}", key.document, key.section, key.transform);
                return Ok(Some(entry.result.clone()));
            }
        }

        let input = tree.extract(section)?;
        let output = match transform.apply(input, params)? {
            Some(output) => output,
            None => {
                log::trace!("{} produced nothing for {}#{}", key.transform, key.document, key.section);
                return Ok(None);
            }
        };
        let result = TransformedResult {
            element: Arc::new(output),
            timestamp: modified.unwrap_or_else(SystemTime::now),
        };
        log::debug!("transformed {}#{} via {}", key.document, key.section, key.transform);
        self.lock().put(
            key,
            CacheEntry {
                result: result.clone(),
                source_modified: tree.source_modified(),
            },
        );
        Ok(Some(result))
    }

    /// Transform many sections of one tree, in parallel when the
    /// `parallel` feature is on. Outcomes are in the order of `sections`.
    pub fn prefetch(
        &self,
        tree: &SectionTree,
        sections: &[SectionRef],
        transform_name: &str,
        params: Option<&TransformParameters>,
    ) -> Vec<Outcome> {
        #[cfg(feature = "parallel")]
        {
            sections
                .par_iter()
                .map(|&section| self.get_transformed(tree, section, transform_name, params))
                .collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            sections
                .iter()
                .map(|&section| self.get_transformed(tree, section, transform_name, params))
                .collect()
        }
    }

    /// Drop every entry computed from `document`
    pub fn invalidate_document(&self, document: &str) -> usize {
        let mut entries = self.lock();
        let stale: Vec<CacheKey> = entries
            .iter()
            .filter(|(key, _)| key.document == document)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            entries.pop(key);
        }
        stale.len()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
