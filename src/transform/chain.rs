//! Sequential composition of transforms.

use super::{Transform, TransformParameters};
use crate::dom::XmlDocument;
use crate::error::TransformError;
use std::sync::Arc;
use std::time::SystemTime;

/// Applies each transform to the previous one's output. The first `None`
/// ends the chain; later transforms are not run.
#[derive(Clone, Default)]
pub struct TransformChain {
    transforms: Vec<Arc<dyn Transform>>,
}

impl TransformChain {
    pub fn new(transforms: Vec<Arc<dyn Transform>>) -> Self {
        TransformChain { transforms }
    }

    /// Append a transform
    pub fn push(&mut self, transform: Arc<dyn Transform>) -> &mut Self {
        self.transforms.push(transform);
        self
    }

    /// Insert a transform at `index`; `index` may equal the length
    pub fn insert(&mut self, index: usize, transform: Arc<dyn Transform>) -> &mut Self {
        self.transforms.insert(index.min(self.transforms.len()), transform);
        self
    }

    pub fn with(mut self, transform: Arc<dyn Transform>) -> Self {
        self.push(transform);
        self
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

impl Transform for TransformChain {
    fn apply(
        &self,
        input: XmlDocument,
        params: Option<&TransformParameters>,
    ) -> Result<Option<XmlDocument>, TransformError> {
        let mut current = input;
        for (step, transform) in self.transforms.iter().enumerate() {
            match transform.apply(current, params)? {
                Some(next) => current = next,
                None => {
                    log::trace!("transform chain stopped at step {}", step);
                    return Ok(None);
                }
            }
        }
        Ok(Some(current))
    }

    /// Newest timestamp among the transforms that report one
    fn last_modified(&self, params: Option<&TransformParameters>) -> Option<SystemTime> {
        self.transforms
            .iter()
            .filter_map(|t| t.last_modified(params))
            .max()
    }
}
