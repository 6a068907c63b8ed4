//! XPath element filtering.

use super::{Transform, TransformParameters};
use crate::dom::{NodeKind, XmlDocument, DOCUMENT_NODE};
use crate::error::TransformError;
use crate::xpath::XPathFactory;
use std::sync::Arc;
use std::time::SystemTime;

/// Reduces a document to the nodes an XPath selects, evaluated with the
/// root element as context.
///
/// - no expression: the input is returned unchanged
/// - one element matched: that element becomes the result
/// - several matched: the root element, emptied, holds copies of the
///   matches in document order
/// - nothing matched: `None`
pub struct ElementFilterTransform {
    factory: Arc<XPathFactory>,
}

impl ElementFilterTransform {
    /// Parameter holding the XPath expression
    pub const XPATH: &'static str = "FilterElements:xpath";

    /// Name the filter is registered under by `XmlService`
    pub const NAME: &'static str = "FilterElements";

    pub fn new(factory: Arc<XPathFactory>) -> Self {
        ElementFilterTransform { factory }
    }
}

impl Transform for ElementFilterTransform {
    fn apply(
        &self,
        input: XmlDocument,
        params: Option<&TransformParameters>,
    ) -> Result<Option<XmlDocument>, TransformError> {
        let expression = match params.and_then(|p| p.get(Self::XPATH)) {
            Some(value) => value.to_string(),
            None => return Ok(Some(input)),
        };
        let root = match input.root_element_id() {
            Some(root) => root,
            None => return Ok(None),
        };

        let compiled = self.factory.compile(&expression)?;
        let matches = compiled
            .select_nodes(&input, root)
            .map_err(|message| TransformError::execution(Self::NAME, message))?;
        log::trace!("{} using {} found {} nodes", Self::NAME, expression, matches.len());

        match matches.as_slice() {
            [] => Ok(None),
            [only] if input.node_kind_of(*only) == Some(NodeKind::Element) => {
                Ok(Some(input.extract(*only)?))
            }
            [only] if *only == DOCUMENT_NODE => Ok(Some(input)),
            _ => {
                let mut container = input.extract_shallow(root)?;
                let target = container
                    .root_element_id()
                    .ok_or_else(|| TransformError::execution(Self::NAME, "empty container"))?;
                for &node in &matches {
                    let node = if node == DOCUMENT_NODE { root } else { node };
                    container.import_subtree(target, &input, node)?;
                }
                Ok(Some(container))
            }
        }
    }

    fn last_modified(&self, _params: Option<&TransformParameters>) -> Option<SystemTime> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::serialize;

    fn filter() -> ElementFilterTransform {
        ElementFilterTransform::new(Arc::new(XPathFactory::default()))
    }

    fn params(xpath: &str) -> TransformParameters {
        TransformParameters::new().with(ElementFilterTransform::XPATH, xpath)
    }

    fn doc() -> XmlDocument {
        XmlDocument::parse_str(
            "<level2 id='s'><h2>T</h2><p>First p</p><p><em>Second p</em></p><p>Third p</p></level2>",
        )
        .unwrap()
    }

    #[test]
    fn test_absent_parameter_is_identity() {
        let out = filter().apply(doc(), None).unwrap().unwrap();
        assert_eq!(out.root_name(), Some("level2"));
        let out = filter()
            .apply(doc(), Some(&TransformParameters::new()))
            .unwrap()
            .unwrap();
        assert_eq!(out.child_elements(out.root_element_id().unwrap()).count(), 4);
    }

    #[test]
    fn test_multiple_matches_fill_container() {
        let out = filter().apply(doc(), Some(&params(".//p"))).unwrap().unwrap();
        let root = out.root_element_id().unwrap();
        assert_eq!(out.root_name(), Some("level2"));
        assert_eq!(out.get_attribute(root, "id"), Some("s"));
        assert_eq!(out.child_elements(root).count(), 3);
        assert_eq!(out.string_value(root), "First pSecond pThird p");
    }

    #[test]
    fn test_single_match_is_returned_directly() {
        let out = filter().apply(doc(), Some(&params(".//em"))).unwrap().unwrap();
        assert_eq!(serialize(&out, out.root_element_id().unwrap()), "<em>Second p</em>");
        let same = filter().apply(doc(), Some(&params("."))).unwrap().unwrap();
        assert_eq!(same.root_name(), Some("level2"));
    }

    #[test]
    fn test_no_match_is_none() {
        assert!(filter().apply(doc(), Some(&params(".//table"))).unwrap().is_none());
    }

    #[test]
    fn test_bad_expression() {
        let err = filter().apply(doc(), Some(&params(".//p["))).unwrap_err();
        assert!(matches!(err, TransformError::XPathSyntax { .. }));
        let err = filter().apply(doc(), Some(&params("count(.//p)"))).unwrap_err();
        assert!(matches!(err, TransformError::Execution { .. }));
    }

    #[test]
    fn test_never_changes() {
        assert_eq!(filter().last_modified(Some(&params(".//p"))), None);
    }
}
