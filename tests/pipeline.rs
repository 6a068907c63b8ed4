//! End-to-end: documents on disk, stylesheets on disk, the service cache.

use sectiondom::dom::ParseOptions;
use sectiondom::section::ROOT_SECTION;
use sectiondom::{
    ElementFilterTransform, ElementRules, FileResource, Rule, SectionTree, ServiceConfig,
    Transform, TransformChain, TransformError, TransformParameters, XPathFactory, XmlDocument,
    XmlService,
};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

const FRAGMENT: &str = "<level1><level2><p>First p</p><p><em>Second p</em></p></level2>\
                        <level2><p>Third p</p></level2><p>Fourth p</p></level1>";

const BOOK: &str = "<level1><level2 id='first'><p>First p</p><p><em>Second p</em></p></level2>\
                    <level2 id='s'><p>Third p</p></level2><p>Fourth p</p></level1>";

fn rules() -> ElementRules {
    ElementRules::new()
        .with("level1", Rule::sections("level2"))
        .with("level2", Rule::leaf())
}

fn fragment_tree() -> SectionTree {
    SectionTree::parse("fragment", FRAGMENT.as_bytes(), &rules(), &ParseOptions::default()).unwrap()
}

fn filter(xpath: &str) -> (ElementFilterTransform, TransformParameters) {
    (
        ElementFilterTransform::new(Arc::new(XPathFactory::default())),
        TransformParameters::new().with(ElementFilterTransform::XPATH, xpath),
    )
}

#[test]
fn test_fragment_sections_and_sort_order() {
    let tree = fragment_tree();
    assert_eq!(tree.len(), 3);
    let root = tree.root();
    assert_eq!(root.element_type, "level1");
    assert_eq!(root.children.len(), 2);
    let orders: Vec<u32> = tree.iter().map(|s| tree.node(s).sort_order).collect();
    assert_eq!(orders, vec![0, 1, 2]);
    assert!(tree.iter().skip(1).all(|s| tree.element_type(s) == "level2"));
}

#[test]
fn test_filter_on_first_section() {
    let tree = fragment_tree();
    let first = tree.child(ROOT_SECTION, 0).unwrap();
    let (transform, params) = filter(".//p");
    let out = transform
        .apply(tree.extract(first).unwrap(), Some(&params))
        .unwrap()
        .unwrap();
    let root = out.root_element_id().unwrap();
    assert_eq!(out.string_value(root), "First pSecond p");
}

#[test]
fn test_filter_cardinality() {
    let tree = fragment_tree();
    let input = || tree.extract(ROOT_SECTION).unwrap();

    let (transform, params) = filter(".//level2//p");
    let out = transform.apply(input(), Some(&params)).unwrap().unwrap();
    let root = out.root_element_id().unwrap();
    assert_eq!(out.root_name(), Some("level1"));
    let texts: Vec<String> = out.child_elements(root).map(|c| out.string_value(c)).collect();
    assert_eq!(texts, vec!["First p", "Second p", "Third p"]);

    let (transform, params) = filter(".//em");
    let out = transform.apply(input(), Some(&params)).unwrap().unwrap();
    assert_eq!(out.root_name(), Some("em"));

    let (transform, params) = filter(".//table");
    assert!(transform.apply(input(), Some(&params)).unwrap().is_none());
}

struct Counter(AtomicUsize);

impl Transform for Counter {
    fn apply(
        &self,
        input: XmlDocument,
        _params: Option<&TransformParameters>,
    ) -> Result<Option<XmlDocument>, TransformError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(Some(input))
    }

    fn last_modified(&self, _params: Option<&TransformParameters>) -> Option<SystemTime> {
        None
    }
}

#[test]
fn test_chain_stops_at_empty_result() {
    let tree = fragment_tree();
    let (empty, params) = filter(".//table");
    let counter = Arc::new(Counter(AtomicUsize::new(0)));
    let chain = TransformChain::new(vec![Arc::new(empty) as Arc<dyn Transform>, counter.clone()]);
    assert!(chain
        .apply(tree.extract(ROOT_SECTION).unwrap(), Some(&params))
        .unwrap()
        .is_none());
    assert_eq!(counter.0.load(Ordering::SeqCst), 0);
}

const RENDER: &str = r#"<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform">
  <xsl:import href="common.xsl"/>
  <xsl:param name="class" select="'plain'"/>
  <xsl:template match="level2">
    <div class="{$class}"><xsl:call-template name="paras"/></div>
  </xsl:template>
</xsl:stylesheet>"#;

const COMMON: &str = r#"<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform">
  <xsl:template name="paras">
    <xsl:for-each select=".//p"><para><xsl:value-of select="."/></para></xsl:for-each>
  </xsl:template>
</xsl:stylesheet>"#;

fn modified(path: &Path) -> SystemTime {
    fs::metadata(path).unwrap().modified().unwrap()
}

#[test]
fn test_stylesheet_results_are_cached_until_a_dependent_changes() {
    let dir = tempfile::tempdir().unwrap();
    let book = dir.path().join("book.xml");
    fs::write(&book, BOOK).unwrap();
    fs::write(dir.path().join("render.xsl"), RENDER).unwrap();
    let common = dir.path().join("common.xsl");
    fs::write(&common, COMMON).unwrap();

    let config = ServiceConfig {
        update_check_interval_secs: 0,
        transformer_directories: vec![dir.path().to_path_buf()],
        ..ServiceConfig::default()
    };
    let service = XmlService::new(config).unwrap();
    service
        .load_document("book", Arc::new(FileResource::new(&book)), Arc::new(rules()))
        .unwrap();
    service
        .load_stylesheet("render", "render.xsl", &["common.xsl"])
        .unwrap();

    let params = TransformParameters::new().with("class", "fancy");
    let first = service
        .get_transformed("book", "first", "render", Some(&params))
        .unwrap()
        .unwrap();
    assert_eq!(
        first.to_xml(),
        r#"<div class="fancy"><para>First p</para><para>Second p</para></div>"#
    );
    let newest = modified(&common).max(modified(&dir.path().join("render.xsl")));
    assert_eq!(first.timestamp, newest);

    let second = service
        .get_transformed("book", "first", "render", Some(&params))
        .unwrap()
        .unwrap();
    assert!(Arc::ptr_eq(&first.element, &second.element));

    fs::File::options()
        .write(true)
        .open(&common)
        .unwrap()
        .set_modified(newest + Duration::from_secs(60))
        .unwrap();
    let third = service
        .get_transformed("book", "first", "render", Some(&params))
        .unwrap()
        .unwrap();
    assert!(!Arc::ptr_eq(&first.element, &third.element));
    assert_eq!(third.timestamp, modified(&common));
    assert_eq!(third.to_xml(), first.to_xml());

    let plain = service
        .get_transformed("book", "s", "render", None)
        .unwrap()
        .unwrap();
    assert_eq!(plain.to_xml(), r#"<div class="plain"><para>Third p</para></div>"#);
}

#[test]
fn test_missing_stylesheet_and_transform() {
    let service = XmlService::new(ServiceConfig::default()).unwrap();
    assert!(matches!(
        service.load_stylesheet("render", "render.xsl", &[]),
        Err(TransformError::ResourceNotFound(_))
    ));
    let tree = fragment_tree();
    assert!(matches!(
        service.cache().get_transformed(&tree, ROOT_SECTION, "render", None),
        Err(TransformError::ResourceNotFound(_))
    ));
}
