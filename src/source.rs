//! Source documents: named, re-parseable section trees backed by a
//! `Resource`, with a throttled check for changes.

use crate::dom::ParseOptions;
use crate::error::SectionError;
use crate::section::{ElementRules, Labeler, SectionTree};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant, SystemTime};

/// Something that provides document bytes and a modification time
pub trait Resource: Send + Sync {
    fn read(&self) -> io::Result<Vec<u8>>;

    /// `None` if the time cannot be determined
    fn last_modified(&self) -> Option<SystemTime>;

    /// Filesystem location, used as the base for XInclude
    fn path(&self) -> Option<&Path> {
        None
    }
}

/// A file on disk
#[derive(Debug, Clone)]
pub struct FileResource {
    path: PathBuf,
}

impl FileResource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        FileResource { path: path.into() }
    }
}

impl Resource for FileResource {
    fn read(&self) -> io::Result<Vec<u8>> {
        fs::read(&self.path)
    }

    fn last_modified(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).and_then(|m| m.modified()).ok()
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// In-memory bytes with a settable timestamp
#[derive(Debug)]
pub struct MemoryResource {
    inner: Mutex<(Vec<u8>, Option<SystemTime>)>,
}

impl MemoryResource {
    pub fn new(bytes: impl Into<Vec<u8>>, modified: Option<SystemTime>) -> Self {
        MemoryResource {
            inner: Mutex::new((bytes.into(), modified)),
        }
    }

    /// Replace the content and its timestamp
    pub fn set(&self, bytes: impl Into<Vec<u8>>, modified: SystemTime) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        *inner = (bytes.into(), Some(modified));
    }
}

impl Resource for MemoryResource {
    fn read(&self) -> io::Result<Vec<u8>> {
        Ok(self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .0
            .clone())
    }

    fn last_modified(&self) -> Option<SystemTime> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).1
    }
}

/// Called with the new tree after every successful re-parse
pub type Observer = dyn Fn(&SectionTree) + Send + Sync;

struct SourceState {
    tree: Arc<SectionTree>,
    last_checked: Instant,
    last_modified: Option<SystemTime>,
}

/// A named document whose tree is replaced as a unit when its resource changes
pub struct SourceDocument {
    name: String,
    sort_order: u32,
    resource: Arc<dyn Resource>,
    rules: Arc<ElementRules>,
    labeler: Option<Arc<Labeler>>,
    update_check_interval: Duration,
    state: Mutex<SourceState>,
    observers: Mutex<Vec<Arc<Observer>>>,
}

impl fmt::Debug for SourceDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceDocument")
            .field("name", &self.name)
            .field("sort_order", &self.sort_order)
            .field("update_check_interval", &self.update_check_interval)
            .finish_non_exhaustive()
    }
}

/// Builder for `SourceDocument`
pub struct SourceDocumentBuilder {
    name: String,
    resource: Arc<dyn Resource>,
    rules: Arc<ElementRules>,
    sort_order: u32,
    update_check_interval: Duration,
    labeler: Option<Arc<Labeler>>,
}

impl SourceDocumentBuilder {
    pub fn rules(mut self, rules: Arc<ElementRules>) -> Self {
        self.rules = rules;
        self
    }

    pub fn sort_order(mut self, sort_order: u32) -> Self {
        self.sort_order = sort_order;
        self
    }

    pub fn update_check_interval(mut self, interval: Duration) -> Self {
        self.update_check_interval = interval;
        self
    }

    pub fn labeler(mut self, labeler: Arc<Labeler>) -> Self {
        self.labeler = Some(labeler);
        self
    }

    /// Read and parse the resource for the first time
    pub fn load(self) -> Result<SourceDocument, SectionError> {
        let modified = self.resource.last_modified();
        let tree = parse_source(
            &self.name,
            self.resource.as_ref(),
            &self.rules,
            self.labeler.as_deref(),
            self.sort_order,
            modified,
        )?;
        Ok(SourceDocument {
            name: self.name,
            sort_order: self.sort_order,
            resource: self.resource,
            rules: self.rules,
            labeler: self.labeler,
            update_check_interval: self.update_check_interval,
            state: Mutex::new(SourceState {
                tree: Arc::new(tree),
                last_checked: Instant::now(),
                last_modified: modified,
            }),
            observers: Mutex::new(Vec::new()),
        })
    }
}

fn parse_source(
    name: &str,
    resource: &dyn Resource,
    rules: &ElementRules,
    labeler: Option<&Labeler>,
    sort_order: u32,
    modified: Option<SystemTime>,
) -> Result<SectionTree, SectionError> {
    let bytes = resource.read()?;
    let options = ParseOptions {
        xinclude_base: resource.path().and_then(Path::parent).map(Path::to_path_buf),
    };
    let mut tree = SectionTree::parse(name, &bytes, rules, &options)?
        .with_document_order(sort_order)
        .with_source_modified(modified);
    if let Some(labeler) = labeler {
        tree = tree.with_labels(labeler);
    }
    for warning in tree.warnings() {
        log::warn!("{}: {}", name, warning);
    }
    Ok(tree)
}

impl SourceDocument {
    pub fn builder(name: &str, resource: Arc<dyn Resource>) -> SourceDocumentBuilder {
        SourceDocumentBuilder {
            name: name.to_string(),
            resource,
            rules: Arc::new(ElementRules::dtbook()),
            sort_order: 0,
            update_check_interval: Duration::from_secs(10),
            labeler: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sort_order(&self) -> u32 {
        self.sort_order
    }

    /// The current tree
    pub fn tree(&self) -> Arc<SectionTree> {
        Arc::clone(&self.lock_state().tree)
    }

    pub fn add_observer(&self, observer: Arc<Observer>) {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    /// Re-read the resource's modification time if the check interval has
    /// elapsed, and re-parse when it is newer. Returns `true` if the tree
    /// was replaced.
    pub fn check_for_update(&self) -> bool {
        let replaced = {
            let mut state = self.lock_state();
            if state.last_checked.elapsed() < self.update_check_interval {
                return false;
            }
            state.last_checked = Instant::now();

            let modified = self.resource.last_modified();
            let newer = match (modified, state.last_modified) {
                (Some(now), Some(before)) => now > before,
                (Some(_), None) => true,
                (None, _) => false,
            };
            if !newer {
                return false;
            }
            self.reparse(&mut state, modified)
        };
        if let Some(tree) = &replaced {
            self.notify(tree);
        }
        replaced.is_some()
    }

    /// Re-parse now regardless of timestamps
    pub fn reload(&self) -> Result<Arc<SectionTree>, SectionError> {
        let tree = {
            let mut state = self.lock_state();
            let modified = self.resource.last_modified();
            let tree = Arc::new(self.build_tree(modified)?);
            state.tree = Arc::clone(&tree);
            state.last_modified = modified;
            state.last_checked = Instant::now();
            tree
        };
        self.notify(&tree);
        Ok(tree)
    }

    fn reparse(&self, state: &mut SourceState, modified: Option<SystemTime>) -> Option<Arc<SectionTree>> {
        match self.build_tree(modified) {
            Ok(tree) => {
                log::debug!("document {} changed; re-parsed", self.name);
                let tree = Arc::new(tree);
                state.tree = Arc::clone(&tree);
                state.last_modified = modified;
                Some(tree)
            }
            Err(err) => {
                log::error!("re-parse of {} failed, keeping previous tree: {}", self.name, err);
                None
            }
        }
    }

    fn build_tree(&self, modified: Option<SystemTime>) -> Result<SectionTree, SectionError> {
        parse_source(
            &self.name,
            self.resource.as_ref(),
            &self.rules,
            self.labeler.as_deref(),
            self.sort_order,
            modified,
        )
    }

    fn notify(&self, tree: &SectionTree) {
        let observers = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for observer in observers {
            observer(tree);
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, SourceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const V1: &str = "<dtbook><book><bodymatter><level1 id='a'><h1>One</h1></level1></bodymatter></book></dtbook>";
    const V2: &str = "<dtbook><book><bodymatter><level1 id='a'><h1>Uno</h1></level1>\
                      <level1 id='b'/></bodymatter></book></dtbook>";

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn test_throttled_reparse() {
        let resource = Arc::new(MemoryResource::new(V1, Some(at(100))));
        let doc = SourceDocument::builder("book", resource.clone())
            .update_check_interval(Duration::ZERO)
            .load()
            .unwrap();
        assert_eq!(doc.tree().root().children.len(), 1);
        assert_eq!(doc.tree().source_modified(), Some(at(100)));

        assert!(!doc.check_for_update());
        resource.set(V2, at(200));
        assert!(doc.check_for_update());
        assert_eq!(doc.tree().root().children.len(), 2);
        assert_eq!(doc.tree().source_modified(), Some(at(200)));
    }

    #[test]
    fn test_interval_suppresses_checks() {
        let resource = Arc::new(MemoryResource::new(V1, Some(at(100))));
        let doc = SourceDocument::builder("book", resource.clone())
            .update_check_interval(Duration::from_secs(3600))
            .load()
            .unwrap();
        resource.set(V2, at(200));
        assert!(!doc.check_for_update());
        assert_eq!(doc.tree().root().children.len(), 1);
    }

    #[test]
    fn test_failed_reparse_keeps_tree() {
        let resource = Arc::new(MemoryResource::new(V1, Some(at(100))));
        let doc = SourceDocument::builder("book", resource.clone())
            .update_check_interval(Duration::ZERO)
            .load()
            .unwrap();
        resource.set("<dtbook><book>", at(200));
        assert!(!doc.check_for_update());
        assert_eq!(doc.tree().node(1).title, "One");
    }

    #[test]
    fn test_observers_notified() {
        let resource = Arc::new(MemoryResource::new(V1, Some(at(100))));
        let doc = SourceDocument::builder("book", resource.clone())
            .update_check_interval(Duration::ZERO)
            .load()
            .unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        doc.add_observer(Arc::new(move |tree: &SectionTree| {
            assert_eq!(tree.document_name(), "book");
            seen.fetch_add(1, Ordering::SeqCst);
        }));
        resource.set(V2, at(200));
        doc.check_for_update();
        doc.reload().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_file_resource() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.xml");
        fs::write(&path, V1).unwrap();
        let resource = FileResource::new(&path);
        assert!(resource.last_modified().is_some());
        assert_eq!(resource.path(), Some(path.as_path()));
        let doc = SourceDocument::builder("book", Arc::new(resource))
            .load()
            .unwrap();
        assert_eq!(doc.tree().node(1).id, "a");
    }
}
