//! Stylesheet-backed transforms.
//!
//! A `StylesheetTransform` owns one stylesheet file plus the files it
//! imports. Compilation is lazy and is redone only after the throttled
//! modification check finds a newer file. The check, the invalidation and
//! the recompilation happen under one lock; running the compiled templates
//! does not.

use super::{ParamValue, ResourceResolver, Transform, TransformParameters};
use crate::dom::XmlDocument;
use crate::error::TransformError;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant, SystemTime};

/// Compiles stylesheet source into reusable templates
pub trait StylesheetEngine: Send + Sync {
    /// `system_id` is the stylesheet's own path, the base for relative imports
    fn compile(
        &self,
        source: &[u8],
        system_id: &Path,
        resolver: &ResourceResolver,
    ) -> Result<Arc<dyn Templates>, TransformError>;
}

/// A compiled stylesheet, shareable between threads
pub trait Templates: Send + Sync {
    fn new_transformer(&self) -> Box<dyn StylesheetTransformer>;
}

/// One run of a compiled stylesheet
pub trait StylesheetTransformer {
    fn set_parameter(&mut self, name: &str, value: &ParamValue);

    fn transform(&mut self, input: &XmlDocument) -> Result<XmlDocument, TransformError>;
}

enum State {
    Uncompiled,
    Compiled(Arc<dyn Templates>),
}

struct Guarded {
    state: State,
    last_checked: Option<Instant>,
    last_modified: Option<SystemTime>,
}

pub struct StylesheetTransform {
    name: String,
    path: PathBuf,
    dependents: Vec<PathBuf>,
    engine: Arc<dyn StylesheetEngine>,
    resolver: Arc<ResourceResolver>,
    check_interval: Duration,
    guarded: Mutex<Guarded>,
}

impl fmt::Debug for StylesheetTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StylesheetTransform")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("dependents", &self.dependents)
            .finish_non_exhaustive()
    }
}

impl StylesheetTransform {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        engine: Arc<dyn StylesheetEngine>,
        resolver: Arc<ResourceResolver>,
    ) -> Self {
        StylesheetTransform {
            name: name.into(),
            path: path.into(),
            dependents: Vec::new(),
            engine,
            resolver,
            check_interval: Duration::from_secs(10),
            guarded: Mutex::new(Guarded {
                state: State::Uncompiled,
                last_checked: None,
                last_modified: None,
            }),
        }
    }

    /// Also watch `path` for modifications
    pub fn add_dependent(mut self, path: impl Into<PathBuf>) -> Self {
        self.dependents.push(path.into());
        self
    }

    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dependents(&self) -> &[PathBuf] {
        &self.dependents
    }

    fn newest_modification(&self) -> Option<SystemTime> {
        std::iter::once(&self.path)
            .chain(&self.dependents)
            .filter_map(|p| fs::metadata(p).and_then(|m| m.modified()).ok())
            .max()
    }

    /// Re-stat the files once the interval has passed; a newer time drops
    /// the compiled templates
    fn refresh(&self, guarded: &mut Guarded) {
        let due = guarded
            .last_checked
            .map_or(true, |at| at.elapsed() >= self.check_interval);
        if !due {
            return;
        }
        guarded.last_checked = Some(Instant::now());

        let newest = self.newest_modification();
        let changed = match (newest, guarded.last_modified) {
            (Some(newest), Some(known)) => newest > known,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if changed {
            if matches!(guarded.state, State::Compiled(_)) {
                log::debug!("stylesheet {} changed, recompiling", self.path.display());
            }
            guarded.last_modified = newest;
            guarded.state = State::Uncompiled;
        }
    }

    fn templates(&self) -> Result<Arc<dyn Templates>, TransformError> {
        let mut guarded = self.guarded.lock().unwrap_or_else(PoisonError::into_inner);
        self.refresh(&mut guarded);
        if let State::Compiled(templates) = &guarded.state {
            return Ok(templates.clone());
        }

        let source = fs::read(&self.path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => {
                TransformError::ResourceNotFound(self.path.display().to_string())
            }
            _ => TransformError::configuration(&self.name, format!("{}: {}", self.path.display(), e)),
        })?;
        let templates = self
            .engine
            .compile(&source, &self.path, &self.resolver)
            .map_err(|e| match e {
                TransformError::Configuration { message, .. } => {
                    TransformError::configuration(&self.name, message)
                }
                other => other,
            })?;
        log::debug!("compiled stylesheet {}", self.path.display());
        guarded.state = State::Compiled(templates.clone());
        Ok(templates)
    }
}

impl Transform for StylesheetTransform {
    fn apply(
        &self,
        input: XmlDocument,
        params: Option<&TransformParameters>,
    ) -> Result<Option<XmlDocument>, TransformError> {
        let templates = self.templates()?;
        let mut transformer = templates.new_transformer();
        if let Some(params) = params {
            for (key, value) in params.non_null() {
                transformer.set_parameter(key, value);
            }
        }
        let output = transformer.transform(&input).map_err(|e| match e {
            TransformError::Execution { message, .. } => {
                TransformError::execution(&self.name, message)
            }
            other => other,
        })?;
        Ok(output.root_element_id().is_some().then_some(output))
    }

    fn last_modified(&self, _params: Option<&TransformParameters>) -> Option<SystemTime> {
        let mut guarded = self.guarded.lock().unwrap_or_else(PoisonError::into_inner);
        self.refresh(&mut guarded);
        guarded.last_modified
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Wraps the input root in an element named after the `wrap` parameter
    struct Wrapper {
        compiles: AtomicUsize,
    }

    struct WrapperTemplates;

    struct WrapperTransformer {
        params: BTreeMap<String, String>,
    }

    impl StylesheetEngine for Wrapper {
        fn compile(
            &self,
            source: &[u8],
            system_id: &Path,
            _resolver: &ResourceResolver,
        ) -> Result<Arc<dyn Templates>, TransformError> {
            self.compiles.fetch_add(1, Ordering::SeqCst);
            if source.starts_with(b"bad") {
                return Err(TransformError::configuration(
                    system_id.display().to_string(),
                    "syntax",
                ));
            }
            Ok(Arc::new(WrapperTemplates))
        }
    }

    impl Templates for WrapperTemplates {
        fn new_transformer(&self) -> Box<dyn StylesheetTransformer> {
            Box::new(WrapperTransformer {
                params: BTreeMap::new(),
            })
        }
    }

    impl StylesheetTransformer for WrapperTransformer {
        fn set_parameter(&mut self, name: &str, value: &ParamValue) {
            self.params.insert(name.to_string(), value.to_string());
        }

        fn transform(&mut self, input: &XmlDocument) -> Result<XmlDocument, TransformError> {
            let mut out = XmlDocument::new();
            match self.params.get("wrap") {
                Some(name) if name == "none" => {}
                Some(name) => {
                    let root = out.append_element(0, name, None)?;
                    if let Some(src) = input.root_element_id() {
                        out.import_subtree(root, input, src)?;
                    }
                }
                None => return Err(TransformError::execution("", "no wrap parameter")),
            }
            Ok(out)
        }
    }

    fn setup(contents: &str) -> (tempfile::TempDir, PathBuf, Arc<Wrapper>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wrap.xsl");
        fs::write(&path, contents).unwrap();
        let engine = Arc::new(Wrapper {
            compiles: AtomicUsize::new(0),
        });
        (dir, path, engine)
    }

    fn input() -> XmlDocument {
        XmlDocument::parse_str("<p>x</p>").unwrap()
    }

    #[test]
    fn test_compiles_once_and_binds_parameters() {
        let (_dir, path, engine) = setup("ok");
        let t = StylesheetTransform::new("wrap", &path, engine.clone(), Arc::default());
        let mut params = TransformParameters::new();
        params.set("wrap", "div").set_null("ignored");

        let out = t.apply(input(), Some(&params)).unwrap().unwrap();
        assert_eq!(out.root_name(), Some("div"));
        t.apply(input(), Some(&params)).unwrap();
        assert_eq!(engine.compiles.load(Ordering::SeqCst), 1);
        assert!(t.last_modified(None).is_some());
    }

    #[test]
    fn test_empty_output_is_none() {
        let (_dir, path, engine) = setup("ok");
        let t = StylesheetTransform::new("wrap", &path, engine, Arc::default());
        let params = TransformParameters::new().with("wrap", "none");
        assert!(t.apply(input(), Some(&params)).unwrap().is_none());
    }

    #[test]
    fn test_errors_carry_transform_name() {
        let (_dir, path, engine) = setup("ok");
        let t = StylesheetTransform::new("wrap", &path, engine, Arc::default());
        match t.apply(input(), None) {
            Err(TransformError::Execution { name, .. }) => assert_eq!(name, "wrap"),
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }

        let (_dir, path, engine) = setup("bad");
        let t = StylesheetTransform::new("broken", &path, engine, Arc::default());
        match t.apply(input(), None) {
            Err(TransformError::Configuration { name, .. }) => assert_eq!(name, "broken"),
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_newer_dependent_forces_recompile() {
        let (dir, path, engine) = setup("ok");
        let dependent = dir.path().join("common.xsl");
        fs::write(&dependent, "ok").unwrap();
        let t = StylesheetTransform::new("wrap", &path, engine.clone(), Arc::default())
            .add_dependent(&dependent)
            .with_check_interval(Duration::ZERO);
        let params = TransformParameters::new().with("wrap", "div");

        t.apply(input(), Some(&params)).unwrap();
        let before = t.last_modified(None).unwrap();

        let later = before + Duration::from_secs(60);
        fs::File::options()
            .write(true)
            .open(&dependent)
            .unwrap()
            .set_modified(later)
            .unwrap();
        assert_eq!(t.last_modified(None), Some(later));
        t.apply(input(), Some(&params)).unwrap();
        assert_eq!(engine.compiles.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_concurrent_callers_compile_once_per_change() {
        let (dir, path, engine) = setup("ok");
        let dependent = dir.path().join("common.xsl");
        fs::write(&dependent, "ok").unwrap();
        let t = StylesheetTransform::new("wrap", &path, engine.clone(), Arc::default())
            .add_dependent(&dependent)
            .with_check_interval(Duration::ZERO);
        let params = TransformParameters::new().with("wrap", "div");
        t.apply(input(), Some(&params)).unwrap();

        let later = t.last_modified(None).unwrap() + Duration::from_secs(60);
        fs::File::options()
            .write(true)
            .open(&dependent)
            .unwrap()
            .set_modified(later)
            .unwrap();

        let (t, params) = (&t, &params);
        let seen: Vec<Option<SystemTime>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(move || {
                        let out = t.apply(input(), Some(params)).unwrap().unwrap();
                        assert_eq!(out.root_name(), Some("div"));
                        t.last_modified(None)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(seen.iter().all(|&m| m == Some(later)));
        assert_eq!(engine.compiles.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_missing_stylesheet_is_not_found() {
        let (_dir, path, engine) = setup("ok");
        fs::remove_file(&path).unwrap();
        let t = StylesheetTransform::new("wrap", &path, engine.clone(), Arc::default());
        let params = TransformParameters::new().with("wrap", "div");
        assert!(matches!(
            t.apply(input(), Some(&params)),
            Err(TransformError::ResourceNotFound(_))
        ));
        assert_eq!(engine.compiles.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_check_is_throttled() {
        let (_dir, path, engine) = setup("ok");
        let t = StylesheetTransform::new("wrap", &path, engine, Arc::default())
            .with_check_interval(Duration::from_secs(3600));
        let first = t.last_modified(None).unwrap();
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(first + Duration::from_secs(60))
            .unwrap();
        assert_eq!(t.last_modified(None), Some(first));
    }
}
