//! Stylesheet file lookup.

use crate::error::TransformError;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// Finds stylesheets and their imports in a list of search directories.
/// Directories are tried in registration order.
#[derive(Debug, Default)]
pub struct ResourceResolver {
    directories: RwLock<Vec<PathBuf>>,
}

impl ResourceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_directories<I, P>(directories: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        ResourceResolver {
            directories: RwLock::new(directories.into_iter().map(Into::into).collect()),
        }
    }

    /// Add a search directory; adding one twice has no effect
    pub fn add_directory(&self, directory: impl Into<PathBuf>) {
        let directory = directory.into();
        let mut dirs = self
            .directories
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if !dirs.contains(&directory) {
            log::debug!("stylesheet search directory added: {}", directory.display());
            dirs.push(directory);
        }
    }

    pub fn directories(&self) -> Vec<PathBuf> {
        self.directories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Locate `name` in the search directories. Absolute paths are taken
    /// as they are if the file exists.
    pub fn find(&self, name: &str) -> Result<PathBuf, TransformError> {
        let path = Path::new(name);
        if path.is_absolute() {
            return if path.is_file() {
                Ok(path.to_path_buf())
            } else {
                Err(TransformError::ResourceNotFound(name.to_string()))
            };
        }
        let dirs = self
            .directories
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        dirs.iter()
            .map(|dir| dir.join(path))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| TransformError::ResourceNotFound(name.to_string()))
    }

    /// Resolve an import or include `href` from the stylesheet at `base`:
    /// search directories first, then the referencing file's directory.
    pub fn resolve_href(&self, href: &str, base: &Path) -> Result<PathBuf, TransformError> {
        if let Ok(found) = self.find(href) {
            return Ok(found);
        }
        let relative = base.parent().unwrap_or_else(|| Path::new(".")).join(href);
        if relative.is_file() {
            Ok(relative)
        } else {
            Err(TransformError::ResourceNotFound(href.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_find_searches_directories_in_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::write(second.path().join("a.xsl"), "x").unwrap();
        fs::write(first.path().join("b.xsl"), "x").unwrap();
        fs::write(second.path().join("b.xsl"), "x").unwrap();

        let resolver = ResourceResolver::new();
        resolver.add_directory(first.path());
        resolver.add_directory(second.path());
        resolver.add_directory(first.path());
        assert_eq!(resolver.directories().len(), 2);

        assert_eq!(resolver.find("a.xsl").unwrap(), second.path().join("a.xsl"));
        assert_eq!(resolver.find("b.xsl").unwrap(), first.path().join("b.xsl"));
        assert!(matches!(
            resolver.find("c.xsl"),
            Err(TransformError::ResourceNotFound(name)) if name == "c.xsl"
        ));
    }

    #[test]
    fn test_resolve_href_falls_back_to_base() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("lib")).unwrap();
        fs::write(dir.path().join("lib").join("common.xsl"), "x").unwrap();
        let base = dir.path().join("lib").join("main.xsl");

        let resolver = ResourceResolver::new();
        assert_eq!(
            resolver.resolve_href("common.xsl", &base).unwrap(),
            dir.path().join("lib").join("common.xsl")
        );
        assert!(resolver.resolve_href("missing.xsl", &base).is_err());
    }
}
