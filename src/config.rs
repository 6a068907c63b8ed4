//! Service configuration from TOML

use crate::dom::NamespaceContext;
use crate::error::ConfigError;
use crate::section::ElementRules;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings for an `XmlService`
///
/// ```toml
/// update_check_interval_secs = 10
/// transformer_directories = ["xsl", "/usr/share/sectiondom/xsl"]
/// cache_capacity = 1000
/// xpath_cache_capacity = 256
///
/// [namespaces]
/// m = "http://www.w3.org/1998/Math/MathML"
///
/// # Replaces the DTBook table when present
/// [rules.article]
/// structural_child = "section"
/// multi_valued = true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Minimum seconds between modification-time checks of a source
    /// document or stylesheet
    pub update_check_interval_secs: u64,

    /// Directories searched, in order, for stylesheets
    pub transformer_directories: Vec<PathBuf>,

    /// Maximum number of cached transform results
    pub cache_capacity: usize,

    /// Maximum number of cached compiled XPath expressions
    pub xpath_cache_capacity: usize,

    /// Extra XPath prefix bindings on top of the defaults
    pub namespaces: BTreeMap<String, String>,

    /// Section rule table; `None` means `ElementRules::dtbook()`
    pub rules: Option<ElementRules>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            update_check_interval_secs: 10,
            transformer_directories: Vec::new(),
            cache_capacity: 1000,
            xpath_cache_capacity: 256,
            namespaces: BTreeMap::new(),
            rules: None,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ServiceConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "cache_capacity".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.xpath_cache_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "xpath_cache_capacity".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if let Some(prefix) = self.namespaces.keys().find(|p| p.is_empty() || p.contains(':')) {
            return Err(ConfigError::Invalid {
                key: format!("namespaces.{}", prefix),
                message: "prefix must be a non-empty NCName".to_string(),
            });
        }
        Ok(())
    }

    pub fn update_check_interval(&self) -> Duration {
        Duration::from_secs(self.update_check_interval_secs)
    }

    /// The configured rule table, or the DTBook one
    pub fn element_rules(&self) -> ElementRules {
        self.rules.clone().unwrap_or_else(ElementRules::dtbook)
    }

    /// Default prefix bindings plus the configured ones
    pub fn namespace_context(&self) -> NamespaceContext {
        let mut context = NamespaceContext::default();
        for (prefix, uri) in &self.namespaces {
            context.bind(prefix, uri);
        }
        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ns;
    use crate::section::Rule;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::from_toml_str("").unwrap();
        assert_eq!(config, ServiceConfig::default());
        assert_eq!(config.update_check_interval(), Duration::from_secs(10));
        assert_eq!(config.cache_capacity, 1000);
        assert_eq!(config.xpath_cache_capacity, 256);
    }

    #[test]
    fn test_namespaces_extend_defaults() {
        let config = ServiceConfig::from_toml_str(
            r#"
            transformer_directories = ["xsl"]
            [namespaces]
            m = "http://www.w3.org/1998/Math/MathML"
            "#,
        )
        .unwrap();
        let context = config.namespace_context();
        assert_eq!(context.uri_for("m"), Some("http://www.w3.org/1998/Math/MathML"));
        assert_eq!(context.uri_for("dtb"), Some(ns::DTBOOK));
        assert_eq!(config.transformer_directories, vec![PathBuf::from("xsl")]);
    }

    #[test]
    fn test_rule_table_from_config() {
        assert_eq!(ServiceConfig::default().element_rules(), ElementRules::dtbook());
        let config = ServiceConfig::from_toml_str(
            r#"
            [rules.article]
            structural_child = "section"
            multi_valued = true
            [rules.section]
            "#,
        )
        .unwrap();
        let rules = config.element_rules();
        assert_eq!(rules.get("article"), Some(&Rule::sections("section")));
        assert_eq!(rules.get("section"), Some(&Rule::leaf()));
        assert!(rules.get("dtbook").is_none());
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            ServiceConfig::from_toml_str("cache_capacity = 0"),
            Err(ConfigError::Invalid { key, .. }) if key == "cache_capacity"
        ));
        assert!(matches!(
            ServiceConfig::from_toml_str("unknown = 1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ServiceConfig::load("/nonexistent/sectiondom.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
