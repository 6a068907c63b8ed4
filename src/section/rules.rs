//! Rule tables describing which elements become sections.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How one element type takes part in the section structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Rule {
    /// Direct child whose text becomes the section title
    pub title_child: Option<String>,
    /// Direct child whose text becomes the subtitle
    pub sub_title_child: Option<String>,
    /// Descendant element type that carries the structure further down
    pub structural_child: Option<String>,
    /// `true`: every structural child is a new section.
    /// `false`: exactly one structural child, which continues this section.
    pub multi_valued: bool,
}

impl Rule {
    /// A rule with no structural child
    pub fn leaf() -> Self {
        Rule::default()
    }

    /// Continue into a single wrapper child without creating a section
    pub fn pass_through(child: &str) -> Self {
        Rule {
            structural_child: Some(child.to_string()),
            ..Rule::default()
        }
    }

    /// Create one section per `child` element
    pub fn sections(child: &str) -> Self {
        Rule {
            structural_child: Some(child.to_string()),
            multi_valued: true,
            ..Rule::default()
        }
    }

    pub fn with_title(mut self, title_child: &str) -> Self {
        self.title_child = Some(title_child.to_string());
        self
    }

    pub fn with_sub_title(mut self, sub_title_child: &str) -> Self {
        self.sub_title_child = Some(sub_title_child.to_string());
        self
    }
}

/// Element local name to `Rule`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementRules {
    rules: HashMap<String, Rule>,
}

impl ElementRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, element: &str, rule: Rule) -> &mut Self {
        self.rules.insert(element.to_string(), rule);
        self
    }

    pub fn with(mut self, element: &str, rule: Rule) -> Self {
        self.insert(element, rule);
        self
    }

    pub fn get(&self, element: &str) -> Option<&Rule> {
        self.rules.get(element)
    }

    /// The DTBook table: `dtbook` > `book` > `bodymatter` > `level1`..`level4`
    pub fn dtbook() -> Self {
        let mut rules = ElementRules::new();
        rules
            .insert("dtbook", Rule::pass_through("book"))
            .insert("book", Rule::pass_through("bodymatter").with_title("doctitle"))
            .insert("bodymatter", Rule::sections("level1"));
        for level in 1..=4 {
            let rule = if level < 4 {
                Rule::sections(&format!("level{}", level + 1))
            } else {
                Rule::leaf()
            };
            rules.insert(
                &format!("level{}", level),
                rule.with_title(&format!("h{}", level))
                    .with_sub_title("covertitle"),
            );
        }
        rules
    }
}
