use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::error::{EngineError, Result};

/// How a selector addresses the page: structural path or class attribute.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SelectorKind {
    Xpath,
    ClassName,
}

/// A parametrizable locator with positional `{0}`, `{1}`, … placeholders.
///
/// Arity is the highest placeholder index plus one; a template with no
/// placeholders resolves with an empty index slice. The same placeholder may
/// appear more than once and is substituted at every occurrence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectorTemplate {
    pub kind: SelectorKind,
    pub pattern: String,
}

/// A fully resolved selector, ready to hand to a page session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ConcreteSelector {
    pub kind: SelectorKind,
    pub value: String,
}

fn placeholder_regex() -> Regex {
    Regex::new(r"\{(\d+)\}").unwrap()
}

impl SelectorTemplate {
    pub fn xpath(pattern: impl Into<String>) -> Self {
        Self {
            kind: SelectorKind::Xpath,
            pattern: pattern.into(),
        }
    }

    pub fn class_name(pattern: impl Into<String>) -> Self {
        Self {
            kind: SelectorKind::ClassName,
            pattern: pattern.into(),
        }
    }

    /// Number of indices `resolve` requires.
    pub fn arity(&self) -> usize {
        placeholder_regex()
            .captures_iter(&self.pattern)
            .filter_map(|c| c.get(1).and_then(|m| m.as_str().parse::<usize>().ok()))
            .map(|idx| idx + 1)
            .max()
            .unwrap_or(0)
    }

    /// Substitutes `indices` positionally into the placeholders.
    ///
    /// Fails with `TemplateArityMismatch` unless exactly `arity()` indices
    /// are supplied. Pure: the template is unchanged.
    pub fn resolve(&self, indices: &[i64]) -> Result<ConcreteSelector> {
        let expected = self.arity();
        if indices.len() != expected {
            return Err(EngineError::TemplateArityMismatch {
                expected,
                got: indices.len(),
            });
        }

        let value = placeholder_regex()
            .replace_all(&self.pattern, |caps: &regex::Captures<'_>| {
                let idx: usize = caps[1].parse().unwrap_or(0);
                indices[idx].to_string()
            })
            .into_owned();

        Ok(ConcreteSelector {
            kind: self.kind,
            value,
        })
    }
}

impl ConcreteSelector {
    pub fn xpath(value: impl Into<String>) -> Self {
        Self {
            kind: SelectorKind::Xpath,
            value: value.into(),
        }
    }

    pub fn class_name(value: impl Into<String>) -> Self {
        Self {
            kind: SelectorKind::ClassName,
            value: value.into(),
        }
    }

    /// CSS rendition for class-name selectors; xpath selectors have none.
    pub fn as_css(&self) -> Option<String> {
        match self.kind {
            SelectorKind::ClassName => Some(format!(".{}", self.value)),
            SelectorKind::Xpath => None,
        }
    }
}

impl fmt::Display for ConcreteSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            SelectorKind::Xpath => write!(f, "xpath:{}", self.value),
            SelectorKind::ClassName => write!(f, "class:{}", self.value),
        }
    }
}

/// Pulls the first class token out of a pasted `class="…"` HTML fragment.
///
/// Authoring convenience: users paste element markup straight from devtools.
/// Plain class names pass through untouched.
pub fn class_from_html(input: &str) -> String {
    let re = Regex::new(r#"class\s*=\s*"([^"]+)""#).unwrap();
    if let Some(caps) = re.captures(input) {
        if let Some(first) = caps[1].split_whitespace().next() {
            return first.to_string();
        }
    }
    input.trim().to_string()
}
