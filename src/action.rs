//! Typed action model: the authoring boundary.
//!
//! Actions arrive as plain structured data (JSON) from the authoring layer,
//! are validated once, and are immutable afterwards. A run owns its sequence
//! exclusively; downstream executors assume a validated action is well-formed.

use serde::{Deserialize, Serialize};

use crate::selector::{SelectorKind, SelectorTemplate};
use crate::utils::error::{EngineError, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ActionType {
    Click,
    Hover,
    Hide,
    Delay,
    Crawl,
    ClickList,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Click => "click",
            ActionType::Hover => "hover",
            ActionType::Hide => "hide",
            ActionType::Delay => "delay",
            ActionType::Crawl => "crawl",
            ActionType::ClickList => "click-list",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Head,
}

/// One of the two page addressing modes, as authored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Xpath(String),
    ClassName(String),
}

impl Target {
    pub fn template(&self) -> SelectorTemplate {
        match self {
            Target::Xpath(pattern) => SelectorTemplate::xpath(pattern.clone()),
            Target::ClassName(pattern) => SelectorTemplate::class_name(pattern.clone()),
        }
    }

    pub fn kind(&self) -> SelectorKind {
        match self {
            Target::Xpath(_) => SelectorKind::Xpath,
            Target::ClassName(_) => SelectorKind::ClassName,
        }
    }
}

/// Inclusive index range for one enumeration dimension.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexRange {
    pub start: i64,
    pub end: i64,
}

impl IndexRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        (self.end - self.start + 1).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

fn default_delay() -> f64 {
    1.0
}

/// One step in an automation sequence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: ActionType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,

    #[serde(default = "default_delay")]
    pub delay_seconds: f64,

    /// One range per target-template placeholder; empty means the action is
    /// not index-parametrized.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub index_ranges: Vec<IndexRange>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_method: Option<RequestMethod>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination_size: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_path: Option<String>,

    /// "Load more" control for harvesting crawls. Absent means the page
    /// loads more content on scroll.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_more: Option<Target>,

    /// Arity-1 template locating a numeric companion element per extracted
    /// item (resolved with the 1-based item index). Crawl only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_template: Option<Target>,

    /// Nested sequence, executed per discovered URL. Only `click-list`
    /// actions carry one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Action>,
}

impl Action {
    pub fn new(kind: ActionType) -> Self {
        Self {
            kind,
            target: None,
            delay_seconds: default_delay(),
            index_ranges: Vec::new(),
            request_method: None,
            pagination_size: None,
            key_path: None,
            load_more: None,
            value_template: None,
            actions: Vec::new(),
        }
    }

    /// Short description used in log and error context.
    pub fn describe(&self) -> String {
        match &self.target {
            Some(Target::Xpath(p)) => format!("{}(xpath:{})", self.kind.as_str(), p),
            Some(Target::ClassName(p)) => format!("{}(class:{})", self.kind.as_str(), p),
            None => self.kind.as_str().to_string(),
        }
    }

    /// Whether this action, placed at the head of a sequence, is an API
    /// discovery step (URL-list fetch) rather than a browser interaction.
    pub fn is_discovery(&self) -> bool {
        self.kind == ActionType::Crawl && self.key_path.is_some() && self.target.is_none()
    }

    /// Enforces the model invariants. Runs once at authoring time.
    pub fn validate(&self) -> Result<()> {
        if !(self.delay_seconds >= 0.0 && self.delay_seconds.is_finite()) {
            return Err(EngineError::Validation(format!(
                "{}: delay_seconds must be a finite non-negative number",
                self.describe()
            )));
        }

        if self.pagination_size == Some(0) {
            return Err(EngineError::Validation(format!(
                "{}: pagination_size must be positive",
                self.describe()
            )));
        }

        for range in &self.index_ranges {
            if range.is_empty() {
                return Err(EngineError::Validation(format!(
                    "{}: index range {}..={} is inverted",
                    self.describe(),
                    range.start,
                    range.end
                )));
            }
        }

        match self.kind {
            // Indexed interactions: one range per target placeholder.
            ActionType::Click | ActionType::Hover => {
                let target = self.target.as_ref().ok_or_else(|| EngineError::MissingTarget {
                    action: self.describe(),
                })?;
                self.check_target_template(target, self.index_ranges.len())?;
            }
            ActionType::Hide => {
                let target = self.target.as_ref().ok_or_else(|| EngineError::MissingTarget {
                    action: self.describe(),
                })?;
                if !self.index_ranges.is_empty() {
                    return Err(EngineError::Validation(format!(
                        "{}: hide actions are not index-parametrized",
                        self.describe()
                    )));
                }
                self.check_target_template(target, 0)?;
            }
            ActionType::Delay => {}
            // A crawl target addresses the flat element list; its single
            // optional range slices that list rather than filling placeholders.
            ActionType::Crawl => {
                match (&self.target, &self.key_path) {
                    (Some(target), _) => {
                        self.check_target_template(target, 0)?;
                        if self.index_ranges.len() > 1 {
                            return Err(EngineError::Validation(format!(
                                "{}: crawl actions take at most one index range",
                                self.describe()
                            )));
                        }
                    }
                    (None, Some(_)) => {}
                    (None, None) => {
                        return Err(EngineError::MissingKeyPath {
                            action: self.describe(),
                        });
                    }
                }
            }
            ActionType::ClickList => {
                if self.key_path.is_none() {
                    return Err(EngineError::MissingKeyPath {
                        action: self.describe(),
                    });
                }
            }
        }

        if let Some(load_more) = &self.load_more {
            if load_more.template().arity() != 0 {
                return Err(EngineError::Validation(format!(
                    "{}: load_more selector must not carry placeholders",
                    self.describe()
                )));
            }
        }

        if let Some(value_template) = &self.value_template {
            let arity = value_template.template().arity();
            if arity != 1 {
                return Err(EngineError::TemplateArityMismatch {
                    expected: 1,
                    got: arity,
                });
            }
        }

        if self.kind != ActionType::ClickList && !self.actions.is_empty() {
            return Err(EngineError::Validation(format!(
                "{}: only click-list actions carry a nested sequence",
                self.describe()
            )));
        }

        for nested in &self.actions {
            nested.validate()?;
        }

        Ok(())
    }

    fn check_target_template(&self, target: &Target, expected_indices: usize) -> Result<()> {
        let template = target.template();
        let arity = template.arity();
        if arity != expected_indices {
            return Err(EngineError::TemplateArityMismatch {
                expected: arity,
                got: expected_indices,
            });
        }

        // Class-name selectors must form a parseable CSS selector once the
        // placeholders are filled in.
        if target.kind() == SelectorKind::ClassName {
            let sample_indices: Vec<i64> = vec![1; arity];
            let sample = template.resolve(&sample_indices)?;
            let css = sample.as_css().unwrap_or_default();
            if scraper::Selector::parse(&css).is_err() {
                return Err(EngineError::Validation(format!(
                    "{}: '{}' is not a valid class selector",
                    self.describe(),
                    sample.value
                )));
            }
        }

        Ok(())
    }
}

/// An owned, ordered action sequence — the unit the orchestrator consumes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ActionSequence {
    pub actions: Vec<Action>,
}

impl ActionSequence {
    pub fn new(actions: Vec<Action>) -> Self {
        Self { actions }
    }

    /// Parses authoring JSON. An unrecognized `type` tag surfaces as
    /// `UnknownActionType` rather than a generic serde error.
    pub fn from_json(input: &str) -> Result<Self> {
        serde_json::from_str::<Self>(input).map_err(|err| {
            let message = err.to_string();
            if message.contains("unknown variant") {
                let name = message
                    .split('`')
                    .nth(1)
                    .unwrap_or("unrecognized")
                    .to_string();
                EngineError::UnknownActionType(name)
            } else {
                EngineError::Serialization(err)
            }
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        for action in &self.actions {
            action.validate()?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
