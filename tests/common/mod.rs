// Scripted in-memory page model shared by the end-to-end tests.
//
// Each URL maps to a page whose items are revealed batch by batch, either by
// clicking a load-more control or by scrolling, mirroring how paginated
// review surfaces behave.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use magpie::driver::{ElementHandle, PageSession};
use magpie::selector::{ConcreteSelector, SelectorKind};
use magpie::utils::error::{EngineError, Result};

#[derive(Clone, Default)]
pub struct PageSpec {
    /// Class of the extractable items.
    pub item_class: String,
    /// Item texts, one batch per load step. The first batch is visible on
    /// page load.
    pub batches: Vec<Vec<String>>,
    /// XPath of a load-more control, present while unrevealed batches remain.
    pub load_more_xpath: Option<String>,
    /// Reveal the next batch on scroll instead of on click.
    pub reveal_on_scroll: bool,
    /// Extra hideable elements: (class name, match count).
    pub overlay: Option<(String, usize)>,
}

struct PageState {
    spec: PageSpec,
    revealed: usize,
}

impl PageState {
    fn new(spec: PageSpec) -> Self {
        let revealed = if spec.batches.is_empty() { 0 } else { 1 };
        Self { spec, revealed }
    }

    fn visible_items(&self) -> Vec<String> {
        self.spec
            .batches
            .iter()
            .take(self.revealed)
            .flatten()
            .cloned()
            .collect()
    }

    fn has_more(&self) -> bool {
        self.revealed < self.spec.batches.len()
    }

    fn reveal_next(&mut self) {
        if self.has_more() {
            self.revealed += 1;
        }
    }

    fn scroll_height(&self) -> i64 {
        (self.revealed as i64 + 1) * 1000
    }
}

#[derive(Default)]
pub struct FakePage {
    pages: Mutex<HashMap<String, PageState>>,
    current: Mutex<String>,
    pub visited: Mutex<Vec<String>>,
    pub hidden: Mutex<Vec<String>>,
    pub clicked: Mutex<Vec<String>>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_page(&self, url: &str, spec: PageSpec) {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), PageState::new(spec));
    }

    fn with_current<T>(&self, f: impl FnOnce(&mut PageState) -> T) -> T {
        let current = self.current.lock().unwrap().clone();
        let mut pages = self.pages.lock().unwrap();
        let state = pages
            .entry(current)
            .or_insert_with(|| PageState::new(PageSpec::default()));
        f(state)
    }

    fn matches_load_more(&self, selector: &ConcreteSelector) -> bool {
        selector.kind == SelectorKind::Xpath
            && self.with_current(|state| {
                state.spec.load_more_xpath.as_deref() == Some(selector.value.as_str())
            })
    }
}

#[async_trait]
impl PageSession for FakePage {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.visited.lock().unwrap().push(url.to_string());
        *self.current.lock().unwrap() = url.to_string();
        self.pages
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_insert_with(|| PageState::new(PageSpec::default()));
        Ok(())
    }

    async fn find_elements(&self, selector: &ConcreteSelector) -> Result<Vec<ElementHandle>> {
        let count = self.with_current(|state| {
            match selector.kind {
                SelectorKind::ClassName if selector.value == state.spec.item_class => {
                    state.visible_items().len()
                }
                SelectorKind::ClassName => state
                    .spec
                    .overlay
                    .as_ref()
                    .filter(|(class, _)| *class == selector.value)
                    .map_or(0, |(_, n)| *n),
                SelectorKind::Xpath => {
                    let is_control =
                        state.spec.load_more_xpath.as_deref() == Some(selector.value.as_str());
                    if is_control && state.has_more() { 1 } else { 0 }
                }
            }
        });
        Ok((0..count)
            .map(|index| ElementHandle::new(selector.clone(), index))
            .collect())
    }

    async fn wait_for_element(
        &self,
        selector: &ConcreteSelector,
        _timeout: Duration,
    ) -> Result<ElementHandle> {
        self.find_elements(selector)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::ElementNotFound {
                selector: selector.to_string(),
            })
    }

    async fn click(&self, element: &ElementHandle) -> Result<()> {
        self.clicked
            .lock()
            .unwrap()
            .push(element.selector.value.clone());
        if self.matches_load_more(&element.selector) {
            self.with_current(|state| state.reveal_next());
        }
        Ok(())
    }

    async fn hover(&self, _element: &ElementHandle) -> Result<()> {
        Ok(())
    }

    async fn set_style_property(
        &self,
        element: &ElementHandle,
        property: &str,
        value: &str,
    ) -> Result<()> {
        self.hidden.lock().unwrap().push(format!(
            "{}[{}] {property}={value}",
            element.selector.value, element.index
        ));
        Ok(())
    }

    async fn text(&self, element: &ElementHandle) -> Result<String> {
        self.with_current(|state| {
            state
                .visible_items()
                .get(element.index)
                .cloned()
                .ok_or_else(|| EngineError::ElementNotFound {
                    selector: element.selector.to_string(),
                })
        })
    }

    async fn execute_script(&self, script: &str) -> Result<Value> {
        if script.contains("scrollTo") {
            self.with_current(|state| {
                if state.spec.reveal_on_scroll {
                    state.reveal_next();
                }
            });
            return Ok(Value::Null);
        }
        if script.contains("scrollHeight") {
            return Ok(json!(self.with_current(|state| state.scroll_height())));
        }
        Ok(Value::Null)
    }
}
