//! `PageSession` adapter over headless_chrome.
//!
//! All DOM access funnels through `Tab::evaluate` with helper scripts that
//! `JSON.stringify` their result, so every operation comes back as a plain
//! JSON value regardless of selector kind. Element handles are (selector,
//! index) snapshots re-resolved per operation.

use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::config::BrowserConfig;
use crate::driver::{ElementHandle, PageSession};
use crate::selector::{ConcreteSelector, SelectorKind};
use crate::utils::error::{EngineError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

pub struct ChromeSession {
    // Kept alive for the session's lifetime; dropping it closes the browser.
    _browser: Option<Browser>,
    tab: Arc<Tab>,
}

impl ChromeSession {
    /// Launch a fresh browser and open one tab for the run.
    pub fn launch(config: &BrowserConfig) -> Result<Self> {
        let mut launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(false) // often needed in containerized environments
            .args(vec![
                std::ffi::OsStr::new("--no-sandbox"),
                std::ffi::OsStr::new("--disable-dev-shm-usage"),
                std::ffi::OsStr::new("--disable-gpu"),
                std::ffi::OsStr::new("--disable-extensions"),
                std::ffi::OsStr::new("--disable-background-timer-throttling"),
                std::ffi::OsStr::new("--disable-backgrounding-occluded-windows"),
                std::ffi::OsStr::new("--disable-renderer-backgrounding"),
            ])
            .build()
            .map_err(|e| EngineError::Driver(format!("Failed to create launch options: {e}")))?;

        if let Some(chrome_path) = &config.chrome_path {
            launch_options.path = Some(std::path::PathBuf::from(chrome_path));
        }

        let browser = Browser::new(launch_options)
            .map_err(|e| EngineError::Driver(format!("Failed to launch browser: {e}")))?;
        let tab = browser
            .new_tab()
            .map_err(|e| EngineError::Driver(format!("Failed to create tab: {e}")))?;
        tab.set_user_agent(&config.user_agent, None, None)
            .map_err(|e| EngineError::Driver(format!("Failed to set user agent: {e}")))?;

        Ok(Self {
            _browser: Some(browser),
            tab,
        })
    }

    /// Wrap an already-open tab supplied by the caller.
    pub fn attach(tab: Arc<Tab>) -> Self {
        Self {
            _browser: None,
            tab,
        }
    }

    /// Evaluate `expression` in the page, round-tripping the result through
    /// `JSON.stringify` so objects and arrays come back by value.
    fn eval_json(&self, expression: &str) -> Result<Value> {
        let wrapped = format!(
            "JSON.stringify((() => {{ const __r = ({expression}); \
             return __r === undefined ? null : __r; }})())"
        );
        let result = self
            .tab
            .evaluate(&wrapped, false)
            .map_err(|e| driver_error("evaluate", e))?;

        match result.value {
            Some(Value::String(text)) => Ok(serde_json::from_str(&text)?),
            _ => Ok(Value::Null),
        }
    }

    /// Run `body` against the element a handle points at. `body` sees the
    /// element as `el` and must return a JSON-serializable value; a `null`
    /// result means the handle no longer resolves.
    fn eval_on_element(&self, element: &ElementHandle, body: &str) -> Result<Value> {
        let expression = format!(
            "(() => {{ const els = {collector}; const el = els[{index}]; \
             if (!el) return null; {body} }})()",
            collector = collector_script(&element.selector),
            index = element.index,
        );
        self.eval_json(&expression)
    }

    fn count_matches(&self, selector: &ConcreteSelector) -> Result<usize> {
        let expression = format!("({}).length", collector_script(selector));
        Ok(self.eval_json(&expression)?.as_u64().unwrap_or(0) as usize)
    }
}

/// JS expression yielding the array of nodes a selector matches, in document
/// order.
fn collector_script(selector: &ConcreteSelector) -> String {
    match selector.kind {
        SelectorKind::ClassName => format!(
            "Array.from(document.querySelectorAll({}))",
            js_string(&selector.as_css().unwrap_or_default())
        ),
        SelectorKind::Xpath => format!(
            "(() => {{ const result = document.evaluate({query}, document, null, \
             XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); const nodes = []; \
             for (let i = 0; i < result.snapshotLength; i++) {{ \
             nodes.push(result.snapshotItem(i)); }} return nodes; }})()",
            query = js_string(&selector.value)
        ),
    }
}

/// Quote `s` as a JS string literal.
fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// Lost transport means the session is unusable; anything else is scoped to
/// the operation.
fn driver_error(op: &str, err: impl std::fmt::Display) -> EngineError {
    let message = format!("{op}: {err}");
    let lower = message.to_lowercase();
    if lower.contains("websocket") || lower.contains("channel") || lower.contains("connection") {
        EngineError::FatalContext(message)
    } else {
        EngineError::Driver(message)
    }
}

#[async_trait]
impl PageSession for ChromeSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .map_err(|e| driver_error("navigate", e))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| driver_error("wait_until_navigated", e))?;
        Ok(())
    }

    async fn find_elements(&self, selector: &ConcreteSelector) -> Result<Vec<ElementHandle>> {
        let count = self.count_matches(selector)?;
        Ok((0..count)
            .map(|index| ElementHandle::new(selector.clone(), index))
            .collect())
    }

    async fn wait_for_element(
        &self,
        selector: &ConcreteSelector,
        timeout: Duration,
    ) -> Result<ElementHandle> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.count_matches(selector)? > 0 {
                return Ok(ElementHandle::new(selector.clone(), 0));
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(EngineError::ElementNotFound {
                    selector: selector.to_string(),
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn click(&self, element: &ElementHandle) -> Result<()> {
        let result = self.eval_on_element(
            element,
            "el.scrollIntoView({block: 'center', inline: 'nearest'}); \
             el.click(); return true;",
        )?;
        if result.is_null() {
            return Err(EngineError::ElementNotFound {
                selector: element.selector.to_string(),
            });
        }
        Ok(())
    }

    async fn hover(&self, element: &ElementHandle) -> Result<()> {
        let result = self.eval_on_element(
            element,
            "el.dispatchEvent(new MouseEvent('mouseover', {bubbles: true})); \
             return true;",
        )?;
        if result.is_null() {
            return Err(EngineError::ElementNotFound {
                selector: element.selector.to_string(),
            });
        }
        Ok(())
    }

    async fn set_style_property(
        &self,
        element: &ElementHandle,
        property: &str,
        value: &str,
    ) -> Result<()> {
        let body = format!(
            "el.style.setProperty({}, {}); return true;",
            js_string(property),
            js_string(value)
        );
        self.eval_on_element(element, &body)?;
        Ok(())
    }

    async fn text(&self, element: &ElementHandle) -> Result<String> {
        let result = self.eval_on_element(
            element,
            "return el.innerText !== undefined ? el.innerText : el.textContent;",
        )?;
        match result {
            Value::String(text) => Ok(text),
            Value::Null => Err(EngineError::ElementNotFound {
                selector: element.selector.to_string(),
            }),
            other => Ok(other.to_string()),
        }
    }

    async fn execute_script(&self, script: &str) -> Result<Value> {
        self.eval_json(script)
    }
}
