//! Capability traits the engine is written against.
//!
//! The engine never owns a browser process or an HTTP stack; callers hand it
//! one `PageSession` and one `ApiClient` for the lifetime of a run. Adapters
//! over concrete drivers live in `chrome` and `http`.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::action::RequestMethod;
use crate::selector::ConcreteSelector;
use crate::utils::error::Result;

/// Opaque reference to one element matched by a selector.
///
/// Handles are snapshot references: they identify the n-th match of a
/// selector at lookup time and go stale if the DOM reshuffles underneath.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    pub selector: ConcreteSelector,
    pub index: usize,
}

impl ElementHandle {
    pub fn new(selector: ConcreteSelector, index: usize) -> Self {
        Self { selector, index }
    }
}

/// Browser-side capabilities required by the engine.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageSession: Send + Sync {
    /// Navigate the session to `url` and wait for the load to settle.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// All current matches for `selector`, in document order.
    async fn find_elements(&self, selector: &ConcreteSelector) -> Result<Vec<ElementHandle>>;

    /// Wait until `selector` has at least one interactable match.
    ///
    /// Fails with `ElementNotFound` when the bounded wait elapses.
    async fn wait_for_element(
        &self,
        selector: &ConcreteSelector,
        timeout: Duration,
    ) -> Result<ElementHandle>;

    async fn click(&self, element: &ElementHandle) -> Result<()>;

    async fn hover(&self, element: &ElementHandle) -> Result<()>;

    /// Set an inline style property on one element. Idempotent.
    async fn set_style_property(
        &self,
        element: &ElementHandle,
        property: &str,
        value: &str,
    ) -> Result<()>;

    /// Visible text content of one element.
    async fn text(&self, element: &ElementHandle) -> Result<String>;

    /// Evaluate a script in the page and return its JSON value.
    async fn execute_script(&self, script: &str) -> Result<Value>;
}

/// Response from the HTTP collaborator.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    /// Parsed JSON body; `Value::Null` when the response carried none.
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP-side capability required by discovery steps and API crawls.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn request(
        &self,
        method: RequestMethod,
        url: &str,
        headers: &[(String, String)],
        payload: &Value,
    ) -> Result<ApiResponse>;
}
