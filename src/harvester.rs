//! Incremental-loading harvester.
//!
//! Drives an extract → trigger → check-growth loop against a live page until
//! a target count is met, growth stalls, or no further "load more" mechanism
//! is available. Supports both trigger styles found on paginated surfaces:
//! a load-more control and infinite scroll.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use crate::driver::PageSession;
use crate::logging::RunLog;
use crate::selector::{ConcreteSelector, SelectorTemplate};
use crate::utils::error::{EngineError, Result};

/// One extracted item. Uniqueness is full structural equality; ordering is
/// insertion order everywhere.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ExtractedRecord {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<i64>,
}

impl ExtractedRecord {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            value: None,
        }
    }

    pub fn with_value(text: impl Into<String>, value: i64) -> Self {
        Self {
            text: text.into(),
            value: Some(value),
        }
    }
}

/// First run of decimal digits in `text`, or `None`.
///
/// Deliberately narrow: value elements carry free text like "리뷰 12건" and
/// the engine only ever wants that first integer.
pub fn first_integer(text: &str) -> Option<i64> {
    Regex::new(r"\d+")
        .unwrap()
        .find(text)
        .and_then(|m| m.as_str().parse::<i64>().ok())
}

/// How the page is asked to load more content.
#[derive(Debug, Clone)]
pub enum LoadTrigger {
    /// A "load more" control to click between extraction passes.
    Button(ConcreteSelector),
    /// Infinite scroll; growth is observed through the document scroll height.
    Scroll,
}

/// Parameters for one harvest loop.
#[derive(Debug, Clone)]
pub struct HarvestPlan {
    pub item_selector: ConcreteSelector,
    /// Arity-1 template resolved with the 1-based item index; its text goes
    /// through `first_integer`. Absent for text-only harvests.
    pub value_selector: Option<SelectorTemplate>,
    pub trigger: LoadTrigger,
    pub target_count: usize,
    /// Fixed delay after a trigger so new content can materialize. Doubles as
    /// backpressure against the remote site.
    pub settle: Duration,
    /// Bounded wait for the trigger control or a value element.
    pub element_wait: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    TargetReached,
    NoGrowth,
    NoMoreControl,
    ControlTimeout,
}

#[derive(Debug)]
pub struct HarvestOutcome {
    pub records: Vec<ExtractedRecord>,
    pub reason: StopReason,
}

/// Mutable accumulator for one loop. Owned exclusively by the loop and
/// discarded on exit.
struct HarvestState {
    collected: Vec<ExtractedRecord>,
    seen: HashSet<ExtractedRecord>,
    previous_count: usize,
    previous_scroll_height: i64,
}

pub struct Harvester<'a> {
    page: &'a dyn PageSession,
    log: &'a dyn RunLog,
}

impl<'a> Harvester<'a> {
    pub fn new(page: &'a dyn PageSession, log: &'a dyn RunLog) -> Self {
        Self { page, log }
    }

    pub async fn run(&self, plan: &HarvestPlan) -> Result<HarvestOutcome> {
        let mut state = HarvestState {
            collected: Vec::new(),
            seen: HashSet::new(),
            previous_count: 0,
            previous_scroll_height: 0,
        };
        if matches!(plan.trigger, LoadTrigger::Scroll) {
            state.previous_scroll_height = self.scroll_height().await?;
        }

        let reason = loop {
            self.extract(plan, &mut state).await?;

            if state.collected.len() >= plan.target_count {
                break StopReason::TargetReached;
            }

            if let Some(reason) = self.trigger(plan, &mut state).await? {
                break reason;
            }

            if state.collected.len() == state.previous_count {
                self.log.log("No new records loaded. Stopping.");
                break StopReason::NoGrowth;
            }
            state.previous_count = state.collected.len();
        };

        let mut records = state.collected;
        records.truncate(plan.target_count);
        self.log.log(&format!(
            "Harvest finished with {} records ({reason:?})",
            records.len()
        ));
        Ok(HarvestOutcome { records, reason })
    }

    /// One extraction pass with no load trigger: scan whatever the page
    /// currently shows, bounded by `target_count`.
    pub async fn scan(&self, plan: &HarvestPlan) -> Result<Vec<ExtractedRecord>> {
        let mut state = HarvestState {
            collected: Vec::new(),
            seen: HashSet::new(),
            previous_count: 0,
            previous_scroll_height: 0,
        };
        self.extract(plan, &mut state).await?;
        let mut records = state.collected;
        records.truncate(plan.target_count);
        Ok(records)
    }

    /// Scan the current DOM state and absorb any not-yet-seen records.
    async fn extract(&self, plan: &HarvestPlan, state: &mut HarvestState) -> Result<()> {
        let handles = self.page.find_elements(&plan.item_selector).await?;

        for (index, handle) in handles.iter().enumerate() {
            let text = self.page.text(handle).await?.trim().to_string();
            if text.is_empty() {
                continue;
            }

            let value = match &plan.value_selector {
                Some(template) => self.value_for(plan, template, index).await,
                None => None,
            };

            let record = ExtractedRecord { text, value };
            if state.seen.insert(record.clone()) {
                state.collected.push(record);
                if state.collected.len() >= plan.target_count {
                    break;
                }
            }
        }

        self.log
            .log(&format!("Collected {} items so far.", state.collected.len()));
        Ok(())
    }

    /// Resolve the companion value element for item `index` (0-based).
    ///
    /// Any failure — arity mismatch, absent element, digit-free text — yields
    /// `None`, never a loop failure.
    async fn value_for(
        &self,
        plan: &HarvestPlan,
        template: &SelectorTemplate,
        index: usize,
    ) -> Option<i64> {
        let selector = match template.resolve(&[index as i64 + 1]) {
            Ok(selector) => selector,
            Err(err) => {
                self.log
                    .log(&format!("Value selector failed for item {}: {err}", index + 1));
                return None;
            }
        };

        match self.page.wait_for_element(&selector, plan.element_wait).await {
            Ok(handle) => match self.page.text(&handle).await {
                Ok(text) => first_integer(&text),
                Err(err) => {
                    self.log
                        .log(&format!("Value read failed for item {}: {err}", index + 1));
                    None
                }
            },
            Err(_) => {
                self.log
                    .log(&format!("Value element not found for item {}.", index + 1));
                None
            }
        }
    }

    /// Ask the page for more content. Returns a stop reason when the page has
    /// nothing further to give.
    async fn trigger(
        &self,
        plan: &HarvestPlan,
        state: &mut HarvestState,
    ) -> Result<Option<StopReason>> {
        match &plan.trigger {
            LoadTrigger::Button(button) => {
                let present = self.page.find_elements(button).await?;
                if present.is_empty() {
                    self.log.log("No 'load more' control found. Stopping.");
                    return Ok(Some(StopReason::NoMoreControl));
                }

                match self.page.wait_for_element(button, plan.element_wait).await {
                    Ok(handle) => {
                        self.page.click(&handle).await?;
                        tokio::time::sleep(plan.settle).await;
                        Ok(None)
                    }
                    Err(EngineError::ElementNotFound { .. }) => {
                        self.log
                            .log("'Load more' control never became clickable. Stopping.");
                        Ok(Some(StopReason::ControlTimeout))
                    }
                    Err(err) => Err(err),
                }
            }
            LoadTrigger::Scroll => {
                self.page
                    .execute_script("window.scrollTo(0, document.body.scrollHeight)")
                    .await?;
                tokio::time::sleep(plan.settle).await;

                let height = self.scroll_height().await?;
                if height == state.previous_scroll_height {
                    self.log.log("Scroll height stalled. Stopping.");
                    return Ok(Some(StopReason::NoMoreControl));
                }
                state.previous_scroll_height = height;
                Ok(None)
            }
        }
    }

    async fn scroll_height(&self) -> Result<i64> {
        let value = self
            .page
            .execute_script("document.body.scrollHeight")
            .await?;
        Ok(value.as_i64().unwrap_or(0))
    }
}
