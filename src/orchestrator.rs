//! Hybrid orchestrator: chains API discovery into per-target browser replay.
//!
//! A run resolves a seed action sequence into concrete work: an optional
//! discovery step turns an API response into a URL list, every URL gets the
//! remaining actions replayed against it, and `click-list` actions recurse
//! into nested URL lists. Failures are isolated at the smallest unit that
//! makes sense (combination, action, target); only a dead browser or HTTP
//! session aborts the run.

use futures::future::BoxFuture;
use serde_json::{Value, json};
use std::collections::HashSet;
use url::Url;
use uuid::Uuid;

use crate::action::{Action, ActionSequence, ActionType, Target};
use crate::combinations::for_each_combination;
use crate::config::{EngineConfig, TimingConfig};
use crate::driver::{ApiClient, PageSession};
use crate::harvester::{ExtractedRecord, HarvestPlan, Harvester, LoadTrigger};
use crate::keypath::{extract_by_path, match_flat_keys};
use crate::logging::RunLog;
use crate::selector::ConcreteSelector;
use crate::utils::error::{EngineError, Result};

/// Seed context for one run: the page or API endpoint everything starts from.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub url: String,
    /// Headers attached to every API call of the run.
    pub api_headers: Vec<(String, String)>,
}

impl RunContext {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_headers: Vec::new(),
        }
    }
}

/// An isolated failure, reported rather than propagated.
#[derive(Debug)]
pub struct RunFailure {
    pub context: String,
    pub error: EngineError,
}

/// What a run produced: deduplicated records in insertion order, plus every
/// failure that was isolated along the way.
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub records: Vec<ExtractedRecord>,
    pub failures: Vec<RunFailure>,
}

#[derive(Default)]
struct RunAccumulator {
    records: Vec<ExtractedRecord>,
    failures: Vec<RunFailure>,
    seen: HashSet<ExtractedRecord>,
}

impl RunAccumulator {
    fn push(&mut self, record: ExtractedRecord) {
        if self.seen.insert(record.clone()) {
            self.records.push(record);
        }
    }

    fn fail(&mut self, context: String, error: EngineError) {
        self.failures.push(RunFailure { context, error });
    }
}

pub struct Orchestrator<'a> {
    page: &'a dyn PageSession,
    api: &'a dyn ApiClient,
    log: &'a dyn RunLog,
    timing: TimingConfig,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        page: &'a dyn PageSession,
        api: &'a dyn ApiClient,
        log: &'a dyn RunLog,
        config: &EngineConfig,
    ) -> Self {
        Self {
            page,
            api,
            log,
            timing: config.timing.clone(),
        }
    }

    /// Resolve `sequence` into a concrete run against `ctx`.
    ///
    /// Validation failures and `FatalContext` are the only errors that
    /// surface; everything else lands in the outcome's failure list.
    pub async fn run(&self, sequence: &ActionSequence, ctx: &RunContext) -> Result<RunOutcome> {
        sequence.validate()?;

        let run_id = Uuid::new_v4();
        self.log.log(&format!(
            "Run {run_id} started: {} top-level actions against {}",
            sequence.actions.len(),
            ctx.url
        ));

        let mut acc = RunAccumulator::default();

        match sequence.actions.split_first() {
            None => self.log.log("Empty action sequence; nothing to do."),
            Some((head, rest)) if head.is_discovery() => {
                self.run_discovery(head, rest, ctx, &mut acc).await?;
            }
            Some(_) => {
                if let Err(err) = self.replay(&sequence.actions, &ctx.url, ctx, &mut acc).await {
                    if err.is_fatal() {
                        return Err(err);
                    }
                    self.log
                        .log(&format!("Error processing {}: {err}", ctx.url));
                    acc.fail(ctx.url.clone(), err);
                }
            }
        }

        self.log.log(&format!(
            "Run {run_id} complete: {} records, {} failures.",
            acc.records.len(),
            acc.failures.len()
        ));
        Ok(RunOutcome {
            records: acc.records,
            failures: acc.failures,
        })
    }

    /// Seed discovery: one API call, then either a per-URL replay of the
    /// remaining actions or a paginated record walk, depending on what the
    /// key path yields.
    async fn run_discovery(
        &self,
        head: &Action,
        rest: &[Action],
        ctx: &RunContext,
        acc: &mut RunAccumulator,
    ) -> Result<()> {
        let key_path = head.key_path.as_deref().unwrap_or_default();

        let body = match self.call_api(head, &ctx.url, ctx).await {
            Ok(body) => body,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                self.log.log(&format!("Discovery call failed: {err}"));
                acc.fail(head.describe(), err);
                return Ok(());
            }
        };

        let values = extract_by_path(&body, key_path);
        if values.is_empty() {
            self.log.log("No URLs found.");
            return Ok(());
        }

        match urls_from(&values) {
            Some(targets) => {
                self.log
                    .log(&format!("Discovered {} targets.", targets.len()));
                for target in targets {
                    if let Err(err) = self.replay(rest, &target, ctx, acc).await {
                        if err.is_fatal() {
                            return Err(err);
                        }
                        self.log
                            .log(&format!("Error processing target {target}: {err}"));
                        acc.fail(target.clone(), err);
                    }
                }
            }
            None => {
                // The key path addresses records, not URLs: page through the
                // API until a fetch contributes nothing new.
                self.crawl_api_pages(head, key_path, values, ctx, acc)
                    .await?;
            }
        }
        Ok(())
    }

    /// Paginated record walk over an API, with a politeness delay between
    /// calls. Stops when a page adds no new unique records.
    async fn crawl_api_pages(
        &self,
        action: &Action,
        key_path: &str,
        first_page: Vec<Value>,
        ctx: &RunContext,
        acc: &mut RunAccumulator,
    ) -> Result<()> {
        let mut page_values = first_page;
        loop {
            let before = acc.records.len();
            for value in &page_values {
                acc.push(record_from_value(value));
            }
            let added = acc.records.len() - before;
            self.log.log(&format!(
                "Fetched {} entries, {added} new. Total: {}",
                page_values.len(),
                acc.records.len()
            ));

            if added == 0 || action.pagination_size.is_none() {
                break;
            }

            tokio::time::sleep(self.timing.api_page_delay()).await;
            match self.call_api(action, &ctx.url, ctx).await {
                Ok(body) => page_values = extract_by_path(&body, key_path),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    self.log.log(&format!("Page fetch failed: {err}"));
                    acc.fail(action.describe(), err);
                    break;
                }
            }
            if page_values.is_empty() {
                break;
            }
        }
        Ok(())
    }

    /// Navigate to one target and execute `actions` in order, isolating
    /// per-action failures. Boxed for `click-list` recursion.
    fn replay<'b>(
        &'b self,
        actions: &'b [Action],
        url: &'b str,
        ctx: &'b RunContext,
        acc: &'b mut RunAccumulator,
    ) -> BoxFuture<'b, Result<()>> {
        Box::pin(async move {
            self.navigate(url).await?;

            for action in actions {
                self.log.log(&format!("Executing action: {}", action.describe()));
                if let Err(err) = self.execute(action, url, ctx, acc).await {
                    if err.is_fatal() {
                        return Err(err);
                    }
                    self.log.log(&format!(
                        "Error executing action {}: {err}",
                        action.describe()
                    ));
                    acc.fail(action.describe(), err);
                }
            }
            Ok(())
        })
    }

    async fn execute(
        &self,
        action: &Action,
        url: &str,
        ctx: &RunContext,
        acc: &mut RunAccumulator,
    ) -> Result<()> {
        match action.kind {
            ActionType::Click | ActionType::Hover => {
                self.run_interaction(action, url, acc).await
            }
            ActionType::Hide => self.run_hide(action).await,
            ActionType::Delay => {
                self.sleep_secs(action.delay_seconds).await;
                Ok(())
            }
            ActionType::Crawl => self.run_crawl(action, url, ctx, acc).await,
            ActionType::ClickList => self.run_click_list(action, url, ctx, acc).await,
        }
    }

    /// Click or hover, optionally repeated over every index combination.
    async fn run_interaction(
        &self,
        action: &Action,
        url: &str,
        acc: &mut RunAccumulator,
    ) -> Result<()> {
        let target = required_target(action)?;
        let template = target.template();

        if action.index_ranges.is_empty() {
            let selector = template.resolve(&[])?;
            self.interact_once(action.kind, &selector).await?;
            self.sleep_secs(action.delay_seconds).await;
            return Ok(());
        }

        // Resolve every combination up front; resolution failures are
        // isolated by the enumerator and reported here.
        let mut combos = Vec::new();
        let failures = for_each_combination(&action.index_ranges, &mut |indices| {
            let selector = template.resolve(indices)?;
            combos.push((indices.to_vec(), selector));
            Ok(())
        });
        for failure in failures {
            self.log.log(&format!(
                "Error resolving combination {:?}: {}",
                failure.indices, failure.error
            ));
            acc.fail(
                format!("{} {:?}", action.describe(), failure.indices),
                failure.error,
            );
        }

        for (indices, selector) in combos {
            self.log.log(&format!(
                "Performing {} for combination {indices:?}",
                action.kind.as_str()
            ));
            match self.interact_once(action.kind, &selector).await {
                Ok(()) => {
                    self.sleep_secs(action.delay_seconds).await;
                    if action.kind == ActionType::Click {
                        // A click usually leaves the listing; reload it so the
                        // next combination starts from known state.
                        self.navigate(url).await?;
                    }
                }
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    self.log.log(&format!(
                        "Error performing action for {indices:?}: {err}"
                    ));
                    acc.fail(format!("{} {indices:?}", action.describe()), err);
                }
            }
        }
        Ok(())
    }

    async fn interact_once(&self, kind: ActionType, selector: &ConcreteSelector) -> Result<()> {
        let handle = self
            .page
            .wait_for_element(selector, self.timing.element_wait())
            .await?;
        match kind {
            ActionType::Hover => self.page.hover(&handle).await,
            _ => self.page.click(&handle).await,
        }
    }

    /// Suppress visibility of every match. Idempotent DOM-state side effect.
    async fn run_hide(&self, action: &Action) -> Result<()> {
        let target = required_target(action)?;
        let selector = target.template().resolve(&[])?;
        let handles = self.page.find_elements(&selector).await?;
        for handle in &handles {
            self.page
                .set_style_property(handle, "display", "none")
                .await?;
        }
        self.log
            .log(&format!("Hid {} elements matching {selector}", handles.len()));
        Ok(())
    }

    /// Browser-side harvest or API-side record crawl, per the action shape.
    async fn run_crawl(
        &self,
        action: &Action,
        url: &str,
        ctx: &RunContext,
        acc: &mut RunAccumulator,
    ) -> Result<()> {
        match (&action.target, &action.key_path) {
            (Some(target), _) => self.run_browser_crawl(action, target, acc).await,
            (None, Some(key_path)) => {
                let body = self.call_api(action, url, ctx).await?;
                let values = match_flat_keys(&body, key_path);
                if values.is_empty() {
                    self.log.log("No data found.");
                }
                for value in &values {
                    acc.push(record_from_value(value));
                }
                Ok(())
            }
            (None, None) => Err(EngineError::MissingKeyPath {
                action: action.describe(),
            }),
        }
    }

    async fn run_browser_crawl(
        &self,
        action: &Action,
        target: &Target,
        acc: &mut RunAccumulator,
    ) -> Result<()> {
        let harvester = Harvester::new(self.page, self.log);
        let item_selector = target.template().resolve(&[])?;
        let value_selector = action.value_template.as_ref().map(|t| t.template());
        let trigger = match &action.load_more {
            Some(control) => LoadTrigger::Button(control.template().resolve(&[])?),
            None => LoadTrigger::Scroll,
        };

        let range = action.index_ranges.first();
        let incremental = range.is_some() || action.load_more.is_some();

        let plan = HarvestPlan {
            item_selector,
            value_selector,
            trigger,
            target_count: range.map_or(usize::MAX, |r| r.end.max(0) as usize),
            settle: self.timing.settle(),
            element_wait: self.timing.element_wait(),
        };

        let records = if incremental {
            harvester.run(&plan).await?.records
        } else {
            harvester.scan(&plan).await?
        };

        let skip = range.map_or(0, |r| r.start.max(0) as usize);
        for record in records.into_iter().skip(skip) {
            acc.push(record);
        }
        Ok(())
    }

    /// Nested discovery: read the API state behind the current target at this
    /// moment, then recurse into the nested sequence per discovered URL.
    async fn run_click_list(
        &self,
        action: &Action,
        url: &str,
        ctx: &RunContext,
        acc: &mut RunAccumulator,
    ) -> Result<()> {
        let key_path = action.key_path.as_deref().ok_or_else(|| {
            EngineError::MissingKeyPath {
                action: action.describe(),
            }
        })?;

        let body = self.call_api(action, url, ctx).await?;
        let values = extract_by_path(&body, key_path);
        if values.is_empty() {
            self.log.log("Nested discovery produced no targets.");
            return Ok(());
        }
        let Some(targets) = urls_from(&values) else {
            self.log.log(&format!(
                "Nested key path '{key_path}' did not yield URLs; skipping."
            ));
            return Ok(());
        };

        self.log
            .log(&format!("Discovered {} nested targets.", targets.len()));
        for nested in &targets {
            if let Err(err) = self.replay(&action.actions, nested, ctx, acc).await {
                if err.is_fatal() {
                    return Err(err);
                }
                self.log
                    .log(&format!("Error in nested target {nested}: {err}"));
                acc.fail(nested.clone(), err);
            }
        }

        // Restore the outer target for whatever follows this action.
        self.navigate(url).await
    }

    async fn call_api(&self, action: &Action, url: &str, ctx: &RunContext) -> Result<Value> {
        let method = action.request_method.unwrap_or_default();
        let payload = json!({
            "page_size": action.pagination_size.unwrap_or(30),
        });
        let response = self
            .api
            .request(method, url, &ctx.api_headers, &payload)
            .await?;
        if !response.is_success() {
            return Err(EngineError::ApiStatus {
                url: url.to_string(),
                status: response.status,
            });
        }
        Ok(response.body)
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        Url::parse(url)
            .map_err(|err| EngineError::Driver(format!("invalid target URL '{url}': {err}")))?;
        self.page.navigate(url).await?;
        tokio::time::sleep(self.timing.navigation_settle()).await;
        Ok(())
    }

    async fn sleep_secs(&self, seconds: f64) {
        if seconds > 0.0 {
            tokio::time::sleep(std::time::Duration::from_secs_f64(seconds)).await;
        }
    }
}

fn required_target(action: &Action) -> Result<&Target> {
    action
        .target
        .as_ref()
        .ok_or_else(|| EngineError::MissingTarget {
            action: action.describe(),
        })
}

/// Interprets discovered values as a URL list, or `None` when any entry is
/// not an absolute http(s) URL.
fn urls_from(values: &[Value]) -> Option<Vec<String>> {
    values
        .iter()
        .map(|value| {
            let s = value.as_str()?;
            let parsed = Url::parse(s).ok()?;
            matches!(parsed.scheme(), "http" | "https").then(|| s.to_string())
        })
        .collect()
}

fn record_from_value(value: &Value) -> ExtractedRecord {
    match value {
        Value::String(s) => ExtractedRecord::text_only(s.clone()),
        Value::Number(n) => ExtractedRecord {
            text: n.to_string(),
            value: n.as_i64(),
        },
        other => ExtractedRecord::text_only(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{IndexRange, RequestMethod};
    use crate::driver::{ApiResponse, ElementHandle, MockApiClient, MockPageSession};
    use crate::logging::MemoryLog;
    use std::sync::{Arc, Mutex};

    fn fast_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.timing = crate::config::TimingConfig {
            element_wait_secs: 0.01,
            settle_secs: 0.0,
            navigation_settle_secs: 0.0,
            api_page_delay_secs: 0.0,
        };
        config
    }

    fn ok_api(body: Value) -> MockApiClient {
        let mut api = MockApiClient::new();
        api.expect_request()
            .returning(move |_, _, _, _| Ok(ApiResponse {
                status: 200,
                body: body.clone(),
            }));
        api
    }

    fn recording_page() -> (MockPageSession, Arc<Mutex<Vec<String>>>) {
        let visited = Arc::new(Mutex::new(Vec::new()));
        let mut page = MockPageSession::new();
        let sink = visited.clone();
        page.expect_navigate().returning(move |url| {
            sink.lock().unwrap().push(url.to_string());
            Ok(())
        });
        (page, visited)
    }

    fn discovery_action(key_path: &str) -> Action {
        let mut action = Action::new(ActionType::Crawl);
        action.key_path = Some(key_path.to_string());
        action.pagination_size = Some(2);
        action.request_method = Some(RequestMethod::Post);
        action
    }

    #[tokio::test]
    async fn test_discovery_visits_each_target_in_order() {
        let api = ok_api(json!({"result": {"urls": ["http://a", "http://b"]}}));
        let (page, visited) = recording_page();
        let log = MemoryLog::new();
        let config = fast_config();
        let orchestrator = Orchestrator::new(&page, &api, &log, &config);

        let sequence = ActionSequence::new(vec![discovery_action("result.urls")]);
        let outcome = orchestrator
            .run(&sequence, &RunContext::new("http://api.example/list"))
            .await
            .unwrap();

        assert!(outcome.failures.is_empty());
        assert_eq!(
            *visited.lock().unwrap(),
            vec!["http://a".to_string(), "http://b".to_string()]
        );
    }

    #[tokio::test]
    async fn test_discovery_with_empty_list_yields_zero_records() {
        let api = ok_api(json!({"result": {"urls": []}}));
        let (page, visited) = recording_page();
        let log = MemoryLog::new();
        let config = fast_config();
        let orchestrator = Orchestrator::new(&page, &api, &log, &config);

        let sequence = ActionSequence::new(vec![discovery_action("missing.path")]);
        let outcome = orchestrator
            .run(&sequence, &RunContext::new("http://api.example/list"))
            .await
            .unwrap();

        assert!(outcome.records.is_empty());
        assert!(outcome.failures.is_empty());
        assert!(visited.lock().unwrap().is_empty());
        assert!(log.contains("No URLs found"));
    }

    #[tokio::test]
    async fn test_validation_failure_precedes_execution() {
        let api = MockApiClient::new();
        let mut page = MockPageSession::new();
        page.expect_navigate().times(0);
        let log = MemoryLog::new();
        let config = fast_config();
        let orchestrator = Orchestrator::new(&page, &api, &log, &config);

        let sequence = ActionSequence::new(vec![Action::new(ActionType::Click)]);
        let err = orchestrator
            .run(&sequence, &RunContext::new("http://example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::MissingTarget { .. }));
    }

    #[tokio::test]
    async fn test_per_target_failure_is_isolated() {
        let api = ok_api(json!({"result": {"urls": ["http://bad", "http://good"]}}));
        let mut page = MockPageSession::new();
        page.expect_navigate().returning(|url| {
            if url.contains("bad") {
                Err(EngineError::Driver("net::ERR_CONNECTION_REFUSED".into()))
            } else {
                Ok(())
            }
        });
        let log = MemoryLog::new();
        let config = fast_config();
        let orchestrator = Orchestrator::new(&page, &api, &log, &config);

        let sequence = ActionSequence::new(vec![discovery_action("result.urls")]);
        let outcome = orchestrator
            .run(&sequence, &RunContext::new("http://api.example/list"))
            .await
            .unwrap();

        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].context, "http://bad");
    }

    #[tokio::test]
    async fn test_fatal_context_aborts_run() {
        let api = ok_api(json!({"result": {"urls": ["http://a", "http://b"]}}));
        let mut page = MockPageSession::new();
        page.expect_navigate()
            .returning(|_| Err(EngineError::FatalContext("tab closed".into())));
        let log = MemoryLog::new();
        let config = fast_config();
        let orchestrator = Orchestrator::new(&page, &api, &log, &config);

        let sequence = ActionSequence::new(vec![discovery_action("result.urls")]);
        let err = orchestrator
            .run(&sequence, &RunContext::new("http://api.example/list"))
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_api_record_walk_stops_when_nothing_new() {
        // Key path yields plain records, not URLs: the orchestrator pages
        // until a fetch adds nothing, which here is the second call.
        let calls = Arc::new(Mutex::new(0u32));
        let counter = calls.clone();
        let mut api = MockApiClient::new();
        api.expect_request().returning(move |_, _, _, _| {
            *counter.lock().unwrap() += 1;
            Ok(ApiResponse {
                status: 200,
                body: json!({"comment": {"list": ["first", "second"]}}),
            })
        });
        let page = MockPageSession::new();
        let log = MemoryLog::new();
        let config = fast_config();
        let orchestrator = Orchestrator::new(&page, &api, &log, &config);

        let sequence = ActionSequence::new(vec![discovery_action("comment.list")]);
        let outcome = orchestrator
            .run(&sequence, &RunContext::new("http://api.example/comments"))
            .await
            .unwrap();

        assert_eq!(
            outcome.records,
            vec![
                ExtractedRecord::text_only("first"),
                ExtractedRecord::text_only("second")
            ]
        );
        assert_eq!(*calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_click_list_with_empty_key_path_recurses_zero_times() {
        let api = ok_api(json!({"detail": {"urls": []}}));
        let (page, visited) = recording_page();
        let log = MemoryLog::new();
        let config = fast_config();
        let orchestrator = Orchestrator::new(&page, &api, &log, &config);

        let mut click_list = Action::new(ActionType::ClickList);
        click_list.key_path = Some("detail.urls".to_string());
        click_list.actions = vec![Action::new(ActionType::Delay)];

        let sequence = ActionSequence::new(vec![click_list]);
        let outcome = orchestrator
            .run(&sequence, &RunContext::new("http://example.com/page"))
            .await
            .unwrap();

        assert!(outcome.failures.is_empty());
        // Only the seed navigation happened; no nested targets were visited.
        assert_eq!(
            *visited.lock().unwrap(),
            vec!["http://example.com/page".to_string()]
        );
        assert!(log.contains("no targets"));
    }

    #[tokio::test]
    async fn test_click_list_recurses_into_nested_sequence() {
        let api = ok_api(json!({"detail": {"urls": ["http://nested.example/x"]}}));
        let (page, visited) = recording_page();
        let log = MemoryLog::new();
        let config = fast_config();
        let orchestrator = Orchestrator::new(&page, &api, &log, &config);

        let mut click_list = Action::new(ActionType::ClickList);
        click_list.key_path = Some("detail.urls".to_string());
        click_list.actions = vec![Action::new(ActionType::Delay)];

        let sequence = ActionSequence::new(vec![click_list]);
        let outcome = orchestrator
            .run(&sequence, &RunContext::new("http://example.com/page"))
            .await
            .unwrap();

        assert!(outcome.failures.is_empty());
        assert_eq!(
            *visited.lock().unwrap(),
            vec![
                "http://example.com/page".to_string(),
                "http://nested.example/x".to_string(),
                "http://example.com/page".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_run_level_dedup_across_targets() {
        let api = ok_api(json!({"result": {"urls": ["http://a", "http://b"]}}));
        let (mut page, _visited) = recording_page();
        let items = ConcreteSelector::class_name("item");
        let item_sel = items.clone();
        page.expect_find_elements().returning(move |_| {
            Ok(vec![ElementHandle::new(item_sel.clone(), 0)])
        });
        page.expect_text().returning(|_| Ok("shared".to_string()));
        let log = MemoryLog::new();
        let config = fast_config();
        let orchestrator = Orchestrator::new(&page, &api, &log, &config);

        let mut scan = Action::new(ActionType::Crawl);
        scan.target = Some(Target::ClassName("item".to_string()));
        let sequence = ActionSequence::new(vec![discovery_action("result.urls"), scan]);

        let outcome = orchestrator
            .run(&sequence, &RunContext::new("http://api.example/list"))
            .await
            .unwrap();

        // Both targets produced "shared"; the run keeps one.
        assert_eq!(outcome.records, vec![ExtractedRecord::text_only("shared")]);
    }

    #[tokio::test]
    async fn test_combination_clicks_reload_listing() {
        let api = MockApiClient::new();
        let (mut page, visited) = recording_page();
        page.expect_wait_for_element()
            .returning(|selector, _| Ok(ElementHandle::new(selector.clone(), 0)));
        let clicked = Arc::new(Mutex::new(Vec::new()));
        let click_sink = clicked.clone();
        page.expect_click().returning(move |handle| {
            click_sink.lock().unwrap().push(handle.selector.value.clone());
            Ok(())
        });
        let log = MemoryLog::new();
        let config = fast_config();
        let orchestrator = Orchestrator::new(&page, &api, &log, &config);

        let mut click = Action::new(ActionType::Click);
        click.target = Some(Target::Xpath("//tr[{0}]/td[{1}]".to_string()));
        click.index_ranges = vec![IndexRange::new(1, 2), IndexRange::new(1, 2)];
        click.delay_seconds = 0.0;
        let sequence = ActionSequence::new(vec![click]);

        let outcome = orchestrator
            .run(&sequence, &RunContext::new("http://example.com/grid"))
            .await
            .unwrap();

        assert!(outcome.failures.is_empty());
        assert_eq!(
            *clicked.lock().unwrap(),
            vec![
                "//tr[1]/td[1]".to_string(),
                "//tr[1]/td[2]".to_string(),
                "//tr[2]/td[1]".to_string(),
                "//tr[2]/td[2]".to_string(),
            ]
        );
        // Initial navigation plus one reload per click.
        assert_eq!(visited.lock().unwrap().len(), 5);
    }

    #[test]
    fn test_urls_from_rejects_non_urls() {
        assert_eq!(
            urls_from(&[json!("http://a"), json!("https://b")]),
            Some(vec!["http://a".to_string(), "https://b".to_string()])
        );
        assert_eq!(urls_from(&[json!("http://a"), json!("not a url")]), None);
        assert_eq!(urls_from(&[json!({"id": 1})]), None);
    }

    #[test]
    fn test_record_from_value_shapes() {
        assert_eq!(
            record_from_value(&json!("text")),
            ExtractedRecord::text_only("text")
        );
        assert_eq!(
            record_from_value(&json!(42)),
            ExtractedRecord::with_value("42", 42)
        );
        let object = record_from_value(&json!({"id": 1}));
        assert!(object.text.contains("\"id\""));
    }
}
