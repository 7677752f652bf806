//! In-process stand-in for a browser session.
//!
//! [`ScriptedDriver`] answers every driver call from a fixed script and
//! records what it was asked to do, so flows can be exercised without a
//! browser. It also backs the CLI `--dry-run` mode.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mailpilot_core_types::SelectorStrategy;
use parking_lot::Mutex;
use tracing::debug;

use crate::driver::{Driver, ElementHandle, SessionFactory, SessionOptions, UiAction};
use crate::error::DriverError;

#[derive(Clone, Debug)]
enum ElementScript {
    Present,
    ActFails(DriverError),
    LocateFails(DriverError),
    Panics,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedAction {
    pub selector: String,
    pub action: UiAction,
}

#[derive(Default)]
struct PageState {
    url: String,
    pending_urls: VecDeque<String>,
}

#[derive(Default)]
struct CallLog {
    locates: Vec<String>,
    actions: Vec<RecordedAction>,
    navigations: Vec<String>,
}

pub struct ScriptedDriver {
    permissive: bool,
    elements: HashMap<String, ElementScript>,
    hidden: HashSet<String>,
    miss_latency: Duration,
    screenshot_latency: Duration,
    /// `current_url` never answers after this many calls.
    url_stalls_after: Option<usize>,
    url_reads: AtomicUsize,
    url_after_navigate: Option<String>,
    url_after_click: HashMap<String, String>,
    page_content: String,
    navigate_error: Option<DriverError>,
    page: Mutex<PageState>,
    log: Mutex<CallLog>,
    next_handle: AtomicU64,
    screenshots: AtomicUsize,
    closes: AtomicUsize,
}

impl Default for ScriptedDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedDriver {
    /// Only elements registered with [`ScriptedDriver::with_element`] exist.
    pub fn new() -> Self {
        Self {
            permissive: false,
            elements: HashMap::new(),
            hidden: HashSet::new(),
            miss_latency: Duration::ZERO,
            screenshot_latency: Duration::ZERO,
            url_stalls_after: None,
            url_reads: AtomicUsize::new(0),
            url_after_navigate: None,
            url_after_click: HashMap::new(),
            page_content: String::new(),
            navigate_error: None,
            page: Mutex::new(PageState {
                url: "about:blank".to_string(),
                pending_urls: VecDeque::new(),
            }),
            log: Mutex::new(CallLog::default()),
            next_handle: AtomicU64::new(1),
            screenshots: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
        }
    }

    /// Every selector matches unless hidden or scripted otherwise.
    pub fn permissive() -> Self {
        Self {
            permissive: true,
            ..Self::new()
        }
    }

    pub fn with_element(mut self, selector: impl Into<String>) -> Self {
        self.elements.insert(selector.into(), ElementScript::Present);
        self
    }

    pub fn hide(mut self, selector: impl Into<String>) -> Self {
        self.hidden.insert(selector.into());
        self
    }

    pub fn hide_all<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hidden.extend(selectors.into_iter().map(Into::into));
        self
    }

    /// The element is found but every action on it fails with `error`.
    pub fn with_broken_element(mut self, selector: impl Into<String>, error: DriverError) -> Self {
        self.elements
            .insert(selector.into(), ElementScript::ActFails(error));
        self
    }

    /// Looking the selector up fails with `error` instead of a miss.
    pub fn with_locate_error(mut self, selector: impl Into<String>, error: DriverError) -> Self {
        self.elements
            .insert(selector.into(), ElementScript::LocateFails(error));
        self
    }

    pub fn panicking_on(mut self, selector: impl Into<String>) -> Self {
        self.elements.insert(selector.into(), ElementScript::Panics);
        self
    }

    /// How long a miss waits, capped by the caller's timeout.
    pub fn with_miss_latency(mut self, latency: Duration) -> Self {
        self.miss_latency = latency;
        self
    }

    pub fn with_screenshot_latency(mut self, latency: Duration) -> Self {
        self.screenshot_latency = latency;
        self
    }

    /// After `calls` answered `current_url` calls the page stops responding.
    pub fn stalling_url_after(mut self, calls: usize) -> Self {
        self.url_stalls_after = Some(calls);
        self
    }

    pub fn with_url_after_navigate(mut self, url: impl Into<String>) -> Self {
        self.url_after_navigate = Some(url.into());
        self
    }

    /// Successive `current_url` calls walk through `urls`; the last one sticks.
    pub fn with_url_sequence<I, S>(self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.page
            .lock()
            .pending_urls
            .extend(urls.into_iter().map(Into::into));
        self
    }

    pub fn with_url_after_click(
        mut self,
        selector: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        self.url_after_click.insert(selector.into(), url.into());
        self
    }

    pub fn with_page_content(mut self, content: impl Into<String>) -> Self {
        self.page_content = content.into();
        self
    }

    pub fn failing_navigation(mut self, error: DriverError) -> Self {
        self.navigate_error = Some(error);
        self
    }

    pub fn locate_attempts(&self) -> Vec<String> {
        self.log.lock().locates.clone()
    }

    pub fn actions(&self) -> Vec<RecordedAction> {
        self.log.lock().actions.clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.log.lock().navigations.clone()
    }

    /// Text last typed into `selector`, if any.
    pub fn typed_into(&self, selector: &str) -> Option<String> {
        self.log
            .lock()
            .actions
            .iter()
            .rev()
            .find_map(|recorded| match &recorded.action {
                UiAction::Type(text) if recorded.selector == selector => Some(text.clone()),
                _ => None,
            })
    }

    pub fn clicked(&self, selector: &str) -> bool {
        self.log
            .lock()
            .actions
            .iter()
            .any(|recorded| recorded.selector == selector && recorded.action == UiAction::Click)
    }

    pub fn screenshot_count(&self) -> usize {
        self.screenshots.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn script_for(&self, selector: &str) -> Option<ElementScript> {
        if self.hidden.contains(selector) {
            return None;
        }
        match self.elements.get(selector) {
            Some(script) => Some(script.clone()),
            None if self.permissive => Some(ElementScript::Present),
            None => None,
        }
    }
}

#[async_trait]
impl Driver for ScriptedDriver {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.log.lock().navigations.push(url.to_string());
        if let Some(err) = &self.navigate_error {
            return Err(err.clone());
        }
        let landed = self.url_after_navigate.clone().unwrap_or_else(|| url.to_string());
        self.page.lock().url = landed;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        let read = self.url_reads.fetch_add(1, Ordering::SeqCst);
        if self.url_stalls_after.is_some_and(|limit| read >= limit) {
            debug!(read, "scripted current_url stalled");
            std::future::pending::<()>().await;
        }
        let mut page = self.page.lock();
        if let Some(next) = page.pending_urls.pop_front() {
            page.url = next;
        }
        Ok(page.url.clone())
    }

    async fn page_content(&self) -> Result<String, DriverError> {
        Ok(self.page_content.clone())
    }

    async fn locate(
        &self,
        selector: &str,
        strategy: SelectorStrategy,
        timeout: Duration,
    ) -> Result<ElementHandle, DriverError> {
        self.log.lock().locates.push(selector.to_string());
        debug!(selector, %strategy, "scripted locate");
        match self.script_for(selector) {
            Some(ElementScript::Present) | Some(ElementScript::ActFails(_)) => Ok(ElementHandle {
                id: self.next_handle.fetch_add(1, Ordering::Relaxed),
                selector: selector.to_string(),
            }),
            Some(ElementScript::LocateFails(err)) => Err(err),
            Some(ElementScript::Panics) => panic!("scripted driver panic on {selector}"),
            None => {
                let wait = self.miss_latency.min(timeout);
                if !wait.is_zero() {
                    tokio::time::sleep(wait).await;
                }
                Err(DriverError::NotFound(selector.to_string()))
            }
        }
    }

    async fn act(&self, handle: &ElementHandle, action: &UiAction) -> Result<(), DriverError> {
        self.log.lock().actions.push(RecordedAction {
            selector: handle.selector.clone(),
            action: action.clone(),
        });
        if let Some(ElementScript::ActFails(err)) = self.elements.get(&handle.selector) {
            return Err(err.clone());
        }
        if matches!(action, UiAction::Click) {
            if let Some(url) = self.url_after_click.get(&handle.selector) {
                self.page.lock().url = url.clone();
            }
        }
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        self.screenshots.fetch_add(1, Ordering::SeqCst);
        if !self.screenshot_latency.is_zero() {
            tokio::time::sleep(self.screenshot_latency).await;
        }
        Ok(b"\x89PNG\r\n\x1a\n".to_vec())
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out one shared [`ScriptedDriver`] and counts acquisitions.
pub struct ScriptedSessionFactory {
    driver: Arc<ScriptedDriver>,
    acquisitions: AtomicUsize,
    launch_error: Option<DriverError>,
}

impl ScriptedSessionFactory {
    pub fn new(driver: ScriptedDriver) -> Self {
        Self {
            driver: Arc::new(driver),
            acquisitions: AtomicUsize::new(0),
            launch_error: None,
        }
    }

    pub fn failing(error: DriverError) -> Self {
        Self {
            launch_error: Some(error),
            ..Self::new(ScriptedDriver::new())
        }
    }

    pub fn driver(&self) -> Arc<ScriptedDriver> {
        Arc::clone(&self.driver)
    }

    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionFactory for ScriptedSessionFactory {
    async fn acquire(&self, options: &SessionOptions) -> Result<Arc<dyn Driver>, DriverError> {
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        debug!(headless = options.headless, "scripted session acquired");
        if let Some(err) = &self.launch_error {
            return Err(err.clone());
        }
        let driver: Arc<dyn Driver> = self.driver.clone();
        Ok(driver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAIT: Duration = Duration::from_millis(50);

    #[tokio::test]
    async fn strict_driver_only_finds_registered_elements() {
        let driver = ScriptedDriver::new().with_element("#send");
        assert!(driver.locate("#send", SelectorStrategy::Css, WAIT).await.is_ok());
        let miss = driver.locate("#other", SelectorStrategy::Css, WAIT).await;
        assert_eq!(miss, Err(DriverError::NotFound("#other".into())));
        assert_eq!(driver.locate_attempts(), vec!["#send", "#other"]);
    }

    #[tokio::test]
    async fn permissive_driver_respects_hidden_selectors() {
        let driver = ScriptedDriver::permissive().hide("#compose");
        assert!(driver.locate("#anything", SelectorStrategy::Css, WAIT).await.is_ok());
        assert!(driver.locate("#compose", SelectorStrategy::Css, WAIT).await.is_err());
    }

    #[tokio::test]
    async fn broken_elements_fail_on_act() {
        let driver = ScriptedDriver::new()
            .with_broken_element("#to", DriverError::NotInteractable("#to".into()));
        let handle = driver.locate("#to", SelectorStrategy::Css, WAIT).await.unwrap();
        let result = driver.act(&handle, &UiAction::Type("a@b.c".into())).await;
        assert!(matches!(result, Err(DriverError::NotInteractable(_))));
        assert_eq!(driver.typed_into("#to").as_deref(), Some("a@b.c"));
    }

    #[tokio::test]
    async fn url_sequence_advances_per_call() {
        let driver = ScriptedDriver::new().with_url_sequence(["https://login", "https://inbox"]);
        assert_eq!(driver.current_url().await.unwrap(), "https://login");
        assert_eq!(driver.current_url().await.unwrap(), "https://inbox");
        assert_eq!(driver.current_url().await.unwrap(), "https://inbox");
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_url_reads_never_answer() {
        let driver = ScriptedDriver::new()
            .with_url_after_navigate("https://login.live.com")
            .stalling_url_after(1);
        driver.navigate("https://outlook.live.com").await.unwrap();
        assert_eq!(driver.current_url().await.unwrap(), "https://login.live.com");
        let stalled = tokio::time::timeout(Duration::from_secs(30), driver.current_url()).await;
        assert!(stalled.is_err());
    }

    #[tokio::test]
    async fn clicks_can_move_the_page() {
        let driver =
            ScriptedDriver::permissive().with_url_after_click("#compose", "https://m/#compose=new");
        let handle = driver.locate("#compose", SelectorStrategy::Css, WAIT).await.unwrap();
        driver.act(&handle, &UiAction::Click).await.unwrap();
        assert_eq!(driver.current_url().await.unwrap(), "https://m/#compose=new");
        assert!(driver.clicked("#compose"));
    }

    #[tokio::test]
    async fn factory_shares_one_driver_and_counts_acquisitions() {
        let factory = ScriptedSessionFactory::new(ScriptedDriver::permissive());
        let session = factory.acquire(&SessionOptions::default()).await.unwrap();
        session.close().await.unwrap();
        assert_eq!(factory.acquisitions(), 1);
        assert_eq!(factory.driver().close_count(), 1);

        let failing = ScriptedSessionFactory::failing(DriverError::Launch("no chrome".into()));
        assert!(failing.acquire(&SessionOptions::default()).await.is_err());
    }
}
