use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::{Page, ScreenshotParams};
use dashmap::DashMap;
use futures::StreamExt;
use mailpilot_core_types::SelectorStrategy;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::config::DriverConfig;
use crate::driver::{Driver, ElementHandle, SessionFactory, SessionOptions, UiAction};
use crate::error::DriverError;
use crate::metrics;

const CLEAR_FIELD_JS: &str = "function() { \
    this.focus(); \
    if ('value' in this) { this.value = ''; } else { this.textContent = ''; } \
    this.dispatchEvent(new Event('input', { bubbles: true })); \
}";

const SCRIPT_CLICK_JS: &str = "function() { this.click(); }";

/// Launches a fresh Chromium per acquired session.
#[derive(Clone, Debug, Default)]
pub struct ChromiumSessionFactory {
    config: DriverConfig,
}

impl ChromiumSessionFactory {
    pub fn new(config: DriverConfig) -> Self {
        Self { config }
    }

    fn browser_config(&self, options: &SessionOptions) -> Result<BrowserConfig, DriverError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .window_size(self.config.window_width, self.config.window_height)
            .launch_timeout(Duration::from_millis(self.config.launch_timeout_ms));
        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = self.config.resolve_executable() {
            builder = builder.chrome_executable(executable);
        }
        if let Some(dir) = &self.config.user_data_dir {
            builder = builder.user_data_dir(dir);
        }
        if let Some(agent) = &self.config.user_agent {
            builder = builder.arg(format!("--user-agent={agent}"));
        }
        for arg in &self.config.extra_args {
            builder = builder.arg(arg.clone());
        }
        builder.build().map_err(DriverError::Launch)
    }
}

#[async_trait]
impl SessionFactory for ChromiumSessionFactory {
    async fn acquire(&self, options: &SessionOptions) -> Result<Arc<dyn Driver>, DriverError> {
        let driver = ChromiumDriver::launch(self.browser_config(options)?, &self.config).await?;
        info!(headless = options.headless, "browser session launched");
        metrics::record_session_launched();
        Ok(Arc::new(driver))
    }
}

/// [`Driver`] backed by a single Chromium page.
pub struct ChromiumDriver {
    browser: Mutex<Option<Browser>>,
    page: Page,
    handler: JoinHandle<()>,
    elements: DashMap<u64, Arc<Element>>,
    next_element: AtomicU64,
    navigation_timeout: Duration,
    poll_interval: Duration,
}

impl ChromiumDriver {
    pub async fn launch(
        config: BrowserConfig,
        settings: &DriverConfig,
    ) -> Result<Self, DriverError> {
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|err| DriverError::Launch(err.to_string()))?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(?err, "browser handler stopped");
                    break;
                }
            }
        });
        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(err) => {
                handler.abort();
                return Err(DriverError::Launch(err.to_string()));
            }
        };
        Ok(Self {
            browser: Mutex::new(Some(browser)),
            page,
            handler,
            elements: DashMap::new(),
            next_element: AtomicU64::new(1),
            navigation_timeout: Duration::from_millis(settings.navigation_timeout_ms),
            poll_interval: Duration::from_millis(settings.locate_poll_ms.max(10)),
        })
    }

    async fn find_once(
        &self,
        selector: &str,
        strategy: SelectorStrategy,
    ) -> Result<Element, CdpError> {
        match strategy {
            SelectorStrategy::Css => self.page.find_element(selector).await,
            SelectorStrategy::Xpath => self.page.find_xpath(selector).await,
            SelectorStrategy::TextContains => {
                self.page.find_xpath(text_contains_xpath(selector)).await
            }
        }
    }

    fn element(&self, handle: &ElementHandle) -> Result<Arc<Element>, DriverError> {
        self.elements
            .get(&handle.id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| DriverError::StaleElement(handle.selector.clone()))
    }

    async fn click(&self, element: &Element, selector: &str) -> Result<(), DriverError> {
        match element.click().await {
            Ok(_) => Ok(()),
            Err(err) => {
                debug!(selector, ?err, "pointer click failed; dispatching script click");
                element
                    .call_js_fn(SCRIPT_CLICK_JS, false)
                    .await
                    .map(|_| ())
                    .map_err(|err| classify_action_error(err, selector))
            }
        }
    }

    async fn type_text(
        &self,
        element: &Element,
        selector: &str,
        text: &str,
    ) -> Result<(), DriverError> {
        element
            .call_js_fn(CLEAR_FIELD_JS, false)
            .await
            .map_err(|err| classify_action_error(err, selector))?;
        element
            .type_str(text)
            .await
            .map(|_| ())
            .map_err(|err| classify_action_error(err, selector))
    }
}

#[async_trait]
impl Driver for ChromiumDriver {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        let started = Instant::now();
        self.elements.clear();
        let goto = tokio::time::timeout(self.navigation_timeout, self.page.goto(url));
        let result = match goto.await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => Err(map_cdp_error(err)),
            Err(_) => Err(DriverError::Timeout(format!("navigation to {url}"))),
        };
        metrics::record_command("navigate", started.elapsed(), &result);
        result
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        let started = Instant::now();
        let result = self
            .page
            .url()
            .await
            .map(Option::unwrap_or_default)
            .map_err(map_cdp_error);
        metrics::record_command("current_url", started.elapsed(), &result);
        result
    }

    async fn page_content(&self) -> Result<String, DriverError> {
        let started = Instant::now();
        let result = self.page.content().await.map_err(map_cdp_error);
        metrics::record_command("page_content", started.elapsed(), &result);
        result
    }

    async fn locate(
        &self,
        selector: &str,
        strategy: SelectorStrategy,
        timeout: Duration,
    ) -> Result<ElementHandle, DriverError> {
        let started = Instant::now();
        let deadline = started + timeout;
        let result = loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match tokio::time::timeout(remaining, self.find_once(selector, strategy)).await {
                Ok(Ok(element)) => {
                    let id = self.next_element.fetch_add(1, Ordering::Relaxed);
                    self.elements.insert(id, Arc::new(element));
                    break Ok(ElementHandle {
                        id,
                        selector: selector.to_string(),
                    });
                }
                Ok(Err(err)) => trace!(selector, %err, "selector not matched yet"),
                Err(_) => {}
            }
            let now = Instant::now();
            if now >= deadline {
                break Err(DriverError::NotFound(selector.to_string()));
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        };
        metrics::record_command("locate", started.elapsed(), &result);
        result
    }

    async fn act(&self, handle: &ElementHandle, action: &UiAction) -> Result<(), DriverError> {
        let started = Instant::now();
        let result = match self.element(handle) {
            Ok(element) => match action {
                UiAction::Click => self.click(&element, &handle.selector).await,
                UiAction::Type(text) => self.type_text(&element, &handle.selector, text).await,
            },
            Err(err) => Err(err),
        };
        metrics::record_command(action.name(), started.elapsed(), &result);
        result
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        let started = Instant::now();
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(false)
            .build();
        let result = self.page.screenshot(params).await.map_err(map_cdp_error);
        metrics::record_command("screenshot", started.elapsed(), &result);
        result
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.elements.clear();
        let Some(mut browser) = self.browser.lock().await.take() else {
            return Ok(());
        };
        let result = browser.close().await.map(|_| ()).map_err(map_cdp_error);
        if let Err(err) = browser.wait().await {
            warn!(?err, "browser process did not exit cleanly");
        }
        self.handler.abort();
        info!("browser session closed");
        result
    }
}

impl Drop for ChromiumDriver {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

fn map_cdp_error(err: CdpError) -> DriverError {
    match err {
        CdpError::Timeout => DriverError::Timeout(err.to_string()),
        other => DriverError::Io(other.to_string()),
    }
}

fn classify_action_error(err: CdpError, selector: &str) -> DriverError {
    let message = err.to_string();
    let lower = message.to_ascii_lowercase();
    if lower.contains("detached")
        || lower.contains("no node")
        || lower.contains("could not find node")
    {
        DriverError::StaleElement(format!("{selector}: {message}"))
    } else if matches!(err, CdpError::Timeout) {
        DriverError::Timeout(format!("{selector}: {message}"))
    } else {
        DriverError::NotInteractable(format!("{selector}: {message}"))
    }
}

/// XPath matching any element whose own text contains `text`.
pub fn text_contains_xpath(text: &str) -> String {
    format!(
        "//*[text()[contains(normalize-space(.), {})]]",
        xpath_literal(text)
    )
}

fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        return format!("'{text}'");
    }
    if !text.contains('"') {
        return format!("\"{text}\"");
    }
    let parts: Vec<String> = text
        .split('\'')
        .map(|part| format!("'{part}'"))
        .collect();
    format!("concat({})", parts.join(", \"'\", "))
}
