// collector/browser.rs
use std::ffi::OsStr;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;
use tracing::info;

use crate::cancel::CancelToken;
use crate::collector::scroll::Collection;
use crate::collector::{ListingPage, ScrollCollector};
use crate::config::{CollectorConfig, ExtractionContext};
use crate::errors::{PipelineError, PipelineResult};

const HEIGHT_SCRIPT: &str = "document.body.scrollHeight";
const SCROLL_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight);";

/// One headless Chrome window on the listing page.
pub struct ChromeSession {
    // Keeps the browser process alive for as long as the tab is used.
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeSession {
    pub fn launch(config: &CollectorConfig) -> PipelineResult<Self> {
        info!("Launching browser to scroll {}", config.url);

        let options = LaunchOptions {
            headless: config.headless,
            sandbox: false,
            window_size: Some(config.window_size),
            args: vec![
                OsStr::new("--disable-gpu"),
                OsStr::new("--disable-dev-shm-usage"),
            ],
            idle_browser_timeout: idle_timeout(config),
            ..Default::default()
        };

        let browser = Browser::new(options)
            .map_err(|e| PipelineError::Fetch(format!("Browser launch failed: {e}")))?;
        let tab = browser
            .new_tab()
            .map_err(|e| PipelineError::Fetch(format!("Could not open tab: {e}")))?;
        tab.set_user_agent(&config.user_agent, None, None)
            .map_err(|e| PipelineError::Fetch(format!("Could not set user agent: {e}")))?;

        Ok(Self {
            _browser: browser,
            tab,
        })
    }

    /// Navigate and give the first batch of cards time to render.
    pub fn open(&self, url: &str, initial_wait: Duration) -> PipelineResult<()> {
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| PipelineError::Fetch(format!("Navigation to {url} failed: {e}")))?;
        thread::sleep(initial_wait);
        Ok(())
    }

    fn eval(&self, script: &str) -> PipelineResult<Option<Value>> {
        self.tab
            .evaluate(script, false)
            .map(|object| object.value)
            .map_err(|e| PipelineError::Fetch(format!("Script evaluation failed: {e}")))
    }
}

impl ListingPage for ChromeSession {
    fn page_height(&self) -> PipelineResult<u64> {
        self.eval(HEIGHT_SCRIPT)?
            .and_then(|v| v.as_f64())
            .map(|h| h as u64)
            .ok_or_else(|| PipelineError::Fetch("Page height was not a number".into()))
    }

    fn scroll_to_bottom(&self) -> PipelineResult<()> {
        self.eval(SCROLL_SCRIPT).map(|_| ())
    }

    fn card_markup(&self, selector: &str) -> PipelineResult<Vec<String>> {
        let script = card_markup_script(selector)?;
        let encoded = self
            .eval(&script)?
            .and_then(|v| v.as_str().map(str::to_owned))
            .ok_or_else(|| PipelineError::Fetch("Card query returned nothing".into()))?;

        serde_json::from_str(&encoded)
            .map_err(|e| PipelineError::Fetch(format!("Card query returned bad JSON: {e}")))
    }
}

/// Launch a browser, open `config.url` and run the scroll loop against it.
pub fn collect_listings(
    config: &CollectorConfig,
    ctx: &ExtractionContext,
    cancel: &CancelToken,
) -> PipelineResult<Collection> {
    config.validate()?;
    cancel.check()?;

    let session = ChromeSession::launch(config)?;
    session.open(&config.url, config.initial_wait)?;

    ScrollCollector::new(config.scroll_pause, config.max_scrolls, ctx.card_selector.as_str())
        .collect(&session, cancel)
}

// Serialized in the page so the markup survives the protocol as one string.
fn card_markup_script(selector: &str) -> PipelineResult<String> {
    let quoted = serde_json::to_string(selector)
        .map_err(|e| PipelineError::Config(format!("Bad card selector: {e}")))?;
    Ok(format!(
        "JSON.stringify(Array.from(document.querySelectorAll({quoted})).map(el => el.outerHTML))"
    ))
}

// The browser is torn down when idle longer than this; a scroll pause must
// never hit it.
fn idle_timeout(config: &CollectorConfig) -> Duration {
    let floor = Duration::from_secs(60);
    let needed = (config.scroll_pause + config.initial_wait) * 4;
    needed.max(floor)
}
