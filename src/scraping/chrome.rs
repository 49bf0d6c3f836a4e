//! Live Chromium implementation of [`DomDriver`] over CDP (`chromiumoxide`).

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::cdp::js_protocol::runtime::ReleaseObjectParams;
use chromiumoxide::{Browser, Element, Page};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::browser_manager::{build_session_config, find_chrome_executable};
use super::driver::{DomDriver, NodeRef, Scope};
use super::stealth::navigator_mask_script;
use crate::core::config::ScoutConfig;
use crate::core::error::{Result, ScrapeError};

const IS_CLICKABLE_JS: &str = "function() { \
    const r = this.getBoundingClientRect(); \
    return !this.disabled && r.width > 0 && r.height > 0; \
}";
const CLEAR_INPUT_JS: &str = "function() { this.focus(); this.value = ''; }";
const SCROLL_TOP_JS: &str = "function() { this.scrollTop = 0; }";

/// Handles issued since the last release. `base` is the first index of the
/// current generation, so indices from an earlier one never resolve again.
#[derive(Debug)]
struct Arena<T> {
    base: usize,
    items: Vec<T>,
}

impl<T> Arena<T> {
    fn new() -> Self {
        Self {
            base: 0,
            items: Vec::new(),
        }
    }

    fn get(&self, node: NodeRef) -> Result<&T> {
        node.0
            .checked_sub(self.base)
            .and_then(|i| self.items.get(i))
            .ok_or(ScrapeError::StaleNode(node))
    }

    fn register(&mut self, items: Vec<T>) -> Vec<NodeRef> {
        let start = self.base + self.items.len();
        self.items.extend(items);
        (start..self.base + self.items.len()).map(NodeRef).collect()
    }

    /// Start a new generation, handing back the old one.
    fn release(&mut self) -> Vec<T> {
        self.base += self.items.len();
        std::mem::take(&mut self.items)
    }
}

/// One browser process with one tab.
///
/// Elements handed out as [`NodeRef`]s live in an arena that is released on
/// every navigation and whenever the session starts a new operation; a handle
/// from before a release is reported as stale.
pub struct ChromeDriver {
    browser: Mutex<Option<Browser>>,
    page: Page,
    handler_task: std::sync::Mutex<Option<JoinHandle<()>>>,
    arena: Mutex<Arena<Element>>,
}

impl ChromeDriver {
    pub async fn launch(config: &ScoutConfig, headless: bool) -> Result<Self> {
        let exe = find_chrome_executable().ok_or_else(|| {
            ScrapeError::Launch(
                "No browser found. Install Chrome or Chromium, or set CHROME_EXECUTABLE.".into(),
            )
        })?;

        info!("🚀 launching browser session ({}, headless={})", exe, headless);
        let browser_config = build_session_config(&exe, config, headless)?;

        let (mut browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ScrapeError::Launch(format!("{} ({})", e, exe)))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!("CDP handler error: {}", e);
                }
            }
        });

        let page = match Self::prepare_page(&browser).await {
            Ok(page) => page,
            Err(e) => {
                browser.close().await.ok();
                handler_task.abort();
                return Err(e);
            }
        };

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            page,
            handler_task: std::sync::Mutex::new(Some(handler_task)),
            arena: Mutex::new(Arena::new()),
        })
    }

    async fn prepare_page(browser: &Browser) -> Result<Page> {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScrapeError::Launch(format!("failed to open tab: {}", e)))?;

        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(
            navigator_mask_script(),
        ))
        .await
        .map_err(|e| ScrapeError::Launch(format!("failed to inject navigator mask: {}", e)))?;

        Ok(page)
    }

    /// Free the page-side objects behind a released generation.
    async fn release_remote(&self, elements: Vec<Element>) {
        if elements.is_empty() {
            return;
        }
        let count = elements.len();
        for el in elements {
            if let Err(e) = self
                .page
                .execute(ReleaseObjectParams::new(el.remote_object_id.clone()))
                .await
            {
                debug!("releaseObject failed (ignored): {}", e);
            }
        }
        debug!("released {} element handle(s)", count);
    }

    async fn call_on(&self, node: NodeRef, js: &str) -> Result<Option<serde_json::Value>> {
        let arena = self.arena.lock().await;
        let el = arena.get(node)?;
        let ret = el
            .call_js_fn(js, false)
            .await
            .map_err(ScrapeError::driver)?;
        Ok(ret.result.value)
    }
}

#[async_trait]
impl DomDriver for ChromeDriver {
    async fn navigate(&self, url: &str) -> Result<()> {
        // A new document invalidates every remote object; just forget them.
        drop(self.arena.lock().await.release());
        debug!("navigate: {}", url);
        self.page.goto(url).await.map_err(ScrapeError::driver)?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        let url = self.page.url().await.map_err(ScrapeError::driver)?;
        Ok(url.unwrap_or_default())
    }

    async fn query_all(&self, scope: Scope, css: &str) -> Result<Vec<NodeRef>> {
        let found = match scope {
            Scope::Document => self
                .page
                .find_elements(css)
                .await
                .map_err(ScrapeError::driver)?,
            Scope::Within(parent) => {
                let arena = self.arena.lock().await;
                arena
                    .get(parent)?
                    .find_elements(css)
                    .await
                    .map_err(ScrapeError::driver)?
            }
        };
        Ok(self.arena.lock().await.register(found))
    }

    async fn attribute(&self, node: NodeRef, name: &str) -> Result<Option<String>> {
        let arena = self.arena.lock().await;
        let el = arena.get(node)?;
        el.attribute(name).await.map_err(ScrapeError::driver)
    }

    async fn text(&self, node: NodeRef) -> Result<String> {
        let arena = self.arena.lock().await;
        let el = arena.get(node)?;
        let text = el.inner_text().await.map_err(ScrapeError::driver)?;
        Ok(text.unwrap_or_default().trim().to_string())
    }

    async fn is_clickable(&self, node: NodeRef) -> Result<bool> {
        let value = self.call_on(node, IS_CLICKABLE_JS).await?;
        Ok(value.and_then(|v| v.as_bool()).unwrap_or(false))
    }

    async fn click(&self, node: NodeRef) -> Result<()> {
        let arena = self.arena.lock().await;
        let el = arena.get(node)?;
        el.click().await.map_err(ScrapeError::driver)?;
        Ok(())
    }

    async fn fill(&self, node: NodeRef, text: &str) -> Result<()> {
        self.call_on(node, CLEAR_INPUT_JS).await?;
        let arena = self.arena.lock().await;
        let el = arena.get(node)?;
        el.type_str(text).await.map_err(ScrapeError::driver)?;
        Ok(())
    }

    async fn scroll_to_top(&self, node: NodeRef) -> Result<()> {
        self.call_on(node, SCROLL_TOP_JS).await?;
        Ok(())
    }

    async fn release_nodes(&self) {
        let released = self.arena.lock().await.release();
        self.release_remote(released).await;
    }

    async fn close(&self) -> Result<()> {
        let Some(mut browser) = self.browser.lock().await.take() else {
            return Ok(());
        };
        drop(self.arena.lock().await.release());

        if let Err(e) = browser.close().await {
            warn!("Browser close error (non-fatal): {}", e);
        }
        browser.wait().await.ok();

        if let Ok(mut task) = self.handler_task.lock() {
            if let Some(task) = task.take() {
                task.abort();
            }
        }
        info!("🛑 browser session closed");
        Ok(())
    }
}

impl Drop for ChromeDriver {
    fn drop(&mut self) {
        // Drop cannot await; hand the close to the runtime if one is around so
        // an interrupted run does not leave a Chromium process behind.
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };

        if let Ok(mut guard) = self.browser.try_lock() {
            if let Some(mut browser) = guard.take() {
                handle.spawn(async move {
                    let _ = browser.close().await;
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn released_handles_stay_stale() {
        let mut arena = Arena::new();
        let first = arena.register(vec!["a", "b", "c"]);
        assert_eq!(arena.get(first[1]).unwrap(), &"b");

        assert_eq!(arena.release(), vec!["a", "b", "c"]);
        let second = arena.register(vec!["d"]);
        assert_eq!(second, vec![NodeRef(3)]);
        assert_eq!(arena.get(second[0]).unwrap(), &"d");
        for old in first {
            assert!(matches!(arena.get(old), Err(ScrapeError::StaleNode(n)) if n == old));
        }
        assert!(arena.get(NodeRef(4)).is_err());
    }
}
