//! [`DomDriver`] over canned HTML.
//!
//! A `StaticDom` is a timeline of page snapshots. The active snapshot moves on
//! either after a delay (measured on tokio's clock, so paused-time tests run
//! instantly) or when an element matching a selector is clicked. Every
//! interaction is recorded as a [`DomEvent`].
//!
//! The binary's `--offline` mode runs the menu against a saved page with it.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use tokio::time::Instant;

use super::driver::{DomDriver, NodeRef, Scope};
use crate::core::error::{Result, ScrapeError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DomEvent {
    Navigate(String),
    Click(String),
    Fill { field: String, text: String },
    ScrollTop(String),
}

#[derive(Clone, Debug)]
enum Advance {
    After(Duration),
    OnClick(String),
}

#[derive(Clone, Debug)]
struct Stage {
    url: String,
    html: String,
    /// How this stage hands over to the next one.
    advance: Option<Advance>,
}

#[derive(Debug)]
struct Inner {
    stages: Vec<Stage>,
    active: usize,
    entered_at: Instant,
    /// First handle index of the current generation.
    arena_base: usize,
    /// (stage, element ordinal in document order)
    arena: Vec<(usize, usize)>,
    events: Vec<DomEvent>,
    closed: bool,
    close_calls: usize,
}

#[derive(Clone, Debug)]
pub struct StaticDom {
    inner: Arc<Mutex<Inner>>,
}

impl StaticDom {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                stages: vec![Stage {
                    url: url.into(),
                    html: html.into(),
                    advance: None,
                }],
                active: 0,
                entered_at: Instant::now(),
                arena_base: 0,
                arena: Vec::new(),
                events: Vec::new(),
                closed: false,
                close_calls: 0,
            })),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let html = std::fs::read_to_string(path)?;
        let abs = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        Ok(Self::new(format!("file://{}", abs.display()), html))
    }

    /// Append a stage that becomes active `delay` after the previous one did.
    pub fn then_after(self, delay: Duration, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.push_stage(Advance::After(delay), url.into(), html.into())
    }

    /// Append a stage that becomes active when an element matching `css` is
    /// clicked in the previous one.
    pub fn then_on_click(self, css: &str, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.push_stage(Advance::OnClick(css.to_string()), url.into(), html.into())
    }

    fn push_stage(self, advance: Advance, url: String, html: String) -> Self {
        {
            let mut inner = self.lock();
            if let Some(last) = inner.stages.last_mut() {
                last.advance = Some(advance);
            }
            inner.stages.push(Stage {
                url,
                html,
                advance: None,
            });
        }
        self
    }

    pub fn events(&self) -> Vec<DomEvent> {
        self.lock().events.clone()
    }

    pub fn close_calls(&self) -> usize {
        self.lock().close_calls
    }

    /// Handles issued since the last release.
    pub fn live_handles(&self) -> usize {
        self.lock().arena.len()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Index of the snapshot currently rendered.
    pub fn active_stage(&self) -> usize {
        let mut inner = self.lock();
        inner.tick();
        inner.active
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock only means a test panicked mid-call; the data is still usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn with_live<T>(&self, f: impl FnOnce(&mut Inner) -> Result<T>) -> Result<T> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(ScrapeError::SessionClosed);
        }
        inner.tick();
        f(&mut inner)
    }
}

impl Inner {
    fn tick(&mut self) {
        let now = Instant::now();
        while self.active + 1 < self.stages.len() {
            match self.stages[self.active].advance {
                Some(Advance::After(delay)) if now >= self.entered_at + delay => {
                    self.entered_at += delay;
                    self.active += 1;
                }
                _ => break,
            }
        }
    }

    fn document(&self) -> Html {
        Html::parse_document(&self.stages[self.active].html)
    }

    fn checked(&self, node: NodeRef) -> Result<usize> {
        let slot = node.0.checked_sub(self.arena_base).and_then(|i| self.arena.get(i));
        match slot {
            Some(&(stage, ordinal)) if stage == self.active => Ok(ordinal),
            _ => Err(ScrapeError::StaleNode(node)),
        }
    }

    /// Resolve `node` in the active snapshot and run `f` on it.
    fn on_element<T>(&self, node: NodeRef, f: impl FnOnce(ElementRef<'_>) -> T) -> Result<T> {
        let ordinal = self.checked(node)?;
        let doc = self.document();
        let el = doc
            .select(universal())
            .nth(ordinal)
            .ok_or(ScrapeError::StaleNode(node))?;
        Ok(f(el))
    }
}

static UNIVERSAL: OnceLock<Selector> = OnceLock::new();

fn universal() -> &'static Selector {
    UNIVERSAL.get_or_init(|| Selector::parse("*").expect("universal selector"))
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ScrapeError::Driver(format!("invalid selector {css:?}: {e:?}")))
}

fn describe(el: ElementRef<'_>) -> String {
    let v = el.value();
    match v.attr("name").or_else(|| v.attr("id")) {
        Some(key) => format!("{}[{}]", v.name(), key),
        None => v.name().to_string(),
    }
}

fn visible_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl DomDriver for StaticDom {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.with_live(|inner| {
            inner.events.push(DomEvent::Navigate(url.to_string()));
            Ok(())
        })
    }

    async fn current_url(&self) -> Result<String> {
        self.with_live(|inner| Ok(inner.stages[inner.active].url.clone()))
    }

    async fn query_all(&self, scope: Scope, css: &str) -> Result<Vec<NodeRef>> {
        let selector = parse_selector(css)?;
        self.with_live(|inner| {
            let doc = inner.document();
            let all: Vec<ElementRef<'_>> = doc.select(universal()).collect();
            let index: HashMap<_, usize> =
                all.iter().enumerate().map(|(i, e)| (e.id(), i)).collect();

            let matched: Vec<usize> = match scope {
                Scope::Document => doc
                    .select(&selector)
                    .filter_map(|e| index.get(&e.id()).copied())
                    .collect(),
                Scope::Within(parent) => {
                    let ordinal = inner.checked(parent)?;
                    let parent_el = all.get(ordinal).ok_or(ScrapeError::StaleNode(parent))?;
                    parent_el
                        .select(&selector)
                        .filter_map(|e| index.get(&e.id()).copied())
                        .collect()
                }
            };

            let stage = inner.active;
            let start = inner.arena_base + inner.arena.len();
            inner.arena.extend(matched.into_iter().map(|ord| (stage, ord)));
            Ok((start..inner.arena_base + inner.arena.len()).map(NodeRef).collect())
        })
    }

    async fn attribute(&self, node: NodeRef, name: &str) -> Result<Option<String>> {
        self.with_live(|inner| inner.on_element(node, |el| el.value().attr(name).map(str::to_string)))
    }

    async fn text(&self, node: NodeRef) -> Result<String> {
        self.with_live(|inner| inner.on_element(node, visible_text))
    }

    async fn is_clickable(&self, node: NodeRef) -> Result<bool> {
        self.with_live(|inner| {
            inner.on_element(node, |el| {
                let v = el.value();
                v.attr("disabled").is_none() && v.attr("aria-disabled") != Some("true")
            })
        })
    }

    async fn click(&self, node: NodeRef) -> Result<()> {
        self.with_live(|inner| {
            let trigger = match &inner.stages[inner.active].advance {
                Some(Advance::OnClick(css)) => Some(parse_selector(css)?),
                _ => None,
            };
            let (label, fires) = inner.on_element(node, |el| {
                let fires = trigger.as_ref().is_some_and(|s| s.matches(&el));
                (describe(el), fires)
            })?;
            inner.events.push(DomEvent::Click(label));
            if fires {
                inner.active += 1;
                inner.entered_at = Instant::now();
            }
            Ok(())
        })
    }

    async fn fill(&self, node: NodeRef, text: &str) -> Result<()> {
        self.with_live(|inner| {
            let field = inner.on_element(node, describe)?;
            inner.events.push(DomEvent::Fill {
                field,
                text: text.to_string(),
            });
            Ok(())
        })
    }

    async fn scroll_to_top(&self, node: NodeRef) -> Result<()> {
        self.with_live(|inner| {
            let label = inner.on_element(node, describe)?;
            inner.events.push(DomEvent::ScrollTop(label));
            Ok(())
        })
    }

    async fn release_nodes(&self) {
        let mut inner = self.lock();
        let issued = inner.arena.len();
        inner.arena_base += issued;
        inner.arena.clear();
    }

    async fn close(&self) -> Result<()> {
        let mut inner = self.lock();
        inner.close_calls += 1;
        inner.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
        <div class="guilds">
          <div class="guildItem" aria-label="Rust Lang">R</div>
          <div class="guildItem" aria-label="General Chat">G</div>
        </div>
        <button type="submit" disabled>Go</button>
        </body></html>"#;

    #[tokio::test]
    async fn queries_attributes_and_scoping() {
        let dom = StaticDom::new("https://chat.test/channels/@me", PAGE);
        let guilds = dom.query_all(Scope::Document, ".guilds").await.unwrap();
        assert_eq!(guilds.len(), 1);

        let items = dom
            .query_all(Scope::Within(guilds[0]), r#"[class*="guild"]"#)
            .await
            .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(
            dom.attribute(items[1], "aria-label").await.unwrap().as_deref(),
            Some("General Chat")
        );
        assert_eq!(dom.text(items[0]).await.unwrap(), "R");

        let none = dom.query_all(Scope::Document, "article").await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn disabled_button_is_not_clickable() {
        let dom = StaticDom::new("about:blank", PAGE);
        let btn = dom.query_all(Scope::Document, "button").await.unwrap();
        assert!(!dom.is_clickable(btn[0]).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn stages_advance_on_time_and_click() {
        let dom = StaticDom::new("u0", "<a id='next'>next</a>")
            .then_on_click("#next", "u1", "<p>one</p>")
            .then_after(Duration::from_secs(2), "u2", "<p>two</p>");

        let link = dom.query_all(Scope::Document, "#next").await.unwrap()[0];
        dom.click(link).await.unwrap();
        assert_eq!(dom.current_url().await.unwrap(), "u1");

        // The handle belongs to the previous snapshot now.
        assert!(matches!(dom.text(link).await, Err(ScrapeError::StaleNode(_))));

        tokio::time::advance(Duration::from_millis(1999)).await;
        assert_eq!(dom.active_stage(), 1);
        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(dom.current_url().await.unwrap(), "u2");
        assert_eq!(dom.events(), vec![DomEvent::Click("a[next]".into())]);
    }

    #[tokio::test]
    async fn close_is_recorded_and_blocks_further_queries() {
        let dom = StaticDom::new("about:blank", PAGE);
        dom.close().await.unwrap();
        dom.close().await.unwrap();
        assert_eq!(dom.close_calls(), 2);
        assert!(matches!(
            dom.query_all(Scope::Document, "div").await,
            Err(ScrapeError::SessionClosed)
        ));
    }

    #[tokio::test]
    async fn released_handles_go_stale_and_are_not_reused() {
        let dom = StaticDom::new("about:blank", PAGE);
        let before = dom.query_all(Scope::Document, ".guildItem").await.unwrap();
        assert_eq!(dom.live_handles(), 2);

        dom.release_nodes().await;
        assert_eq!(dom.live_handles(), 0);
        assert!(matches!(dom.text(before[0]).await, Err(ScrapeError::StaleNode(_))));

        let after = dom.query_all(Scope::Document, ".guildItem").await.unwrap();
        assert!(after.iter().all(|n| !before.contains(n)));
        assert_eq!(dom.text(after[0]).await.unwrap(), "R");
    }

    #[tokio::test]
    async fn bad_selector_is_a_driver_error() {
        let dom = StaticDom::new("about:blank", PAGE);
        assert!(matches!(
            dom.query_all(Scope::Document, "[[[").await,
            Err(ScrapeError::Driver(_))
        ));
    }
}
