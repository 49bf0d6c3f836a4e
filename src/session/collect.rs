use tracing::{debug, info, warn};

use super::Session;
use crate::core::error::{Result, ScrapeError};
use crate::core::types::{contains_ignore_case, ScrapedMessage};
use crate::scraping::driver::{NodeRef, Scope};
use crate::scraping::selector::{self, Matcher};

/// Roughly one scroll-to-top loads this many older messages.
const MESSAGES_PER_SCROLL: usize = 10;

impl Session {
    /// Scroll the message list to its top a few times so older messages
    /// render. Performs `min(approx_count / 10, max_scroll_passes)` passes
    /// with a pause after each and returns how many ran; `0` when the list
    /// never appeared.
    pub async fn scroll_history(&mut self, approx_count: usize) -> usize {
        self.release_nodes().await;
        let timeouts = &self.config.timeouts;
        let passes = (approx_count / MESSAGES_PER_SCROLL).min(timeouts.max_scroll_passes);
        if passes == 0 {
            return 0;
        }

        let container = match self
            .wait_for(
                "message list",
                &self.config.selectors.message_list,
                timeouts.message_list_wait(),
            )
            .await
        {
            Ok(node) => node,
            Err(e) => {
                warn!("no message list to scroll: {}", e);
                return 0;
            }
        };

        let mut done = 0;
        for pass in 1..=passes {
            if let Err(e) = self.driver().scroll_to_top(container).await {
                warn!("scroll pass {}/{} failed: {}", pass, passes, e);
                break;
            }
            done = pass;
            tokio::time::sleep(timeouts.scroll_pause()).await;
        }
        debug!("scrolled history {} time(s)", done);
        done
    }

    /// Read up to `limit` messages from the open channel in DOM order.
    ///
    /// The list is scrolled for older history, then given the settle delay
    /// before it is read, whatever the limit.
    ///
    /// With `author_filter`, only messages whose author contains the filter
    /// (ignoring case) count towards the limit. A message missing its author,
    /// content or timestamp element is skipped, never fatal.
    pub async fn collect(&mut self, limit: usize, author_filter: Option<&str>) -> Vec<ScrapedMessage> {
        if limit == 0 {
            return Vec::new();
        }
        self.scroll_history(limit).await;
        self.settle().await;

        let filter = author_filter.map(str::trim).filter(|f| !f.is_empty());
        let items = Matcher::css_list(&self.config.selectors.message_items);
        let nodes = selector::resolve_all(self.driver(), Scope::Document, &items).await;

        let mut messages = Vec::with_capacity(limit.min(nodes.len()));
        let mut skipped = 0usize;
        for node in nodes {
            if messages.len() >= limit {
                break;
            }
            match self.read_message(node, filter).await {
                Ok(Some(message)) => messages.push(message),
                Ok(None) => {}
                Err(e) => {
                    skipped += 1;
                    debug!("skipping message {:?}: {}", node, e);
                }
            }
        }

        info!(
            "📨 collected {} message(s) (limit {}, filter {:?}, skipped {})",
            messages.len(),
            limit,
            filter,
            skipped
        );
        messages
    }

    /// `Ok(None)` when the author does not pass the filter.
    async fn read_message(&self, node: NodeRef, filter: Option<&str>) -> Result<Option<ScrapedMessage>> {
        let selectors = &self.config.selectors;

        let author = self.sub_text(node, "author", &selectors.message_author).await?;
        if let Some(f) = filter {
            if !contains_ignore_case(&author, f) {
                return Ok(None);
            }
        }
        let content = self.sub_text(node, "content", &selectors.message_content).await?;

        let stamp = self
            .sub_element(node, "timestamp", &selectors.message_timestamp)
            .await?;
        let timestamp = match self.driver().attribute(stamp, "datetime").await? {
            Some(v) if !v.trim().is_empty() => v.trim().to_string(),
            _ => self.driver().text(stamp).await?,
        };

        let scope = Scope::Within(node);
        let attachments = Matcher::css_list(&selectors.message_attachments);
        let reactions = Matcher::css_list(&selectors.message_reactions);
        let attachment_count = selector::count(self.driver(), scope, &attachments).await;
        let reaction_count = selector::count(self.driver(), scope, &reactions).await;

        Ok(Some(ScrapedMessage {
            author,
            content,
            timestamp,
            attachment_count: u32::try_from(attachment_count).unwrap_or(u32::MAX),
            reaction_count: u32::try_from(reaction_count).unwrap_or(u32::MAX),
        }))
    }

    async fn sub_element(&self, node: NodeRef, what: &str, selectors: &[String]) -> Result<NodeRef> {
        selector::resolve(self.driver(), Scope::Within(node), &Matcher::css_list(selectors))
            .await
            .ok_or_else(|| ScrapeError::ElementNotFound(format!("message {}", what)))
    }

    async fn sub_text(&self, node: NodeRef, what: &str, selectors: &[String]) -> Result<String> {
        let el = self.sub_element(node, what, selectors).await?;
        self.driver().text(el).await
    }
}
