use tracing::{debug, info, warn};

use super::Session;
use crate::scraping::driver::{NodeRef, Scope};
use crate::scraping::selector::{self, Matcher};

const SERVER_LABEL_ATTRS: [&str; 2] = ["aria-label", "title"];

impl Session {
    /// Open the server whose sidebar label contains `name` (ignoring case).
    ///
    /// Sidebar entries are tried by `aria-label` first, then server icons by
    /// `aria-label` or `title`. On success the matched label becomes the
    /// current server and the current channel is cleared.
    pub async fn goto_server(&mut self, name: &str) -> bool {
        self.release_nodes().await;
        let selectors = &self.config.selectors;
        let matchers: Vec<Matcher> = selectors
            .server_items
            .iter()
            .map(|css| Matcher::attr(css, &["aria-label"], name))
            .chain(
                selectors
                    .server_icons
                    .iter()
                    .map(|css| Matcher::attr(css, &SERVER_LABEL_ATTRS, name)),
            )
            .collect();

        let Some(node) = selector::resolve(self.driver(), Scope::Document, &matchers).await else {
            warn!("server '{}' not found in the sidebar", name);
            return false;
        };
        let label = selector::label_of(self.driver(), node, &SERVER_LABEL_ATTRS)
            .await
            .unwrap_or_else(|| name.to_string());

        if !self.click_and_settle(node, &label).await {
            return false;
        }
        info!("📂 server: {}", label);
        self.current_server = Some(label);
        self.current_channel = None;
        true
    }

    /// Open the channel whose name contains `name` (ignoring case), matching
    /// visible text first and `aria-label` second.
    pub async fn goto_channel(&mut self, name: &str) -> bool {
        self.release_nodes().await;
        let items = &self.config.selectors.channel_items;
        let matchers: Vec<Matcher> = items
            .iter()
            .map(|css| Matcher::text(css, name))
            .chain(items.iter().map(|css| Matcher::attr(css, &["aria-label"], name)))
            .collect();

        let Some(node) = selector::resolve(self.driver(), Scope::Document, &matchers).await else {
            warn!("channel '{}' not found", name);
            return false;
        };
        let label = match self.driver().text(node).await {
            Ok(text) if !text.is_empty() => text,
            _ => selector::label_of(self.driver(), node, &["aria-label"])
                .await
                .unwrap_or_else(|| name.to_string()),
        };

        if !self.click_and_settle(node, &label).await {
            return false;
        }
        info!("#️⃣ channel: {}", label);
        self.current_channel = Some(label);
        true
    }

    /// Visible names in the channel list, sidebar order, blanks dropped.
    pub async fn channel_names(&self) -> Vec<String> {
        self.release_nodes().await;
        let matchers = Matcher::css_list(&self.config.selectors.channel_items);
        let nodes = selector::resolve_all(self.driver(), Scope::Document, &matchers).await;
        let mut names = Vec::with_capacity(nodes.len());
        for node in nodes {
            match self.driver().text(node).await {
                Ok(text) if !text.is_empty() => names.push(text),
                Ok(_) => {}
                Err(e) => debug!("channel name unreadable on {:?}: {}", node, e),
            }
        }
        names
    }

    async fn click_and_settle(&self, node: NodeRef, label: &str) -> bool {
        if let Err(e) = self.driver().click(node).await {
            warn!("click on '{}' failed: {}", label, e);
            return false;
        }
        self.settle().await;
        true
    }
}
