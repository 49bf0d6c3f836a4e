use tracing::debug;

use super::Session;
use crate::core::types::{ChannelSummary, ServerSummary, UserSummary};
use crate::features::aggregate;

/// Messages sampled for channel and user reports.
pub const REPORT_SAMPLE: usize = 100;

const UNKNOWN: &str = "Unknown";

impl Session {
    /// Name and channel list of the open server.
    pub async fn server_info(&mut self) -> ServerSummary {
        self.release_nodes().await;
        let name = self
            .header_text("server header", &self.config.selectors.server_header)
            .await
            .or_else(|| self.current_server.clone())
            .unwrap_or_else(|| UNKNOWN.to_string());
        let channels = self.channel_names().await;
        aggregate::summarize_server(&name, &channels)
    }

    /// Totals over the first [`REPORT_SAMPLE`] messages of the open channel, in
    /// render order once history has been scrolled in.
    pub async fn channel_stats(&mut self) -> ChannelSummary {
        self.release_nodes().await;
        let name = self
            .header_text("channel header", &self.config.selectors.channel_header)
            .await
            .or_else(|| self.current_channel.clone())
            .unwrap_or_else(|| UNKNOWN.to_string());
        let messages = self.collect(REPORT_SAMPLE, None).await;
        aggregate::summarize_channel(&name, &messages)
    }

    /// Messages by `username`: the first [`REPORT_SAMPLE`] of theirs in render
    /// order.
    pub async fn user_info(&mut self, username: &str) -> UserSummary {
        let messages = self.collect(REPORT_SAMPLE, Some(username)).await;
        aggregate::summarize_user(username, messages)
    }

    async fn header_text(&self, what: &str, selectors: &[String]) -> Option<String> {
        let node = match self
            .wait_for(what, selectors, self.config.timeouts.header_wait())
            .await
        {
            Ok(node) => node,
            Err(e) => {
                debug!("{}", e);
                return None;
            }
        };
        self.driver().text(node).await.ok().filter(|t| !t.is_empty())
    }
}
