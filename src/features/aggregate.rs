//! Summaries over already collected snapshots. Nothing here touches the page.

use std::collections::HashSet;

use crate::core::types::{
    ChannelSummary, ScrapedMessage, ServerSummary, UserSummary, SERVER_CHANNEL_CAP,
};

/// Distinct non-empty author names.
pub fn unique_authors(messages: &[ScrapedMessage]) -> usize {
    messages
        .iter()
        .map(|m| m.author.as_str())
        .filter(|a| !a.is_empty())
        .collect::<HashSet<_>>()
        .len()
}

fn totals(messages: &[ScrapedMessage]) -> (u64, u64) {
    messages.iter().fold((0, 0), |(att, react), m| {
        (
            att + u64::from(m.attachment_count),
            react + u64::from(m.reaction_count),
        )
    })
}

pub fn summarize_channel(name: &str, messages: &[ScrapedMessage]) -> ChannelSummary {
    let (total_attachments, total_reactions) = totals(messages);
    ChannelSummary {
        channel_name: name.to_string(),
        message_count: messages.len(),
        unique_authors: unique_authors(messages),
        total_attachments,
        total_reactions,
    }
}

pub fn summarize_user(username: &str, messages: Vec<ScrapedMessage>) -> UserSummary {
    let (total_attachments, total_reactions) = totals(&messages);
    UserSummary {
        username: username.to_string(),
        message_count: messages.len(),
        messages,
        total_attachments,
        total_reactions,
    }
}

/// `channel_count` counts every non-empty name; `channels` keeps the first
/// [`SERVER_CHANNEL_CAP`] of them.
pub fn summarize_server(name: &str, channel_names: &[String]) -> ServerSummary {
    let named: Vec<&String> = channel_names.iter().filter(|c| !c.trim().is_empty()).collect();
    ServerSummary {
        server_name: name.to_string(),
        channel_count: named.len(),
        channels: named
            .into_iter()
            .take(SERVER_CHANNEL_CAP)
            .cloned()
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(author: &str, attachments: u32, reactions: u32) -> ScrapedMessage {
        ScrapedMessage {
            author: author.into(),
            content: String::new(),
            timestamp: String::new(),
            attachment_count: attachments,
            reaction_count: reactions,
        }
    }

    #[test]
    fn channel_totals_and_distinct_authors() {
        let batch = vec![msg("a", 2, 0), msg("a", 1, 4), msg("b", 0, 1)];
        let s = summarize_channel("general", &batch);
        assert_eq!(s.message_count, 3);
        assert_eq!(s.unique_authors, 2);
        assert_eq!(s.total_attachments, 3);
        assert_eq!(s.total_reactions, 5);
    }

    #[test]
    fn blank_authors_are_not_counted() {
        let batch = vec![msg("", 0, 0), msg("a", 0, 0), msg("A", 0, 0)];
        assert_eq!(unique_authors(&batch), 2);
        assert_eq!(unique_authors(&[]), 0);
    }

    #[test]
    fn user_summary_keeps_messages_in_order() {
        let s = summarize_user("ferris", vec![msg("ferris", 1, 0), msg("Ferris_", 0, 2)]);
        assert_eq!(s.message_count, 2);
        assert_eq!(s.messages[1].author, "Ferris_");
        assert_eq!((s.total_attachments, s.total_reactions), (1, 2));
    }

    #[test]
    fn server_summary_caps_names_but_counts_all() {
        let names: Vec<String> = (0..60)
            .map(|i| format!("channel-{}", i))
            .chain(std::iter::once("   ".to_string()))
            .collect();
        let s = summarize_server("Rustaceans", &names);
        assert_eq!(s.channel_count, 60);
        assert_eq!(s.channels.len(), SERVER_CHANNEL_CAP);
        assert_eq!(s.channels[0], "channel-0");
    }
}
