use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Maximum number of channel names carried in a [`ServerSummary`].
pub const SERVER_CHANNEL_CAP: usize = 50;

/// One message as observed in the rendered channel view.
///
/// Field names on the wire follow the exports the tool has always produced
/// (`username`, `attachments`, `reactions`).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ScrapedMessage {
    #[serde(rename = "username")]
    pub author: String,
    #[serde(default)]
    pub content: String,
    /// Either the `datetime` attribute of the message's `<time>` element or,
    /// when the client does not expose one, the visible timestamp text as shown.
    #[serde(default)]
    pub timestamp: String,
    #[serde(rename = "attachments", default)]
    pub attachment_count: u32,
    #[serde(rename = "reactions", default)]
    pub reaction_count: u32,
}

impl ScrapedMessage {
    /// Parse the timestamp when it is machine-readable (RFC 3339).
    /// Display text such as `"Today at 4:12 PM"` yields `None`.
    pub fn parsed_timestamp(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(self.timestamp.trim()).ok()
    }

    pub fn author_matches(&self, filter: &str) -> bool {
        contains_ignore_case(&self.author, filter)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerSummary {
    pub server_name: String,
    pub channel_count: usize,
    /// First [`SERVER_CHANNEL_CAP`] channel names in sidebar order.
    pub channels: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ChannelSummary {
    pub channel_name: String,
    pub message_count: usize,
    pub unique_authors: usize,
    pub total_attachments: u64,
    pub total_reactions: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct UserSummary {
    pub username: String,
    pub messages: Vec<ScrapedMessage>,
    pub message_count: usize,
    pub total_attachments: u64,
    pub total_reactions: u64,
}

/// Case-insensitive substring test used by every fuzzy match in the crate.
/// An empty needle matches everything.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(ts: &str) -> ScrapedMessage {
        ScrapedMessage {
            author: "Ferris".into(),
            content: "hello".into(),
            timestamp: ts.into(),
            attachment_count: 0,
            reaction_count: 0,
        }
    }

    #[test]
    fn wire_names_match_legacy_exports() {
        let json = serde_json::to_value(msg("2024-05-01T10:00:00.000Z")).unwrap();
        assert_eq!(json["username"], "Ferris");
        assert_eq!(json["attachments"], 0);
        assert_eq!(json["reactions"], 0);
        assert!(json.get("author").is_none());
    }

    #[test]
    fn machine_timestamp_parses_display_text_does_not() {
        assert!(msg("2024-05-01T10:00:00.000Z").parsed_timestamp().is_some());
        assert!(msg("Today at 4:12 PM").parsed_timestamp().is_none());
        assert!(msg("").parsed_timestamp().is_none());
    }

    #[test]
    fn author_filter_is_case_insensitive() {
        let m = msg("");
        assert!(m.author_matches("ferr"));
        assert!(m.author_matches("RIS"));
        assert!(!m.author_matches("crab"));
    }
}
