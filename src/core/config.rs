use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ScoutConfig: file-based config loader (chat-scout.json) with env-var fallback
// ---------------------------------------------------------------------------

pub const ENV_CONFIG_PATH: &str = "CHAT_SCOUT_CONFIG";
pub const ENV_BASE_URL: &str = "CHAT_SCOUT_BASE_URL";
pub const ENV_HEADLESS: &str = "CHAT_SCOUT_HEADLESS";
pub const ENV_OUTPUT_DIR: &str = "CHAT_SCOUT_OUTPUT_DIR";
pub const ENV_CHROME_EXECUTABLE: &str = "CHROME_EXECUTABLE";
pub const ENV_EMAIL: &str = "DISCORD_EMAIL";
pub const ENV_PASSWORD: &str = "DISCORD_PASSWORD";

const DEFAULT_BASE_URL: &str = "https://discord.com";

/// Every bounded wait in the session. Seconds unless the field says otherwise.
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Login form fields and the submit button.
    pub field_wait_secs: u64,
    /// How long to look for a second-factor input after submitting.
    pub second_factor_check_secs: u64,
    /// Manual second-factor resolution window.
    pub second_factor_secs: u64,
    /// Authenticated app shell after login.
    pub landing_secs: u64,
    /// Server / channel header text.
    pub header_wait_secs: u64,
    /// Message list container before scrolling.
    pub message_list_wait_secs: u64,
    /// Pause after a navigation click and after the last history scroll.
    pub settle_ms: u64,
    /// Pause after each scroll-to-top.
    pub scroll_pause_ms: u64,
    pub poll_interval_ms: u64,
    pub max_scroll_passes: usize,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            field_wait_secs: 10,
            second_factor_check_secs: 5,
            second_factor_secs: 300,
            landing_secs: 30,
            header_wait_secs: 5,
            message_list_wait_secs: 10,
            settle_ms: 2000,
            scroll_pause_ms: 1000,
            poll_interval_ms: 250,
            max_scroll_passes: 5,
        }
    }
}

impl TimeoutConfig {
    pub fn field_wait(&self) -> Duration {
        Duration::from_secs(self.field_wait_secs)
    }
    pub fn second_factor_check(&self) -> Duration {
        Duration::from_secs(self.second_factor_check_secs)
    }
    pub fn second_factor(&self) -> Duration {
        Duration::from_secs(self.second_factor_secs)
    }
    pub fn landing(&self) -> Duration {
        Duration::from_secs(self.landing_secs)
    }
    pub fn header_wait(&self) -> Duration {
        Duration::from_secs(self.header_wait_secs)
    }
    pub fn message_list_wait(&self) -> Duration {
        Duration::from_secs(self.message_list_wait_secs)
    }
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
    pub fn scroll_pause(&self) -> Duration {
        Duration::from_millis(self.scroll_pause_ms)
    }
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(10))
    }
}

/// CSS selectors for every DOM slot the session reads, each a ranked list.
///
/// The web client exposes no stable ids, so the defaults lean on hashed class
/// name prefixes (`[class*="..."]`) and the few data attributes that have been
/// stable across releases.
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct SelectorConfig {
    pub email_input: Vec<String>,
    pub password_input: Vec<String>,
    pub submit_button: Vec<String>,
    pub second_factor_input: Vec<String>,
    /// Present only once the authenticated app shell has rendered.
    pub guild_list: Vec<String>,
    /// Sidebar server entries, matched by `aria-label`.
    pub server_items: Vec<String>,
    /// Server icons, matched by `aria-label` or `title`.
    pub server_icons: Vec<String>,
    pub channel_items: Vec<String>,
    pub server_header: Vec<String>,
    pub channel_header: Vec<String>,
    pub message_list: Vec<String>,
    pub message_items: Vec<String>,
    pub message_author: Vec<String>,
    pub message_content: Vec<String>,
    pub message_timestamp: Vec<String>,
    pub message_attachments: Vec<String>,
    pub message_reactions: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            email_input: strings(&[r#"input[name="email"]"#]),
            password_input: strings(&[r#"input[name="password"]"#]),
            submit_button: strings(&[r#"button[type="submit"]"#]),
            second_factor_input: strings(&[r#"input[name="code"]"#]),
            guild_list: strings(&[r#"nav[aria-label*="Servers"]"#, r#"[class*="guilds"]"#]),
            server_items: strings(&[
                r#"[data-list-item-id^="guildsnav___"]"#,
                r#"[class*="guild"], [class*="server"]"#,
            ]),
            server_icons: strings(&[r#"[class*="guildIcon"], [class*="serverIcon"]"#]),
            channel_items: strings(&[
                r#"a[data-list-item-id^="channels___"]"#,
                r#"[class*="channelName"]"#,
                r#"[class*="channel"]"#,
            ]),
            server_header: strings(&[r#"[class*="headerText"]"#, r#"[class*="serverName"]"#]),
            channel_header: strings(&[
                r#"section[aria-label="Channel header"] h1"#,
                r#"[class*="channelName"]"#,
                r#"[class*="headerText"]"#,
            ]),
            message_list: strings(&[
                r#"ol[data-list-id="chat-messages"]"#,
                r#"[class*="messageList"]"#,
                r#"[class*="messages"]"#,
            ]),
            message_items: strings(&[
                r#"li[id^="chat-messages-"]"#,
                r#"[class*="messageListItem"]"#,
            ]),
            message_author: strings(&[r#"[class*="username"]"#, r#"[class*="author"]"#]),
            message_content: strings(&[
                r#"[id^="message-content-"]"#,
                r#"[class*="messageContent"]"#,
            ]),
            message_timestamp: strings(&["time", r#"[class*="timestamp"]"#]),
            message_attachments: strings(&[
                r#"[class*="attachment"]"#,
                r#"[id^="message-accessories-"] img, [id^="message-accessories-"] video"#,
            ]),
            message_reactions: strings(&[
                r#"[class*="reaction_"]"#,
                r#"[class*="reaction"]:not([class*="reactions"]):not([class*="reactionInner"]):not([class*="reactionCount"])"#,
            ]),
        }
    }
}

/// Top-level config loaded from `chat-scout.json`.
#[derive(Deserialize, Serialize, Default, Clone, Debug)]
#[serde(default)]
pub struct ScoutConfig {
    pub base_url: Option<String>,
    pub headless: Option<bool>,
    pub output_dir: Option<String>,
    /// Fixed user agent; a desktop UA is drawn from a pool when unset.
    pub user_agent: Option<String>,
    pub window_width: Option<u32>,
    pub window_height: Option<u32>,
    pub timeouts: TimeoutConfig,
    pub selectors: SelectorConfig,
}

impl ScoutConfig {
    /// Web client origin: JSON field → `CHAT_SCOUT_BASE_URL` → `https://discord.com`.
    pub fn resolve_base_url(&self) -> String {
        if let Some(u) = &self.base_url {
            if !u.trim().is_empty() {
                return u.trim().trim_end_matches('/').to_string();
            }
        }
        std::env::var(ENV_BASE_URL)
            .ok()
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    pub fn login_url(&self) -> String {
        format!("{}/login", self.resolve_base_url())
    }

    /// Headless mode: JSON field → `CHAT_SCOUT_HEADLESS` → `false` (the second
    /// factor needs a visible window).
    pub fn resolve_headless(&self) -> bool {
        if let Some(b) = self.headless {
            return b;
        }
        std::env::var(ENV_HEADLESS)
            .map(|v| is_truthy(&v))
            .unwrap_or(false)
    }

    /// Export directory: JSON field → `CHAT_SCOUT_OUTPUT_DIR` → current directory.
    pub fn resolve_output_dir(&self) -> PathBuf {
        if let Some(d) = &self.output_dir {
            if !d.trim().is_empty() {
                return PathBuf::from(d.trim());
            }
        }
        std::env::var(ENV_OUTPUT_DIR)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn window_size(&self) -> (u32, u32) {
        (
            self.window_width.unwrap_or(1920),
            self.window_height.unwrap_or(1080),
        )
    }
}

fn is_truthy(v: &str) -> bool {
    matches!(
        v.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Load `chat-scout.json` from standard locations.
///
/// Search order (first found wins):
/// 1. `explicit` (the binary's `--config` flag)
/// 2. `CHAT_SCOUT_CONFIG` env var path
/// 3. `./chat-scout.json`
/// 4. `~/.chat-scout/config.json`
///
/// Missing file → `ScoutConfig::default()`.
/// Parse error → log a warning, return `ScoutConfig::default()`.
pub fn load_scout_config(explicit: Option<&Path>) -> ScoutConfig {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(p) = explicit {
        candidates.push(p.to_path_buf());
    }
    if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
        candidates.push(PathBuf::from(env_path));
    }
    candidates.push(PathBuf::from("chat-scout.json"));
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".chat-scout").join("config.json"));
    }

    for path in &candidates {
        let Ok(contents) = std::fs::read_to_string(path) else {
            continue;
        };
        return parse_config(&contents, path);
    }

    ScoutConfig::default()
}

fn parse_config(contents: &str, path: &Path) -> ScoutConfig {
    match serde_json::from_str::<ScoutConfig>(contents) {
        Ok(cfg) => {
            tracing::info!("chat-scout config loaded from {}", path.display());
            cfg
        }
        Err(e) => {
            tracing::warn!(
                "chat-scout config parse error at {}: {}; using defaults",
                path.display(),
                e
            );
            ScoutConfig::default()
        }
    }
}

/// Login credentials. `Debug` never prints the password.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// `DISCORD_EMAIL` + `DISCORD_PASSWORD`; `None` unless both are non-empty.
    pub fn from_env() -> Option<Self> {
        let email = std::env::var(ENV_EMAIL).ok().filter(|v| !v.trim().is_empty())?;
        let password = std::env::var(ENV_PASSWORD).ok().filter(|v| !v.is_empty())?;
        Some(Self {
            email: email.trim().to_string(),
            password,
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults_for_the_rest() {
        let cfg = parse_config(
            r#"{"base_url": "https://chat.example.org/", "timeouts": {"landing_secs": 45}}"#,
            Path::new("inline.json"),
        );
        assert_eq!(cfg.resolve_base_url(), "https://chat.example.org");
        assert_eq!(cfg.login_url(), "https://chat.example.org/login");
        assert_eq!(cfg.timeouts.landing(), Duration::from_secs(45));
        assert_eq!(cfg.timeouts.field_wait(), Duration::from_secs(10));
        assert_eq!(cfg.timeouts.second_factor(), Duration::from_secs(300));
        assert_eq!(cfg.selectors.second_factor_input, vec![r#"input[name="code"]"#]);
    }

    #[test]
    fn malformed_json_falls_back_to_defaults() {
        let cfg = parse_config("{ not json", Path::new("broken.json"));
        assert!(cfg.base_url.is_none());
        assert_eq!(cfg.timeouts.max_scroll_passes, 5);
    }

    #[test]
    fn explicit_fields_win_over_env() {
        let cfg = ScoutConfig {
            headless: Some(true),
            output_dir: Some("exports".into()),
            ..Default::default()
        };
        assert!(cfg.resolve_headless());
        assert_eq!(cfg.resolve_output_dir(), PathBuf::from("exports"));
    }

    #[test]
    fn credentials_debug_redacts_password() {
        let c = Credentials {
            email: "a@b.c".into(),
            password: "hunter2".into(),
        };
        let shown = format!("{:?}", c);
        assert!(shown.contains("a@b.c"));
        assert!(!shown.contains("hunter2"));
    }

    #[test]
    fn truthy_values() {
        assert!(is_truthy("1"));
        assert!(is_truthy(" YES "));
        assert!(!is_truthy("0"));
        assert!(!is_truthy(""));
    }
}
