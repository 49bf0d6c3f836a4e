//! Browser discovery and launch configuration.
//!
//! * Finding a usable browser executable (Chrome → Chromium → Brave, cross-platform).
//! * Building a `BrowserConfig` that keeps the automation fingerprint low.
//!
//! Stealth model:
//! - This module provides *process-level* defaults (user-agent, browser flags).
//! - JS-level masking is injected per page by [`super::chrome::ChromeDriver`]
//!   (see [`super::stealth`]).

use chromiumoxide::browser::BrowserConfig;
use chromiumoxide::handler::viewport::Viewport;
use rand::seq::IndexedRandom;
use std::path::Path;

use crate::core::config::{ScoutConfig, ENV_CHROME_EXECUTABLE};
use crate::core::error::{Result, ScrapeError};

// ── Desktop User-Agent pool ──────────────────────────────────────────────────

const DESKTOP_USER_AGENTS: &[&str] = &[
    // Chrome 132 – Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36",
    // Chrome 132 – macOS
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36",
    // Chrome 131 – Linux
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
];

/// Returns a randomly-chosen Chromium desktop User-Agent string.
///
/// Only Chromium UAs are pooled: the browser underneath is always Chromium
/// and a Firefox/Safari UA over Blink is itself a fingerprint.
pub fn random_user_agent() -> &'static str {
    let mut rng = rand::rng();
    DESKTOP_USER_AGENTS
        .choose(&mut rng)
        .copied()
        .unwrap_or(DESKTOP_USER_AGENTS[0])
}

// ── Browser executable discovery ─────────────────────────────────────────────

/// Find a usable Chromium-family browser executable.
///
/// Resolution order:
/// 1. `CHROME_EXECUTABLE` env var (explicit override)
/// 2. PATH scan
/// 3. OS-specific well-known install paths
pub fn find_chrome_executable() -> Option<String> {
    if let Ok(p) = std::env::var(ENV_CHROME_EXECUTABLE) {
        let p = p.trim();
        if !p.is_empty() && Path::new(p).exists() {
            return Some(p.to_string());
        }
    }

    if let Ok(path_var) = std::env::var("PATH") {
        let candidates = [
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
            "chrome",
            "brave-browser",
        ];
        for dir in std::env::split_paths(&path_var) {
            for exe in candidates {
                let full = dir.join(exe);
                if full.exists() {
                    return Some(full.to_string_lossy().to_string());
                }
            }
        }
    }

    well_known_paths()
        .iter()
        .find(|c| Path::new(c).exists())
        .map(|c| c.to_string())
}

#[cfg(target_os = "macos")]
fn well_known_paths() -> &'static [&'static str] {
    &[
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
    ]
}

#[cfg(target_os = "linux")]
fn well_known_paths() -> &'static [&'static str] {
    &[
        "/usr/bin/google-chrome",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/usr/local/bin/chromium",
        "/snap/bin/chromium",
    ]
}

#[cfg(target_os = "windows")]
fn well_known_paths() -> &'static [&'static str] {
    &[
        r"C:\Program Files\Google\Chrome\Application\chrome.exe",
        r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
    ]
}

#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
fn well_known_paths() -> &'static [&'static str] {
    &[]
}

// ── Launch config ────────────────────────────────────────────────────────────

/// Build a `BrowserConfig` for an interactive (or headless) login session.
///
/// chromiumoxide's default argument set includes `--enable-automation`, which
/// raises the "controlled by automated software" infobar and flips
/// `navigator.webdriver`; the defaults are dropped and a curated set is passed
/// instead.
pub fn build_session_config(exe: &str, config: &ScoutConfig, headless: bool) -> Result<BrowserConfig> {
    let (width, height) = config.window_size();
    let ua = config
        .user_agent
        .clone()
        .unwrap_or_else(|| random_user_agent().to_string());

    let mut builder = BrowserConfig::builder()
        .chrome_executable(exe)
        .disable_default_args()
        .viewport(Viewport {
            width,
            height,
            device_scale_factor: Some(1.0),
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        })
        .window_size(width, height)
        .arg("--no-sandbox")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-background-networking")
        .arg("--disable-sync")
        .arg("--disable-translate")
        .arg("--disable-crash-reporter")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--password-store=basic")
        .arg("--mute-audio")
        .arg("--disable-blink-features=AutomationControlled")
        .arg(format!("--user-agent={}", ua));

    if !headless {
        builder = builder.with_head();
    }

    builder
        .build()
        .map_err(|e| ScrapeError::Launch(format!("invalid browser config: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agents_are_chromium_only() {
        for ua in DESKTOP_USER_AGENTS {
            assert!(ua.contains("Chrome/"), "{ua}");
            assert!(!ua.contains("Firefox"), "{ua}");
        }
        assert!(DESKTOP_USER_AGENTS.contains(&random_user_agent()));
    }
}
