//! JSON exports of collected data.
//!
//! Files are named `<kind>_<qualifier>_<YYYYMMDD_HHMMSS>.json` (qualifier left
//! out when absent) and written pretty-printed through a temp file + rename,
//! so a reader never sees half a file.

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::info;

use crate::core::error::{Result, ScrapeError};

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_-]+").expect("static regex"))
}

/// Reduce a name to `[A-Za-z0-9_-]`; runs of anything else become one `_`.
pub fn sanitize(part: &str) -> String {
    unsafe_chars()
        .replace_all(part.trim(), "_")
        .trim_matches('_')
        .to_string()
}

pub fn file_name(kind: &str, qualifier: Option<&str>, stamp: &str) -> String {
    let kind = sanitize(kind);
    match qualifier.map(sanitize).filter(|q| !q.is_empty()) {
        Some(q) => format!("{}_{}_{}.json", kind, q, stamp),
        None => format!("{}_{}.json", kind, stamp),
    }
}

/// Write `value` into `dir` and return the file's path.
pub fn export<T: Serialize>(dir: &Path, kind: &str, qualifier: Option<&str>, value: &T) -> Result<PathBuf> {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    let path = dir.join(file_name(kind, qualifier, &stamp));
    let json = serde_json::to_string_pretty(value)?;

    std::fs::create_dir_all(dir).map_err(|e| io_error(e, dir))?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json.as_bytes()).map_err(|e| io_error(e, &tmp))?;
    if let Err(e) = std::fs::rename(&tmp, &path) {
        std::fs::remove_file(&tmp).ok();
        return Err(io_error(e, &path));
    }

    info!("💾 exported {} to {}", kind, path.display());
    Ok(path)
}

/// Read back a file written by [`export`].
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_error(e, path))?;
    Ok(serde_json::from_str(&contents)?)
}

fn io_error(e: std::io::Error, path: &Path) -> ScrapeError {
    if e.kind() == std::io::ErrorKind::PermissionDenied {
        ScrapeError::PermissionDenied(path.display().to_string())
    } else {
        ScrapeError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_sanitized() {
        assert_eq!(sanitize("general chat!"), "general_chat");
        assert_eq!(sanitize("off-topic"), "off-topic");
        assert_eq!(sanitize("  🦀  "), "");
        assert_eq!(
            file_name("messages", Some("#help / rust"), "20240101_120000"),
            "messages_help_rust_20240101_120000.json"
        );
        assert_eq!(
            file_name("channel_stats", None, "20240101_120000"),
            "channel_stats_20240101_120000.json"
        );
        assert_eq!(
            file_name("user", Some("???"), "20240101_120000"),
            "user_20240101_120000.json"
        );
    }

    #[test]
    fn export_writes_pretty_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = export(dir.path(), "server_info", Some("Rustaceans"), &vec!["a", "b"]).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("server_info_Rustaceans_"));
        assert!(name.ends_with(".json"));
        // kind _ qualifier _ YYYYMMDD _ HHMMSS
        let stamp = name
            .trim_start_matches("server_info_Rustaceans_")
            .trim_end_matches(".json");
        assert_eq!(stamp.len(), 15);
        assert_eq!(&stamp[8..9], "_");

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  \"a\""));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load::<Vec<String>>(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ScrapeError::Io(_)));
    }
}
