/// Exports land as pretty JSON with the expected name and read back intact.
use chat_scout::aggregate::{summarize_channel, summarize_user};
use chat_scout::export::{export, load};
use chat_scout::{ChannelSummary, ScrapeError, ScrapedMessage, UserSummary};

fn init_logger() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_test_writer()
        .try_init();
}

fn msg(author: &str, attachments: u32) -> ScrapedMessage {
    ScrapedMessage {
        author: author.into(),
        content: format!("message from {}", author),
        timestamp: "2024-03-01T10:00:00.000Z".into(),
        attachment_count: attachments,
        reaction_count: 0,
    }
}

#[test]
fn aggregation_over_a_small_batch() {
    let batch = vec![msg("a", 2), msg("a", 1), msg("b", 0)];
    let summary = summarize_channel("general", &batch);
    assert_eq!(summary.unique_authors, 2);
    assert_eq!(summary.total_attachments, 3);
}

#[test]
fn exported_messages_read_back_equal() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let batch = vec![msg("ferris", 1), msg("bob", 0)];

    let path = export(dir.path(), "messages", Some("general"), &batch).unwrap();
    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("messages_general_"), "{}", name);

    let back: Vec<ScrapedMessage> = load(&path).unwrap();
    assert_eq!(back, batch);

    let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw[0]["username"], "ferris");
    assert_eq!(raw[0]["attachments"], 1);
    assert_eq!(raw[1]["reactions"], 0);
}

#[test]
fn summaries_round_trip_too() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let user = summarize_user("ferris", vec![msg("ferris", 2)]);
    let stats = summarize_channel("general", &[msg("ferris", 2), msg("bob", 1)]);

    let user_path = export(dir.path(), "user_info", Some("ferris"), &user).unwrap();
    let stats_path = export(dir.path(), "channel_stats", None, &stats).unwrap();

    assert_eq!(load::<UserSummary>(&user_path).unwrap(), user);
    assert_eq!(load::<ChannelSummary>(&stats_path).unwrap(), stats);
}

#[test]
fn export_creates_missing_directories() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("exports").join("today");
    let path = export(&nested, "messages", None, &Vec::<ScrapedMessage>::new()).unwrap();
    assert!(path.starts_with(&nested));
    assert_eq!(load::<Vec<ScrapedMessage>>(&path).unwrap(), Vec::new());
}

#[cfg(unix)]
#[test]
fn read_only_directory_reports_permission_denied() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let locked = dir.path().join("locked");
    std::fs::create_dir(&locked).unwrap();
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o555)).unwrap();

    // root ignores directory permissions; nothing to check there
    if std::fs::write(locked.join("writable"), b"x").is_ok() {
        return;
    }

    let err = export(&locked, "messages", None, &vec![msg("a", 0)]).unwrap_err();
    assert!(matches!(err, ScrapeError::PermissionDenied(_)), "{:?}", err);

    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
}
