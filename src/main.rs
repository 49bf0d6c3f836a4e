use anyhow::Context;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

use chat_scout::scraping::StaticDom;
use chat_scout::{
    export, load_scout_config, Credentials, ScrapeError, ScrapedMessage, SecondFactorPrompt,
    Session,
};

type Input = mpsc::Receiver<String>;

const PREVIEW_MESSAGES: usize = 10;
const PREVIEW_CHARS: usize = 100;
const DEFAULT_LIMIT: usize = 50;

#[derive(Debug, Default)]
struct Args {
    headless: bool,
    config: Option<PathBuf>,
    offline: Option<PathBuf>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut parsed = Args::default();
    let mut args = std::env::args().skip(1);
    while let Some(a) = args.next() {
        match a.as_str() {
            "--headless" => parsed.headless = true,
            "--config" => {
                let v = args.next().context("--config needs a path")?;
                parsed.config = Some(PathBuf::from(v));
            }
            "--offline" => {
                let v = args.next().context("--offline needs an HTML file")?;
                parsed.offline = Some(PathBuf::from(v));
            }
            other => {
                if let Some(v) = other.strip_prefix("--config=") {
                    parsed.config = Some(PathBuf::from(v));
                } else if let Some(v) = other.strip_prefix("--offline=") {
                    parsed.offline = Some(PathBuf::from(v));
                } else {
                    anyhow::bail!(
                        "unknown argument: {} (usage: chat-scout [--headless] [--config <path>] [--offline <file.html>])",
                        other
                    );
                }
            }
        }
    }
    Ok(parsed)
}

/// Asks the operator on the terminal; the session notices on its own once
/// the code is accepted.
struct TerminalPrompt;

impl SecondFactorPrompt for TerminalPrompt {
    fn second_factor_required(&self, timeout: Duration) {
        println!();
        println!("🔐 Two-factor authentication required.");
        println!(
            "   Enter the code in the browser window. Waiting up to {} minutes...",
            timeout.as_secs() / 60
        );
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,chromiumoxide=warn"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let args = parse_args()?;
    let config = load_scout_config(args.config.as_deref());
    let output_dir = config.resolve_output_dir();
    let mut input = stdin_lines();

    let mut session = match &args.offline {
        Some(path) => {
            info!("offline mode: {}", path.display());
            let dom = StaticDom::from_file(path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            let mut session = Session::with_driver(Box::new(dom), config);
            session.assume_authenticated();
            session
        }
        None => {
            let headless = args.headless || config.resolve_headless();
            Session::open(config, headless)
                .await
                .context("could not start the browser")?
                .with_prompt(Box::new(TerminalPrompt))
        }
    };

    let outcome = tokio::select! {
        res = run(&mut session, &mut input, &output_dir) => res,
        _ = shutdown_signal() => {
            warn!("interrupted; closing the browser");
            Ok(())
        }
    };

    session.close().await;
    outcome
}

async fn run(session: &mut Session, input: &mut Input, output_dir: &Path) -> anyhow::Result<()> {
    if !session.is_authenticated() {
        let creds = match Credentials::from_env() {
            Some(c) => c,
            None => read_credentials(input).await?,
        };
        if !session.login(&creds.email, &creds.password).await {
            anyhow::bail!("login failed (session {:?})", session.state());
        }
    }

    loop {
        print_menu(session);
        let Some(choice) = ask(input, "Select an option: ").await? else {
            break;
        };

        match choice.as_str() {
            "1" => {
                if let Some(name) = ask(input, "Server name (empty = current): ").await? {
                    if !name.is_empty() && !session.goto_server(&name).await {
                        println!("❌ Server '{}' not found", name);
                        continue;
                    }
                }
                let summary = session.server_info().await;
                print_json(&summary);
                offer_export(input, output_dir, "server_info", Some(summary.server_name.as_str()), &summary).await?;
            }
            "2" => {
                let Some(name) = ask_required(input, "Server name: ").await? else {
                    continue;
                };
                report_navigation(session.goto_server(&name).await, "server", &name);
            }
            "3" => {
                let Some(name) = ask_required(input, "Channel name: ").await? else {
                    continue;
                };
                report_navigation(session.goto_channel(&name).await, "channel", &name);
            }
            "4" => {
                let stats = session.channel_stats().await;
                print_json(&stats);
                offer_export(input, output_dir, "channel_stats", Some(stats.channel_name.as_str()), &stats).await?;
            }
            "5" => {
                let limit = ask_limit(input).await?;
                let messages = session.collect(limit, None).await;
                print_messages(&messages);
                let channel = session.current_channel().map(str::to_string);
                offer_export(input, output_dir, "messages", channel.as_deref(), &messages).await?;
            }
            "6" => {
                let Some(user) = ask_required(input, "Username: ").await? else {
                    continue;
                };
                let limit = ask_limit(input).await?;
                let messages = session.collect(limit, Some(user.as_str())).await;
                print_messages(&messages);
                offer_export(input, output_dir, "user_messages", Some(user.as_str()), &messages).await?;
            }
            "7" => {
                let Some(user) = ask_required(input, "Username: ").await? else {
                    continue;
                };
                let summary = session.user_info(&user).await;
                println!(
                    "👤 {}: {} message(s), {} attachment(s), {} reaction(s)",
                    summary.username,
                    summary.message_count,
                    summary.total_attachments,
                    summary.total_reactions
                );
                print_messages(&summary.messages);
                offer_export(input, output_dir, "user_info", Some(user.as_str()), &summary).await?;
            }
            "8" | "q" | "exit" => break,
            "" => {}
            other => println!("Unknown option: {}", other),
        }
    }
    Ok(())
}

fn print_menu(session: &Session) {
    println!();
    println!("=== chat-scout ===");
    println!(
        "server: {}   channel: {}",
        session.current_server().unwrap_or("-"),
        session.current_channel().unwrap_or("-")
    );
    println!("1. Analyze server");
    println!("2. Navigate to server");
    println!("3. Navigate to channel");
    println!("4. Channel statistics");
    println!("5. Scrape channel messages");
    println!("6. Scrape user messages");
    println!("7. User info");
    println!("8. Exit");
}

/// Terminal lines from a plain OS thread. A read blocked on the terminal
/// never holds up runtime shutdown; the thread dies with the process.
fn stdin_lines() -> Input {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        use std::io::BufRead;
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Print `label`, read one trimmed line. `None` on end of input.
async fn ask(input: &mut Input, label: &str) -> anyhow::Result<Option<String>> {
    print!("{}", label);
    std::io::stdout().flush().ok();
    Ok(input.recv().await.map(|l| l.trim().to_string()))
}

async fn ask_required(input: &mut Input, label: &str) -> anyhow::Result<Option<String>> {
    Ok(ask(input, label).await?.filter(|v| !v.is_empty()))
}

async fn ask_limit(input: &mut Input) -> anyhow::Result<usize> {
    let label = format!("How many messages? [{}]: ", DEFAULT_LIMIT);
    let answer = ask(input, &label).await?.unwrap_or_default();
    Ok(answer.parse::<usize>().unwrap_or(DEFAULT_LIMIT))
}

async fn read_credentials(input: &mut Input) -> anyhow::Result<Credentials> {
    let email = ask_required(input, "Email: ")
        .await?
        .context("no email given")?;
    println!("(input is echoed; set DISCORD_PASSWORD to avoid typing it)");
    let password = ask(input, "Password: ").await?.context("no password given")?;
    Ok(Credentials { email, password })
}

async fn offer_export<T: Serialize>(
    input: &mut Input,
    dir: &Path,
    kind: &str,
    qualifier: Option<&str>,
    value: &T,
) -> anyhow::Result<()> {
    let answer = ask(input, "Export to JSON? [y/N]: ").await?.unwrap_or_default();
    if !answer.eq_ignore_ascii_case("y") && !answer.eq_ignore_ascii_case("yes") {
        return Ok(());
    }
    match export::export(dir, kind, qualifier, value) {
        Ok(path) => println!("💾 Saved to {}", path.display()),
        Err(ScrapeError::PermissionDenied(p)) => {
            println!("❌ Permission denied writing to {}", p)
        }
        Err(e) => println!("❌ Export failed: {}", e),
    }
    Ok(())
}

fn report_navigation(ok: bool, what: &str, name: &str) {
    if ok {
        println!("✅ Opened {} '{}'", what, name);
    } else {
        println!("❌ {} '{}' not found", what, name);
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => warn!("cannot render result: {}", e),
    }
}

fn print_messages(messages: &[ScrapedMessage]) {
    println!("📨 {} message(s)", messages.len());
    for m in messages.iter().take(PREVIEW_MESSAGES) {
        let mut content: String = m.content.chars().take(PREVIEW_CHARS).collect();
        if m.content.chars().count() > PREVIEW_CHARS {
            content.push('…');
        }
        println!(
            "[{}] {}: {} (📎 {}, 💬 {})",
            m.timestamp, m.author, content, m.attachment_count, m.reaction_count
        );
    }
    if messages.len() > PREVIEW_MESSAGES {
        println!("... and {} more", messages.len() - PREVIEW_MESSAGES);
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).ok();

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = async {
                if let Some(ref mut s) = sigterm {
                    s.recv().await;
                } else {
                    futures::future::pending::<()>().await;
                }
            } => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
