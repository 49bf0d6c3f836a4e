//! One authenticated browser session against the chat web client.
//!
//! [`Session`] owns the driver and the navigation cursor (current server and
//! channel). Every operation takes `&mut self`, so a session runs one
//! operation at a time. The operations are split by concern across
//! `login`, `navigation`, `collect` and `report`.

mod collect;
mod login;
mod navigation;
mod report;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::core::config::ScoutConfig;
use crate::core::error::Result;
use crate::scraping::driver::{DomDriver, NodeRef, Scope};
use crate::scraping::selector::{self, Matcher};
use crate::scraping::wait::poll_until;
use crate::scraping::ChromeDriver;

pub use report::REPORT_SAMPLE;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Unopened,
    Opening,
    AwaitingCredentials,
    AwaitingSecondFactor,
    Authenticated,
    Failed,
    Closed,
}

fn log_state(state: SessionState) {
    info!("session_state={:?}", state);
}

/// Told when the client asks for a second factor. The code is entered by a
/// human in the browser window; the session only waits for it.
pub trait SecondFactorPrompt: Send + Sync {
    fn second_factor_required(&self, timeout: Duration);
}

/// Default prompt: a warning in the log.
#[derive(Debug, Default)]
pub struct LogPrompt;

impl SecondFactorPrompt for LogPrompt {
    fn second_factor_required(&self, timeout: Duration) {
        warn!(
            "🔐 second factor required: enter the code in the browser window (waiting up to {}s)",
            timeout.as_secs()
        );
    }
}

/// Lets another task end the second-factor wait early, e.g. once the operator
/// confirms the code was accepted.
#[derive(Clone, Debug)]
pub struct ResumeHandle(Arc<AtomicBool>);

impl ResumeHandle {
    pub fn resume(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

pub struct Session {
    driver: Box<dyn DomDriver>,
    config: ScoutConfig,
    state: SessionState,
    current_server: Option<String>,
    current_channel: Option<String>,
    prompt: Box<dyn SecondFactorPrompt>,
    resume: Arc<AtomicBool>,
}

impl Session {
    /// Launch a browser and open a session on it.
    pub async fn open(config: ScoutConfig, headless: bool) -> Result<Self> {
        log_state(SessionState::Unopened);
        log_state(SessionState::Opening);
        match ChromeDriver::launch(&config, headless).await {
            Ok(driver) => Ok(Self::with_driver(Box::new(driver), config)),
            Err(e) => {
                log_state(SessionState::Failed);
                Err(e)
            }
        }
    }

    /// Open a session over an already running driver.
    pub fn with_driver(driver: Box<dyn DomDriver>, config: ScoutConfig) -> Self {
        let session = Self {
            driver,
            config,
            state: SessionState::AwaitingCredentials,
            current_server: None,
            current_channel: None,
            prompt: Box::new(LogPrompt),
            resume: Arc::new(AtomicBool::new(false)),
        };
        log_state(session.state);
        session
    }

    pub fn with_prompt(mut self, prompt: Box<dyn SecondFactorPrompt>) -> Self {
        self.prompt = prompt;
        self
    }

    /// Treat the driver as already signed in (saved page, reused profile).
    pub fn assume_authenticated(&mut self) {
        if self.state != SessionState::Closed {
            self.set_state(SessionState::Authenticated);
        }
    }

    pub fn resume_handle(&self) -> ResumeHandle {
        ResumeHandle(self.resume.clone())
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
    }

    pub fn current_server(&self) -> Option<&str> {
        self.current_server.as_deref()
    }

    pub fn current_channel(&self) -> Option<&str> {
        self.current_channel.as_deref()
    }

    pub fn config(&self) -> &ScoutConfig {
        &self.config
    }

    /// Release the browser. Safe to call any number of times; the driver is
    /// closed at most once.
    pub async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        if let Err(e) = self.driver.close().await {
            warn!("browser close failed (ignored): {}", e);
        }
        self.current_server = None;
        self.current_channel = None;
        self.set_state(SessionState::Closed);
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            self.state = state;
            log_state(state);
        }
    }

    fn driver(&self) -> &dyn DomDriver {
        self.driver.as_ref()
    }

    /// Wait for the first element any of `selectors` matches.
    async fn wait_for(&self, what: &str, selectors: &[String], timeout: Duration) -> Result<NodeRef> {
        let matchers = &Matcher::css_list(selectors);
        let driver = self.driver();
        poll_until(what, timeout, self.config.timeouts.poll_interval(), || {
            selector::resolve(driver, Scope::Document, matchers)
        })
        .await
    }

    /// Like [`Session::wait_for`], but the element must also accept clicks.
    async fn wait_for_clickable(
        &self,
        what: &str,
        selectors: &[String],
        timeout: Duration,
    ) -> Result<NodeRef> {
        let matchers = &Matcher::css_list(selectors);
        let driver = self.driver();
        poll_until(what, timeout, self.config.timeouts.poll_interval(), || async move {
            let node = selector::resolve(driver, Scope::Document, matchers).await?;
            driver.is_clickable(node).await.ok()?.then_some(node)
        })
        .await
    }

    /// Each public operation starts from fresh element handles so the
    /// driver's handle table does not grow over a long session.
    async fn release_nodes(&self) {
        self.driver.release_nodes().await;
    }

    async fn settle(&self) {
        tokio::time::sleep(self.config.timeouts.settle()).await;
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("current_server", &self.current_server)
            .field("current_channel", &self.current_channel)
            .finish_non_exhaustive()
    }
}
