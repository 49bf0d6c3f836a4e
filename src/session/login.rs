use std::sync::atomic::Ordering;
use tracing::{debug, info, warn};

use super::{Session, SessionState};
use crate::core::error::Result;
use crate::scraping::driver::Scope;
use crate::scraping::selector::{self, Matcher};
use crate::scraping::wait::poll_until;

/// What the page turned into right after the credentials were submitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AfterSubmit {
    SecondFactor,
    Landed,
}

/// Authenticated URLs live under `/channels`.
pub(crate) fn is_app_url(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => parsed.path().starts_with("/channels"),
        Err(_) => url.contains("/channels"),
    }
}

/// The second-factor page is gone once the client routes into the app or
/// anywhere away from the login screen.
fn left_login(url: &str) -> bool {
    url.contains("channels") || !url.contains("login")
}

impl Session {
    /// Sign in with `email` and `password`.
    ///
    /// Returns `true` once the authenticated app shell is visible. Any bounded
    /// wait running out leaves the session `Failed` and returns `false`; the
    /// caller decides whether to try again.
    pub async fn login(&mut self, email: &str, password: &str) -> bool {
        if self.state == SessionState::Closed {
            warn!("login refused: session is closed");
            return false;
        }
        match self.run_login(email, password).await {
            Ok(()) => {
                self.set_state(SessionState::Authenticated);
                info!("✅ logged in");
                true
            }
            Err(e) => {
                warn!("login failed: {}", e);
                self.set_state(SessionState::Failed);
                false
            }
        }
    }

    async fn run_login(&mut self, email: &str, password: &str) -> Result<()> {
        self.set_state(SessionState::AwaitingCredentials);
        self.resume.store(false, Ordering::SeqCst);

        let timeouts = self.config.timeouts.clone();
        let selectors = self.config.selectors.clone();

        let url = self.config.login_url();
        info!("🔑 opening login page {}", url);
        self.driver.navigate(&url).await?;

        let email_field = self
            .wait_for("email field", &selectors.email_input, timeouts.field_wait())
            .await?;
        self.driver.fill(email_field, email).await?;

        let password_field = self
            .wait_for("password field", &selectors.password_input, timeouts.field_wait())
            .await?;
        self.driver.fill(password_field, password).await?;

        let submit = self
            .wait_for_clickable("submit button", &selectors.submit_button, timeouts.field_wait())
            .await?;
        self.driver.click(submit).await?;
        debug!("credentials submitted");

        match self.check_after_submit().await {
            Some(AfterSubmit::SecondFactor) => {
                self.set_state(SessionState::AwaitingSecondFactor);
                self.prompt.second_factor_required(timeouts.second_factor());
                self.wait_second_factor().await?;
                info!("second factor accepted");
            }
            Some(AfterSubmit::Landed) => debug!("landed without a second factor"),
            None => debug!("no second factor prompt seen; waiting for the app shell"),
        }

        self.wait_landing().await
    }

    /// Short look at the page after submit: second-factor field, the app
    /// shell, or neither yet.
    async fn check_after_submit(&self) -> Option<AfterSubmit> {
        let timeouts = &self.config.timeouts;
        let second_factor = &Matcher::css_list(&self.config.selectors.second_factor_input);
        let this = self;
        poll_until(
            "second factor or landing",
            timeouts.second_factor_check(),
            timeouts.poll_interval(),
            || async move {
                if selector::resolve(this.driver(), Scope::Document, second_factor)
                    .await
                    .is_some()
                {
                    return Some(AfterSubmit::SecondFactor);
                }
                this.has_landed().await.then_some(AfterSubmit::Landed)
            },
        )
        .await
        .ok()
    }

    async fn wait_second_factor(&self) -> Result<()> {
        let timeouts = &self.config.timeouts;
        let this = self;
        poll_until(
            "second factor",
            timeouts.second_factor(),
            timeouts.poll_interval(),
            || async move {
                if this.resume.load(Ordering::SeqCst) {
                    debug!("second factor wait resumed externally");
                    return Some(());
                }
                let url = this.driver().current_url().await.ok()?;
                left_login(&url).then_some(())
            },
        )
        .await
    }

    async fn wait_landing(&self) -> Result<()> {
        let timeouts = &self.config.timeouts;
        let this = self;
        poll_until("app shell", timeouts.landing(), timeouts.poll_interval(), || async move {
            this.has_landed().await.then_some(())
        })
        .await
    }

    /// URL under `/channels`, or the server list rendered.
    async fn has_landed(&self) -> bool {
        if let Ok(url) = self.driver().current_url().await {
            if is_app_url(&url) {
                return true;
            }
        }
        let guild_list = Matcher::css_list(&self.config.selectors.guild_list);
        selector::resolve(self.driver(), Scope::Document, &guild_list)
            .await
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_urls_are_under_channels() {
        assert!(is_app_url("https://discord.com/channels/@me"));
        assert!(is_app_url("https://discord.com/channels/123/456"));
        assert!(!is_app_url("https://discord.com/login"));
        assert!(!is_app_url("https://discord.com/login?redirect_to=%2Fchannels%2F1"));
        assert!(is_app_url("not a url /channels/1"));
    }

    #[test]
    fn second_factor_page_is_left_when_login_disappears() {
        assert!(!left_login("https://discord.com/login"));
        assert!(left_login("https://discord.com/channels/@me"));
        assert!(left_login("https://discord.com/app"));
    }
}
