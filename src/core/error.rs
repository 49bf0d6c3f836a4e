use std::time::Duration;
use thiserror::Error;

use crate::scraping::driver::NodeRef;

pub type Result<T, E = ScrapeError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("timed out after {}s waiting for {what}", after.as_secs_f32())]
    Timeout { what: String, after: Duration },

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("browser driver error: {0}")]
    Driver(String),

    #[error("stale element handle {0:?}")]
    StaleNode(NodeRef),

    #[error("browser session is closed")]
    SessionClosed,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScrapeError {
    pub fn driver(e: impl std::fmt::Display) -> Self {
        ScrapeError::Driver(e.to_string())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ScrapeError::Timeout { .. })
    }
}
