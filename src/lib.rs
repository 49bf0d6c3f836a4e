pub mod core;
pub mod features;
pub mod scraping;
pub mod session;

// --- Primary exports ---
pub use core::config::{load_scout_config, Credentials, ScoutConfig};
pub use core::error::{Result, ScrapeError};
pub use core::types;
pub use core::types::*;
pub use features::{aggregate, export};
pub use session::{LogPrompt, ResumeHandle, SecondFactorPrompt, Session, SessionState};
