pub mod browser_manager;
pub mod chrome;
pub mod driver;
pub mod selector;
pub mod static_dom;
mod stealth;
pub mod wait;

pub use chrome::ChromeDriver;
pub use driver::{DomDriver, NodeRef, Scope};
pub use selector::Matcher;
pub use static_dom::{DomEvent, StaticDom};
