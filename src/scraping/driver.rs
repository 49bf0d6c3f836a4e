//! The browser seam.
//!
//! Everything above this module talks to the page through [`DomDriver`] only,
//! so the session logic runs the same against a live Chromium tab
//! ([`super::chrome::ChromeDriver`]) and against canned HTML
//! ([`super::static_dom::StaticDom`]).

use async_trait::async_trait;

use crate::core::error::Result;

/// Opaque handle to an element the driver has handed out.
///
/// Handles go stale when the page re-renders; operations on a stale handle
/// return an error, which callers treat as a miss.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeRef(pub usize);

/// Where a query looks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    Document,
    Within(NodeRef),
}

#[async_trait]
pub trait DomDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    /// All elements matching `css` in DOM order. No match is `Ok(vec![])`.
    async fn query_all(&self, scope: Scope, css: &str) -> Result<Vec<NodeRef>>;

    async fn attribute(&self, node: NodeRef, name: &str) -> Result<Option<String>>;

    /// Rendered text of the element, trimmed.
    async fn text(&self, node: NodeRef) -> Result<String>;

    /// Enabled and laid out, i.e. a click would land.
    async fn is_clickable(&self, node: NodeRef) -> Result<bool>;

    async fn click(&self, node: NodeRef) -> Result<()>;

    /// Clear an input and type `text` into it.
    async fn fill(&self, node: NodeRef, text: &str) -> Result<()>;

    /// Scroll a scrollable element to its top (backward pagination trigger).
    async fn scroll_to_top(&self, node: NodeRef) -> Result<()>;

    /// Drop every handle handed out so far. Later use of those handles is a
    /// stale-node error; indices are never reused.
    async fn release_nodes(&self);

    /// Release the underlying browser. Must be safe to call more than once.
    async fn close(&self) -> Result<()>;
}
