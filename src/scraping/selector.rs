//! Ranked element lookup.
//!
//! A lookup is an ordered list of [`Matcher`]s. Each is tried in turn and the
//! first one that accepts anything wins; a miss just moves on to the next
//! strategy. Absence is a normal outcome here, never an error: driver failures
//! while matching (stale handles, detached nodes) count as misses too.

use tracing::debug;

use super::driver::{DomDriver, NodeRef, Scope};
use crate::core::types::contains_ignore_case;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Matcher {
    /// Every element matching the CSS selector. Attribute-substring matching
    /// is expressed in the selector itself (`[class*="username"]`).
    Css(String),
    /// Elements matching `selector` whose first non-empty attribute among
    /// `attrs` contains `needle`, ignoring case.
    Attr {
        selector: String,
        attrs: Vec<String>,
        needle: String,
    },
    /// Elements matching `selector` whose visible text contains `needle`,
    /// ignoring case.
    Text { selector: String, needle: String },
}

impl Matcher {
    pub fn css(selector: impl Into<String>) -> Self {
        Matcher::Css(selector.into())
    }

    pub fn attr(selector: impl Into<String>, attrs: &[&str], needle: impl Into<String>) -> Self {
        Matcher::Attr {
            selector: selector.into(),
            attrs: attrs.iter().map(|a| a.to_string()).collect(),
            needle: needle.into(),
        }
    }

    pub fn text(selector: impl Into<String>, needle: impl Into<String>) -> Self {
        Matcher::Text {
            selector: selector.into(),
            needle: needle.into(),
        }
    }

    /// One [`Matcher::Css`] per selector, rank preserved.
    pub fn css_list(selectors: &[String]) -> Vec<Matcher> {
        selectors.iter().map(Matcher::css).collect()
    }

    pub fn selector(&self) -> &str {
        match self {
            Matcher::Css(s) => s,
            Matcher::Attr { selector, .. } | Matcher::Text { selector, .. } => selector,
        }
    }

    async fn accepts(&self, driver: &dyn DomDriver, node: NodeRef) -> bool {
        match self {
            Matcher::Css(_) => true,
            Matcher::Attr { attrs, needle, .. } => {
                label_of(driver, node, attrs)
                    .await
                    .is_some_and(|label| contains_ignore_case(&label, needle))
            }
            Matcher::Text { needle, .. } => match driver.text(node).await {
                Ok(text) => !text.is_empty() && contains_ignore_case(&text, needle),
                Err(e) => {
                    debug!("selector: text read failed on {:?}: {}", node, e);
                    false
                }
            },
        }
    }
}

/// First non-empty value among `attrs`, trimmed.
pub async fn label_of<S: AsRef<str>>(driver: &dyn DomDriver, node: NodeRef, attrs: &[S]) -> Option<String> {
    for attr in attrs {
        let attr = attr.as_ref();
        match driver.attribute(node, attr).await {
            Ok(Some(v)) if !v.trim().is_empty() => return Some(v.trim().to_string()),
            Ok(_) => {}
            Err(e) => {
                debug!("selector: attribute {} unreadable on {:?}: {}", attr, node, e);
                return None;
            }
        }
    }
    None
}

async fn candidates(driver: &dyn DomDriver, scope: Scope, matcher: &Matcher) -> Vec<NodeRef> {
    match driver.query_all(scope, matcher.selector()).await {
        Ok(nodes) => nodes,
        Err(e) => {
            debug!("selector: query {:?} failed: {}", matcher.selector(), e);
            Vec::new()
        }
    }
}

/// First element accepted by the highest-ranked matcher that accepts any.
pub async fn resolve(driver: &dyn DomDriver, scope: Scope, matchers: &[Matcher]) -> Option<NodeRef> {
    for matcher in matchers {
        for node in candidates(driver, scope, matcher).await {
            if matcher.accepts(driver, node).await {
                return Some(node);
            }
        }
    }
    None
}

/// All elements accepted by the highest-ranked matcher that accepts any.
///
/// Lower-ranked matchers are fallbacks, not additions: mixing them would list
/// the same rendered item twice whenever two selectors cover it.
pub async fn resolve_all(driver: &dyn DomDriver, scope: Scope, matchers: &[Matcher]) -> Vec<NodeRef> {
    for matcher in matchers {
        let mut accepted = Vec::new();
        for node in candidates(driver, scope, matcher).await {
            if matcher.accepts(driver, node).await {
                accepted.push(node);
            }
        }
        if !accepted.is_empty() {
            return accepted;
        }
    }
    Vec::new()
}

pub async fn count(driver: &dyn DomDriver, scope: Scope, matchers: &[Matcher]) -> usize {
    resolve_all(driver, scope, matchers).await.len()
}
