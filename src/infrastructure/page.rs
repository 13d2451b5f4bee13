//! Renderable-page capability consumed by the listing navigator.
//!
//! The navigator never assumes a concrete rendering engine; it drives the
//! page exclusively through these primitives. The production implementation
//! lives in [`crate::infrastructure::webdriver`], tests substitute a scripted
//! page.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// A page-level primitive failed or timed out. Fatal to phase 1: the run is
/// aborted after a best-effort session close.
#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("page action '{action}' failed: {reason}")]
    ActionFailed { action: String, reason: String },

    #[error("timed out after {waited_ms}ms waiting for {what}")]
    Timeout { what: String, waited_ms: u64 },

    #[error("script evaluation failed: {reason}")]
    ScriptFailed { reason: String },
}

impl NavigationError {
    pub fn action(action: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::ActionFailed {
            action: action.into(),
            reason: reason.to_string(),
        }
    }
}

/// A single element read failed mid-scrape. Never fatal: poll loops retry
/// and card scraping substitutes empty fields.
#[derive(Debug, Error)]
#[error("transient read failure: {0}")]
pub struct TransientReadError(pub String);

/// How to find elements on the page. Variants map onto the location
/// strategies every rendering engine exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn xpath(expression: impl Into<String>) -> Self {
        Self::XPath(expression.into())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css={s}"),
            Locator::XPath(s) => write!(f, "xpath={s}"),
        }
    }
}

/// One element handle inside a renderable page.
#[async_trait]
pub trait PageElement: Send + Sync {
    /// Visible text of the element and its descendants.
    async fn text(&self) -> Result<String, TransientReadError>;

    /// Attribute value, `None` when the attribute is absent.
    async fn attribute(&self, name: &str) -> Result<Option<String>, TransientReadError>;

    /// Inner HTML of the element.
    async fn inner_html(&self) -> Result<String, TransientReadError>;

    /// Locate descendants (or, for XPath axes, siblings) of this element.
    async fn locate(&self, locator: &Locator) -> Result<Vec<Box<dyn PageElement>>, TransientReadError>;

    async fn click(&self) -> Result<(), NavigationError>;

    async fn wait_visible(&self, timeout: Duration) -> Result<(), NavigationError>;
}

/// An exclusive browser-session resource rendering one page at a time.
#[async_trait]
pub trait RenderablePage: Send + Sync {
    async fn goto(&self, url: &str) -> Result<(), NavigationError>;

    /// Block until the document has finished loading.
    async fn wait_for_load(&self) -> Result<(), NavigationError>;

    async fn locate(&self, locator: &Locator) -> Result<Vec<Box<dyn PageElement>>, NavigationError>;

    async fn evaluate_script(&self, script: &str) -> Result<serde_json::Value, NavigationError>;

    /// Fixed settle delay.
    async fn wait(&self, ms: u64);

    /// Release the underlying session. Must be called on every exit path.
    async fn close(&self) -> Result<(), NavigationError>;
}
