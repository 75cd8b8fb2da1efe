//! Interactive agent abstraction for the login phase.
//!
//! Defines the `BrowserAgent` trait that abstracts over the browser engine
//! (currently Chromium via chromiumoxide). The authenticator and the session
//! bridge only ever talk to this trait.

pub mod chromium;

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

/// A cookie as read from the interactive agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserCookie {
    pub name: String,
    pub value: String,
    /// `None` when the browser reported no domain.
    pub domain: Option<String>,
    pub path: Option<String>,
}

/// A stateful, scriptable browser tab.
#[async_trait]
pub trait BrowserAgent: Send + Sync {
    /// Navigate to a URL with a timeout.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<()>;
    /// Get the current location.
    async fn current_url(&self) -> Result<String>;
    /// Whether an element matching `selector` is present right now.
    async fn has_element(&self, selector: &str) -> Result<bool>;
    /// Type `text` into the element matching `selector`.
    async fn fill(&mut self, selector: &str, text: &str) -> Result<()>;
    /// Click the element matching `selector`.
    async fn click(&mut self, selector: &str) -> Result<()>;
    /// Reload the current page.
    async fn refresh(&mut self) -> Result<()>;
    /// All cookies visible to the current page.
    async fn cookies(&self) -> Result<Vec<BrowserCookie>>;
    /// Write a screenshot of the current page to `path`.
    async fn screenshot(&self, path: &Path) -> Result<()>;
    /// Close the tab and the browser process behind it.
    async fn shutdown(self: Box<Self>) -> Result<()>;
}
