//! Chromium-based interactive agent using chromiumoxide.

use super::{BrowserAgent, BrowserCookie};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. HARVEST_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("HARVEST_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 3. Common macOS location
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// A single headless Chromium instance with one tab.
pub struct ChromiumAgent {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromiumAgent {
    /// Launch headless Chromium and open a blank tab.
    pub async fn launch() -> Result<Self> {
        let chrome_path = find_chromium()
            .context("Chromium not found. Install Chrome or set HARVEST_CHROMIUM_PATH.")?;

        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-blink-features=AutomationControlled")
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        // CDP events must be drained for the browser to make progress
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("chromium handler event error: {e}");
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .context("failed to create new page")?;

        Ok(Self {
            browser,
            page,
            handler,
        })
    }
}

#[async_trait]
impl BrowserAgent for ChromiumAgent {
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<()> {
        let page = &self.page;
        let load = async move {
            page.goto(url).await?;
            if let Err(e) = page.wait_for_navigation().await {
                debug!("wait for navigation after {url}: {e}");
            }
            Ok::<_, chromiumoxide::error::CdpError>(())
        };

        match tokio::time::timeout(Duration::from_millis(timeout_ms), load).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => bail!("navigation failed: {e}"),
            Err(_) => bail!("navigation timed out after {timeout_ms}ms"),
        }
    }

    async fn current_url(&self) -> Result<String> {
        let url = self
            .page
            .url()
            .await
            .context("failed to get URL")?
            .map(|u| u.to_string())
            .unwrap_or_default();
        Ok(url)
    }

    async fn has_element(&self, selector: &str) -> Result<bool> {
        Ok(self.page.find_element(selector).await.is_ok())
    }

    async fn fill(&mut self, selector: &str, text: &str) -> Result<()> {
        self.page
            .find_element(selector)
            .await
            .with_context(|| format!("no element matches {selector}"))?
            .click()
            .await
            .with_context(|| format!("failed to focus {selector}"))?
            .type_str(text)
            .await
            .with_context(|| format!("failed to type into {selector}"))?;
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<()> {
        self.page
            .find_element(selector)
            .await
            .with_context(|| format!("no element matches {selector}"))?
            .click()
            .await
            .with_context(|| format!("failed to click {selector}"))?;
        Ok(())
    }

    async fn refresh(&mut self) -> Result<()> {
        self.page.reload().await.context("failed to reload page")?;
        Ok(())
    }

    async fn cookies(&self) -> Result<Vec<BrowserCookie>> {
        let cookies = self
            .page
            .get_cookies()
            .await
            .context("failed to read cookies")?;

        Ok(cookies
            .into_iter()
            .map(|c| BrowserCookie {
                name: c.name,
                value: c.value,
                domain: Some(c.domain).filter(|d| !d.is_empty()),
                path: Some(c.path).filter(|p| !p.is_empty()),
            })
            .collect())
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        self.page
            .save_screenshot(ScreenshotParams::builder().full_page(true).build(), path)
            .await
            .with_context(|| format!("failed to save screenshot to {}", path.display()))?;
        Ok(())
    }

    async fn shutdown(self: Box<Self>) -> Result<()> {
        let Self {
            mut browser,
            page,
            handler,
        } = *self;

        if let Err(e) = page.close().await {
            debug!("page close failed: {e}");
        }
        let closed = browser.close().await.context("failed to close Chromium");
        if let Err(e) = browser.wait().await {
            warn!("Chromium process did not exit cleanly: {e}");
        }
        handler.abort();
        closed.map(|_| ())
    }
}
