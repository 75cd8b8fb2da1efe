//! Handoff from the interactive login to the HTTP-only scrape phase.
//!
//! [`hand_off`] consumes the authenticated agent, reads its cookies, shuts
//! the browser down and returns an [`HttpClient`] whose cookie store holds
//! the session.

use crate::acquisition::http_client::{HttpClient, RetryPolicy};
use crate::auth::AuthenticatedAgent;
use crate::error::HarvestError;
use crate::renderer::{BrowserAgent, BrowserCookie};
use anyhow::{anyhow, Result};
use reqwest::cookie::Jar;
use std::sync::Arc;
use tracing::{info, warn};

/// One session cookie with its domain resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    /// Never empty. A leading dot means the cookie covers subdomains too.
    pub domain: String,
    pub path: String,
}

impl SessionCookie {
    /// `Set-Cookie` style line for installing into a cookie jar.
    fn header_line(&self) -> String {
        if self.domain.starts_with('.') {
            format!(
                "{}={}; Domain={}; Path={}",
                self.name, self.value, self.domain, self.path
            )
        } else {
            format!("{}={}; Path={}", self.name, self.value, self.path)
        }
    }

    /// Origin the cookie is installed against.
    fn origin(&self) -> Result<url::Url> {
        let host = self.domain.trim_start_matches('.');
        url::Url::parse(&format!("https://{host}/"))
            .map_err(|e| anyhow!("cookie {} has unusable domain {}: {e}", self.name, self.domain))
    }
}

/// The session's cookies, keyed by name and domain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieSet {
    cookies: Vec<SessionCookie>,
}

impl CookieSet {
    /// Normalize browser cookies, substituting `fallback_domain` where the
    /// browser reported none.
    pub fn from_browser(cookies: Vec<BrowserCookie>, fallback_domain: &str) -> Self {
        let mut set = Self::default();
        for c in cookies {
            let domain = c
                .domain
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| fallback_domain.to_string());
            let path = c
                .path
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| "/".to_string());
            set.insert(SessionCookie {
                name: c.name,
                value: c.value,
                domain,
                path,
            });
        }
        set
    }

    /// Add a cookie, replacing one with the same name and domain.
    pub fn insert(&mut self, cookie: SessionCookie) {
        match self
            .cookies
            .iter_mut()
            .find(|c| c.name == cookie.name && c.domain == cookie.domain)
        {
            Some(existing) => *existing = cookie,
            None => self.cookies.push(cookie),
        }
    }

    pub fn get(&self, name: &str) -> Option<&SessionCookie> {
        self.cookies.iter().find(|c| c.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SessionCookie> {
        self.cookies.iter()
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Build a reqwest cookie jar holding every cookie in the set.
    pub fn to_jar(&self) -> Result<Jar> {
        let jar = Jar::default();
        for cookie in &self.cookies {
            jar.add_cookie_str(&cookie.header_line(), &cookie.origin()?);
        }
        Ok(jar)
    }
}

/// Move the session out of the browser and into an HTTP client.
///
/// The browser is shut down whether or not the cookies could be read.
pub async fn hand_off(
    agent: AuthenticatedAgent,
    fallback_domain: &str,
    retry: RetryPolicy,
) -> Result<HttpClient, HarvestError> {
    let mut agent = agent.into_inner();
    let extracted = extract_cookies(agent.as_mut()).await;
    release(agent).await;

    let cookies = CookieSet::from_browser(extracted?, fallback_domain);
    if cookies.is_empty() {
        warn!("browser reported no cookies, continuing without a session");
    } else {
        info!("Transferred {} session cookies", cookies.len());
    }

    let jar = cookies
        .to_jar()
        .map_err(|e| HarvestError::SessionTransfer(format!("{e:#}")))?;
    HttpClient::with_cookie_jar(Arc::new(jar), retry)
        .map_err(|e| HarvestError::SessionTransfer(format!("{e:#}")))
}

async fn extract_cookies(agent: &mut dyn BrowserAgent) -> Result<Vec<BrowserCookie>, HarvestError> {
    match read_cookies(agent).await {
        Ok(cookies) => Ok(cookies),
        Err(e) => {
            warn!("cookie transfer failed ({e:#}), refreshing session");
            let retried = async {
                agent.refresh().await?;
                read_cookies(agent).await
            };
            retried.await.map_err(|e| {
                HarvestError::SessionTransfer(format!("critical connection failure: {e:#}"))
            })
        }
    }
}

/// Responsiveness check followed by the cookie read.
async fn read_cookies(agent: &dyn BrowserAgent) -> Result<Vec<BrowserCookie>> {
    agent.current_url().await?;
    agent.cookies().await
}

async fn release(agent: Box<dyn BrowserAgent>) {
    match agent.shutdown().await {
        Ok(()) => info!("Browser session closed"),
        Err(e) => warn!("browser shutdown reported: {e:#}"),
    }
}
