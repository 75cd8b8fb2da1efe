//! Interactive login through a [`BrowserAgent`].
//!
//! `authenticate` takes ownership of the agent. On success the agent comes
//! back wrapped in an [`AuthenticatedAgent`], which only the session bridge
//! can unwrap. On every failure path a diagnostic screenshot is attempted
//! and the agent is shut down before the error is returned.

use crate::config::{Credential, LoginConfig};
use crate::error::HarvestError;
use crate::renderer::BrowserAgent;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

/// A browser session that has reached the listing page after login.
pub struct AuthenticatedAgent {
    agent: Box<dyn BrowserAgent>,
    landed_url: String,
}

impl AuthenticatedAgent {
    /// Location the agent was verified at.
    pub fn landed_url(&self) -> &str {
        &self.landed_url
    }

    pub(crate) fn into_inner(self) -> Box<dyn BrowserAgent> {
        self.agent
    }
}

/// Poll `check` every `interval` until it returns `true` or `timeout` elapses.
///
/// The check always runs at least once. Returns whether it succeeded.
pub async fn wait_until<F, Fut>(timeout: Duration, interval: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        sleep(interval.min(deadline - now)).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Snapshot {
    Login,
    Recovery,
}

/// Why the login sequence stopped, and which snapshot to capture.
struct LoginFailure {
    reason: String,
    snapshot: Snapshot,
}

impl LoginFailure {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            snapshot: Snapshot::Login,
        }
    }

    fn after_recovery(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            snapshot: Snapshot::Recovery,
        }
    }
}

/// Log in and navigate to the listing page.
pub async fn authenticate(
    mut agent: Box<dyn BrowserAgent>,
    config: &LoginConfig,
    credential: &Credential,
) -> Result<AuthenticatedAgent, HarvestError> {
    match login(agent.as_mut(), config, credential).await {
        Ok(landed_url) => {
            info!("Successfully reached target URL: {landed_url}");
            Ok(AuthenticatedAgent { agent, landed_url })
        }
        Err(failure) => {
            let snapshot = match failure.snapshot {
                Snapshot::Login => &config.login_snapshot,
                Snapshot::Recovery => &config.recovery_snapshot,
            };
            capture(agent.as_ref(), snapshot).await;
            if let Err(e) = agent.shutdown().await {
                warn!("browser shutdown after failed login reported: {e:#}");
            }
            Err(HarvestError::Authentication(failure.reason))
        }
    }
}

async fn login(
    agent: &mut dyn BrowserAgent,
    config: &LoginConfig,
    credential: &Credential,
) -> Result<String, LoginFailure> {
    let nav_ms = config.navigation_timeout.as_millis() as u64;

    info!("Initiating login sequence at {}", config.login_url);
    agent
        .navigate(&config.login_url, nav_ms)
        .await
        .map_err(|e| LoginFailure::new(format!("could not open login page: {e:#}")))?;

    let form_ready = {
        let a: &dyn BrowserAgent = agent;
        let fields = [
            config.identity_selector.as_str(),
            config.secret_selector.as_str(),
            config.submit_selector.as_str(),
        ];
        wait_until(config.form_wait, config.poll_interval, || async move {
            for sel in fields {
                if !a.has_element(sel).await.unwrap_or(false) {
                    return false;
                }
            }
            true
        })
        .await
    };
    if !form_ready {
        return Err(LoginFailure::new("form not ready"));
    }

    agent
        .fill(&config.identity_selector, credential.identity())
        .await
        .map_err(|e| LoginFailure::new(format!("could not enter identity: {e:#}")))?;
    agent
        .fill(&config.secret_selector, credential.secret())
        .await
        .map_err(|e| LoginFailure::new(format!("could not enter secret: {e:#}")))?;
    agent
        .click(&config.submit_selector)
        .await
        .map_err(|e| LoginFailure::new(format!("could not submit login form: {e:#}")))?;

    let landed = {
        let a: &dyn BrowserAgent = agent;
        let markers = &config.landing_selectors;
        wait_until(config.landing_wait, config.poll_interval, || async move {
            for sel in markers {
                if a.has_element(sel).await.unwrap_or(false) {
                    return true;
                }
            }
            false
        })
        .await
    };
    if landed {
        info!("Login credentials validated");
    } else {
        warn!("no post-login landing indicator within {:?}", config.landing_wait);
    }

    info!("Navigating to {}", config.target_url);
    if let Err(e) = agent.navigate(&config.target_url, nav_ms).await {
        warn!("navigation to listing failed: {e:#}");
    }

    let target_path = target_path(&config.target_url);
    if on_target(agent, config, &target_path, config.verify_wait).await {
        return Ok(agent.current_url().await.unwrap_or_default());
    }

    let current = agent.current_url().await.unwrap_or_default();
    warn!("login verification failed, current URL: {current}");

    if !current.to_lowercase().contains(&config.alternate_landing.to_lowercase()) {
        return Err(LoginFailure::new(format!(
            "could not verify arrival at {} (current location: {current})",
            config.target_url
        )));
    }

    info!("Landed on {current}, attempting direct navigation");
    if let Err(e) = agent.navigate(&config.target_url, nav_ms).await {
        return Err(LoginFailure::after_recovery(format!(
            "recovery navigation failed: {e:#}"
        )));
    }
    if on_target(agent, config, &target_path, config.recovery_wait).await {
        info!("Recovery successful");
        return Ok(agent.current_url().await.unwrap_or_default());
    }

    let current = agent.current_url().await.unwrap_or_default();
    Err(LoginFailure::after_recovery(format!(
        "recovery failed, still at {current}"
    )))
}

/// Whether the agent shows the listing within `wait`.
async fn on_target(
    agent: &dyn BrowserAgent,
    config: &LoginConfig,
    target_path: &str,
    wait: Duration,
) -> bool {
    let results = config.results_selector.as_str();
    wait_until(wait, config.poll_interval, || async move {
        let at_path = agent
            .current_url()
            .await
            .map(|u| u.to_lowercase().contains(target_path))
            .unwrap_or(false);
        at_path || agent.has_element(results).await.unwrap_or(false)
    })
    .await
}

/// Lowercased path of the target URL, without the leading slash.
fn target_path(target_url: &str) -> String {
    match url::Url::parse(target_url) {
        Ok(u) if !u.path().trim_matches('/').is_empty() => {
            u.path().trim_start_matches('/').to_lowercase()
        }
        _ => target_url.to_lowercase(),
    }
}

async fn capture(agent: &dyn BrowserAgent, path: &Path) {
    match agent.screenshot(path).await {
        Ok(()) => info!("Saved diagnostic screenshot to {}", path.display()),
        Err(e) => warn!("could not capture {}: {e:#}", path.display()),
    }
}
