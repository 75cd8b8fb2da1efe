//! Run constants and credentials.
//!
//! There is no configuration file: every endpoint, selector, wait and path
//! lives in [`HarvestConfig::default`]. The only external inputs are the two
//! credential values read from `USERNAME` and `PASSWORD`.

use crate::acquisition::http_client::RetryPolicy;
use crate::error::HarvestError;
use crate::scrape::ScrapeSettings;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Portal login form.
pub const LOGIN_URL: &str = "https://fatal5.com/account/login";

/// Listing that is paged through after login.
pub const TARGET_URL: &str = "https://fatal5.com/search/index";

/// Domain given to transferred cookies that come without one.
pub const FALLBACK_COOKIE_DOMAIN: &str = ".fatal5.com";

/// Environment variable holding the login identity.
pub const IDENTITY_VAR: &str = "USERNAME";

/// Environment variable holding the login secret.
pub const SECRET_VAR: &str = "PASSWORD";

/// Selectors and timings for the interactive login.
#[derive(Debug, Clone)]
pub struct LoginConfig {
    pub login_url: String,
    pub target_url: String,
    pub identity_selector: String,
    pub secret_selector: String,
    pub submit_selector: String,
    /// Any one of these marks a successful post-login landing.
    pub landing_selectors: Vec<String>,
    /// Present on the listing page once it has rendered.
    pub results_selector: String,
    /// Substring of the location the portal sometimes lands on instead of the listing.
    pub alternate_landing: String,
    pub navigation_timeout: Duration,
    pub form_wait: Duration,
    pub landing_wait: Duration,
    pub verify_wait: Duration,
    pub recovery_wait: Duration,
    pub poll_interval: Duration,
    pub login_snapshot: PathBuf,
    pub recovery_snapshot: PathBuf,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            login_url: LOGIN_URL.to_string(),
            target_url: TARGET_URL.to_string(),
            identity_selector: "#Email".to_string(),
            secret_selector: "#Password".to_string(),
            submit_selector: "input[type='submit']".to_string(),
            landing_selectors: vec![".dashboard-header".to_string(), ".logout-link".to_string()],
            results_selector: ".search-results-table".to_string(),
            alternate_landing: "incident/index".to_string(),
            navigation_timeout: Duration::from_secs(30),
            form_wait: Duration::from_secs(20),
            landing_wait: Duration::from_secs(20),
            verify_wait: Duration::from_secs(15),
            recovery_wait: Duration::from_secs(10),
            poll_interval: Duration::from_millis(250),
            login_snapshot: PathBuf::from("login_error.png"),
            recovery_snapshot: PathBuf::from("recovery_error.png"),
        }
    }
}

/// Everything one harvest run needs besides the credential.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub login: LoginConfig,
    pub fallback_cookie_domain: String,
    pub retry: RetryPolicy,
    /// Maximum number of listing pages fetched in one run.
    pub max_pages: u32,
    /// Pause after advancing to the next listing page.
    pub page_delay: Duration,
    pub page_timeout: Duration,
    pub download_timeout: Duration,
    pub download_dir: PathBuf,
    pub output_file: PathBuf,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            login: LoginConfig::default(),
            fallback_cookie_domain: FALLBACK_COOKIE_DOMAIN.to_string(),
            retry: RetryPolicy::default(),
            max_pages: 20,
            page_delay: Duration::from_millis(1500),
            page_timeout: Duration::from_secs(30),
            download_timeout: Duration::from_secs(10),
            download_dir: PathBuf::from("downloads"),
            output_file: PathBuf::from("learning_packs.json"),
        }
    }
}

impl HarvestConfig {
    /// The listing URL pagination starts from; document links resolve against it.
    pub fn base_url(&self) -> &str {
        &self.login.target_url
    }

    pub fn scrape_settings(&self) -> ScrapeSettings {
        ScrapeSettings {
            max_pages: self.max_pages,
            page_delay: self.page_delay,
            page_timeout: self.page_timeout,
            download_timeout: self.download_timeout,
            download_dir: self.download_dir.clone(),
        }
    }
}

/// Login identity and secret, read once at startup.
#[derive(Clone)]
pub struct Credential {
    identity: String,
    secret: String,
}

impl Credential {
    pub fn new(identity: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            secret: secret.into(),
        }
    }

    /// Read the credential through `lookup`; a missing or blank value is a
    /// configuration error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, HarvestError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| {
                    HarvestError::Configuration(format!(
                        "set {IDENTITY_VAR} and {SECRET_VAR} as environment variables ({name} is missing)"
                    ))
                })
        };
        let identity = read(IDENTITY_VAR)?;
        let secret = read(SECRET_VAR)?;
        Ok(Self { identity, secret })
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("identity", &self.identity)
            .field("secret", &"<redacted>")
            .finish()
    }
}
