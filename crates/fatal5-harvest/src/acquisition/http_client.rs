//! Async HTTP client wrapping reqwest.
//!
//! Not a browser, just HTTP requests carrying the cookies handed over from
//! the login phase. Handles timeouts, retry with exponential backoff on
//! transport errors and retryable statuses, and `Retry-After` on 429/503.

use anyhow::{Context, Result};
use reqwest::cookie::Jar;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Upper bound for a server-requested `Retry-After` delay.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);

/// When and how often a request is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each further retry.
    pub backoff_base: Duration,
    /// Response statuses that are retried.
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
            retry_statuses: vec![429, 500, 502, 503, 504],
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        self.backoff_base * 2u32.saturating_pow(retry.saturating_sub(1))
    }

    pub fn retries_status(&self, status: u16) -> bool {
        self.retry_statuses.contains(&status)
    }
}

/// Response from an HTTP GET request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// All response headers, names lowercased.
    pub headers: Vec<(String, String)>,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// First value of header `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body decoded as UTF-8, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client for the scrape phase.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl HttpClient {
    /// Create a client without a cookie store.
    pub fn new(retry: RetryPolicy) -> Result<Self> {
        Self::build(reqwest::Client::builder(), retry)
    }

    /// Create a client whose requests carry the cookies in `jar`.
    pub fn with_cookie_jar(jar: Arc<Jar>, retry: RetryPolicy) -> Result<Self> {
        Self::build(reqwest::Client::builder().cookie_provider(jar), retry)
    }

    fn build(builder: reqwest::ClientBuilder, retry: RetryPolicy) -> Result<Self> {
        let ua = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                  AppleWebKit/537.36 (KHTML, like Gecko) \
                  Chrome/131.0.0.0 Safari/537.36";

        let client = builder
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(ua)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { client, retry })
    }

    /// Perform a GET request, retrying according to the client's policy.
    ///
    /// Once retries are exhausted the last response is returned as-is, so a
    /// persistent 503 surfaces as a 503 rather than an error.
    pub async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse> {
        let mut retries = 0u32;

        loop {
            let resp = self.client.get(url).timeout(timeout).send().await;

            match resp {
                Ok(r) => {
                    let status = r.status().as_u16();

                    if self.retry.retries_status(status) && retries < self.retry.max_retries {
                        retries += 1;
                        let delay = if status == 429 || status == 503 {
                            retry_after(&r).unwrap_or_else(|| self.retry.backoff(retries))
                        } else {
                            self.retry.backoff(retries)
                        };
                        debug!("HTTP {status} for {url}, retry {retries} in {delay:?}");
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    let headers: Vec<(String, String)> = r
                        .headers()
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
                        .collect();

                    let body = r
                        .bytes()
                        .await
                        .with_context(|| format!("failed to read body of {url}"))?
                        .to_vec();

                    return Ok(HttpResponse {
                        status,
                        headers,
                        body,
                    });
                }
                Err(e) => {
                    if retries < self.retry.max_retries {
                        retries += 1;
                        let delay = self.retry.backoff(retries);
                        debug!("request to {url} failed ({e}), retry {retries} in {delay:?}");
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(anyhow::Error::new(e).context(format!("GET {url}")));
                }
            }
        }
    }
}

/// Delay requested by a `Retry-After: <seconds>` header.
fn retry_after(resp: &reqwest::Response) -> Option<Duration> {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(|secs| Duration::from_secs(secs).min(MAX_RETRY_AFTER))
}
