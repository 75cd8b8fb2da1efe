//! Paginated walk over the listing table.
//!
//! Pages are fetched strictly in "next"-link order and rows in table order.
//! A page-level failure ends the walk but keeps what was already collected;
//! [`scrape`] itself never fails.

use crate::acquisition::document::ListingLayout;
use crate::acquisition::http_client::HttpClient;
use crate::error::PageFetchError;
use crate::record::{DownloadOutcome, Record};
use crate::scrape::download::download_document;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Limits and timings for one walk.
#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    pub max_pages: u32,
    pub page_delay: Duration,
    pub page_timeout: Duration,
    pub download_timeout: Duration,
    pub download_dir: PathBuf,
}

/// Current listing URL and 1-based page number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    url: Url,
    page: u32,
}

impl PageCursor {
    pub fn new(url: Url) -> Self {
        Self { url, page: 1 }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    /// Move to `next`, or report why the walk should stop instead.
    pub fn advance(&mut self, next: Url, max_pages: u32) -> Result<(), StopReason> {
        if next == self.url {
            return Err(StopReason::CycleDetected);
        }
        if self.page >= max_pages {
            return Err(StopReason::PageLimit);
        }
        self.url = next;
        self.page += 1;
        Ok(())
    }
}

/// Why pagination ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    NoNextLink,
    CycleDetected,
    PageLimit,
    TableMissing,
    FetchFailed(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::NoNextLink => f.write_str("no next link"),
            StopReason::CycleDetected => f.write_str("next link points to the current page"),
            StopReason::PageLimit => f.write_str("page limit reached"),
            StopReason::TableMissing => f.write_str("results table not found"),
            StopReason::FetchFailed(detail) => write!(f, "page fetch failed: {detail}"),
        }
    }
}

/// Everything one walk produced.
#[derive(Debug, Clone)]
pub struct ScrapeReport {
    /// Page-major, row-major.
    pub records: Vec<Record>,
    pub pages_fetched: u32,
    pub stop_reason: StopReason,
}

impl ScrapeReport {
    /// Records whose document was saved.
    pub fn downloaded(&self) -> usize {
        self.records.iter().filter(|r| r.download.is_success()).count()
    }
}

/// Walk the listing from `start_url`, downloading each row's document.
pub async fn scrape(
    client: &HttpClient,
    layout: &ListingLayout,
    start_url: &str,
    settings: &ScrapeSettings,
) -> ScrapeReport {
    let mut report = ScrapeReport {
        records: Vec::new(),
        pages_fetched: 0,
        stop_reason: StopReason::NoNextLink,
    };

    let base = match Url::parse(start_url) {
        Ok(u) => u,
        Err(source) => {
            let err = PageFetchError::InvalidUrl {
                url: start_url.to_string(),
                source,
            };
            warn!("{err}");
            report.stop_reason = StopReason::FetchFailed(err.to_string());
            return report;
        }
    };

    if settings.max_pages == 0 {
        report.stop_reason = StopReason::PageLimit;
        return report;
    }

    let mut cursor = PageCursor::new(base.clone());
    let stop_reason = loop {
        info!("Processing page {}: {}", cursor.page(), cursor.url());

        let html = match fetch_listing(client, cursor.url(), settings.page_timeout).await {
            Ok(html) => html,
            Err(e) => {
                warn!("stopping pagination: {e}");
                break StopReason::FetchFailed(e.to_string());
            }
        };
        report.pages_fetched += 1;

        let listing = layout.parse(&html);
        if !listing.table_found {
            warn!("results table not found on page {}", cursor.page());
            break StopReason::TableMissing;
        }
        if listing.skipped > 0 {
            debug!("skipped {} malformed rows", listing.skipped);
        }
        info!("Found {} rows on page {}", listing.rows.len(), cursor.page());

        for row in listing.rows {
            let record = match base.join(&row.href) {
                Ok(file_url) => {
                    let outcome = download_document(
                        client,
                        file_url.as_str(),
                        &row.filename,
                        &settings.download_dir,
                        settings.download_timeout,
                    )
                    .await;
                    Record::new(row.filename, file_url.to_string(), outcome, row.metadata)
                }
                Err(e) => {
                    warn!("cannot resolve document link {:?}: {e}", row.href);
                    Record::new(row.filename, row.href, DownloadOutcome::NotAttempted, row.metadata)
                }
            };
            info!("{}: {}", record.filename, record.download_status());
            report.records.push(record);
        }

        let Some(href) = listing.next_href else {
            info!("No next link, pagination complete");
            break StopReason::NoNextLink;
        };
        let next = match base.join(&href) {
            Ok(u) => u,
            Err(source) => {
                let err = PageFetchError::InvalidUrl { url: href, source };
                warn!("stopping pagination: {err}");
                break StopReason::FetchFailed(err.to_string());
            }
        };
        if let Err(reason) = cursor.advance(next, settings.max_pages) {
            info!("Stopping pagination: {reason}");
            break reason;
        }

        tokio::time::sleep(settings.page_delay).await;
    };

    report.stop_reason = stop_reason;
    report
}

async fn fetch_listing(
    client: &HttpClient,
    url: &Url,
    timeout: Duration,
) -> Result<String, PageFetchError> {
    let resp = client
        .get(url.as_str(), timeout)
        .await
        .map_err(PageFetchError::Transport)?;
    if !resp.is_success() {
        return Err(PageFetchError::Status {
            status: resp.status,
            url: url.to_string(),
        });
    }
    Ok(resp.text())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_cursor_advances() {
        let mut cursor = PageCursor::new(url("https://fatal5.com/search/index"));
        cursor
            .advance(url("https://fatal5.com/search/index?page=2"), 20)
            .unwrap();
        assert_eq!(cursor.page(), 2);
        assert_eq!(cursor.url().query(), Some("page=2"));
    }

    #[test]
    fn test_cursor_cycle_guard() {
        let mut cursor = PageCursor::new(url("https://fatal5.com/search/index?page=1"));
        assert_eq!(
            cursor.advance(url("https://fatal5.com/search/index?page=1"), 20),
            Err(StopReason::CycleDetected)
        );
        assert_eq!(cursor.page(), 1);
    }

    #[test]
    fn test_cursor_page_limit() {
        let mut cursor = PageCursor::new(url("https://fatal5.com/p/1"));
        cursor.advance(url("https://fatal5.com/p/2"), 2).unwrap();
        assert_eq!(
            cursor.advance(url("https://fatal5.com/p/3"), 2),
            Err(StopReason::PageLimit)
        );
        assert_eq!(cursor.page(), 2);
    }

    #[test]
    fn test_stop_reason_display() {
        assert_eq!(StopReason::PageLimit.to_string(), "page limit reached");
        assert_eq!(
            StopReason::FetchFailed("HTTP 500".into()).to_string(),
            "page fetch failed: HTTP 500"
        );
    }
}
