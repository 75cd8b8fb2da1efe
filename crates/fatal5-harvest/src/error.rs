//! Error taxonomy for a harvest run.
//!
//! [`HarvestError`] covers the failures that end the process. Listing-page
//! and per-row download failures have their own types because they are
//! absorbed: a [`PageFetchError`] only ends pagination and a
//! [`RowDownloadError`] becomes the status string of one record.

/// Failures that halt the whole run.
#[derive(thiserror::Error, Debug)]
pub enum HarvestError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("session transfer failed: {0}")]
    SessionTransfer(String),

    #[error("browser unavailable: {0:#}")]
    Browser(anyhow::Error),

    #[error("failed to write results: {0}")]
    Output(#[from] OutputError),
}

/// Writing the result file or preparing the download directory failed.
#[derive(thiserror::Error, Debug)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A listing page could not be fetched or resolved.
#[derive(thiserror::Error, Debug)]
pub enum PageFetchError {
    #[error("invalid page URL {url}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("request failed: {0:#}")]
    Transport(anyhow::Error),

    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },
}

/// One document could not be fetched or written.
#[derive(thiserror::Error, Debug)]
pub enum RowDownloadError {
    #[error("{0:#}")]
    Transport(anyhow::Error),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}
