//! Per-row document download.
//!
//! Failures never escape [`download_document`]; they are folded into the
//! returned [`DownloadOutcome`] so one bad row cannot affect the others.

use crate::acquisition::http_client::HttpClient;
use crate::error::RowDownloadError;
use crate::record::DownloadOutcome;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;

fn disposition_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"filename="?(.+\.pdf)"?"#).expect("valid regex"))
}

/// The `.pdf` filename named by a `Content-Disposition` header, reduced to
/// its final path component.
pub fn filename_from_disposition(header: &str) -> Option<String> {
    let caps = disposition_re().captures(header)?;
    let name = caps.get(1)?.as_str().rsplit(['/', '\\']).next()?.trim();
    if name.is_empty() || name.starts_with('.') {
        return None;
    }
    Some(name.to_string())
}

/// `<row filename>.pdf` with path separators neutralised.
pub fn fallback_filename(row_filename: &str) -> String {
    let stem: String = row_filename
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    let stem = stem.trim_start_matches('.');
    if stem.is_empty() {
        "document.pdf".to_string()
    } else {
        format!("{stem}.pdf")
    }
}

/// Fetch `url` and store the body under `dir`.
pub async fn download_document(
    client: &HttpClient,
    url: &str,
    row_filename: &str,
    dir: &Path,
    timeout: Duration,
) -> DownloadOutcome {
    match fetch_and_store(client, url, row_filename, dir, timeout).await {
        Ok(Some(path)) => DownloadOutcome::Saved(path),
        Ok(None) => DownloadOutcome::Failed,
        Err(e) => DownloadOutcome::Error(e.to_string()),
    }
}

async fn fetch_and_store(
    client: &HttpClient,
    url: &str,
    row_filename: &str,
    dir: &Path,
    timeout: Duration,
) -> Result<Option<PathBuf>, RowDownloadError> {
    let resp = client
        .get(url, timeout)
        .await
        .map_err(RowDownloadError::Transport)?;

    if resp.status != 200 {
        debug!("HTTP {} for document {url}", resp.status);
        return Ok(None);
    }

    let name = resp
        .header("content-disposition")
        .and_then(filename_from_disposition)
        .unwrap_or_else(|| fallback_filename(row_filename));
    let path = dir.join(name);
    tokio::fs::write(&path, &resp.body).await?;
    debug!("saved {} ({} bytes)", path.display(), resp.body.len());
    Ok(Some(path))
}
