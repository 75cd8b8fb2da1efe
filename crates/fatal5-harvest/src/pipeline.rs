//! End-to-end run: credential, login, handoff, scrape, sink.
//!
//! Each phase receives the previous phase's output by value. The browser
//! is gone before the first listing page is requested.

use crate::acquisition::document::ListingLayout;
use crate::auth;
use crate::config::{Credential, HarvestConfig};
use crate::error::{HarvestError, OutputError};
use crate::renderer::chromium::ChromiumAgent;
use crate::renderer::BrowserAgent;
use crate::scrape::{scrape, StopReason};
use crate::session;
use crate::sink;
use std::future::Future;
use std::path::PathBuf;
use tracing::info;

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Records written to the output file.
    pub records: usize,
    pub pages_fetched: u32,
    pub stop_reason: StopReason,
    /// Records whose document was saved.
    pub downloaded: usize,
    pub output_path: PathBuf,
}

/// Run against the live portal with credentials from the environment and a
/// local Chromium.
pub async fn run(config: &HarvestConfig) -> Result<RunSummary, HarvestError> {
    run_with(
        config,
        |name| std::env::var(name).ok(),
        || async {
            ChromiumAgent::launch()
                .await
                .map(|agent| Box::new(agent) as Box<dyn BrowserAgent>)
                .map_err(HarvestError::Browser)
        },
    )
    .await
}

/// Run with an injected credential lookup and agent launcher.
///
/// The credential is read and the download directory created before
/// `launch` is called, so a missing credential ends the run with no
/// browser started and no request sent.
pub async fn run_with<L, F, Fut>(
    config: &HarvestConfig,
    lookup: L,
    launch: F,
) -> Result<RunSummary, HarvestError>
where
    L: Fn(&str) -> Option<String>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Box<dyn BrowserAgent>, HarvestError>>,
{
    let credential = Credential::from_lookup(lookup)?;
    std::fs::create_dir_all(&config.download_dir).map_err(OutputError::from)?;
    let agent = launch().await?;
    execute(config, &credential, agent).await
}

/// Drive an already-launched agent through the whole run.
pub async fn execute(
    config: &HarvestConfig,
    credential: &Credential,
    agent: Box<dyn BrowserAgent>,
) -> Result<RunSummary, HarvestError> {
    let authenticated = auth::authenticate(agent, &config.login, credential).await?;
    let client = session::hand_off(
        authenticated,
        &config.fallback_cookie_domain,
        config.retry.clone(),
    )
    .await?;

    let layout = ListingLayout::default();
    let report = scrape(&client, &layout, config.base_url(), &config.scrape_settings()).await;
    info!(
        "Scraping finished after {} pages ({})",
        report.pages_fetched, report.stop_reason
    );

    sink::write_records(&config.output_file, &report.records)?;
    info!(
        "Saved {} records to {}",
        report.records.len(),
        config.output_file.display()
    );

    Ok(RunSummary {
        records: report.records.len(),
        pages_fetched: report.pages_fetched,
        downloaded: report.downloaded(),
        stop_reason: report.stop_reason,
        output_path: config.output_file.clone(),
    })
}
