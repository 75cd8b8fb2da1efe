// Copyright 2026 Fatal5 Harvest Contributors
// SPDX-License-Identifier: Apache-2.0

use fatal5_harvest::config::HarvestConfig;
use fatal5_harvest::{logging, pipeline};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    logging::init();

    let config = HarvestConfig::default();
    match pipeline::run(&config).await {
        Ok(summary) => {
            println!(
                "Scraping completed. {} records saved to {} ({} documents downloaded, {} pages, stopped: {}).",
                summary.records,
                summary.output_path.display(),
                summary.downloaded,
                summary.pages_fetched,
                summary.stop_reason,
            );
        }
        Err(e) => {
            eprintln!("  Error: {e:#}");
            std::process::exit(1);
        }
    }
}
