// Active-roster discovery

use crate::config::Settings;
use crate::export::{ExportError, export_active_players};
use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressStyle};
use liquiscrape_scanner::error::ScanError;
use liquiscrape_scanner::roster::RosterResults;
use liquiscrape_scanner::{Fetcher, ProxySet, RetryPolicy, RosterScraper};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ActiveError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("Invalid site URL '{0}'")]
    SiteUrl(String),
}

/// Options for an active-roster run
pub struct ActiveOptions {
    pub proxies: ProxySet,
    pub site_url: String,
    pub statistics_url: String,
    pub threads: usize,
    pub output_dir: PathBuf,
    pub page_timeout: Duration,
    pub retry: RetryPolicy,
    pub show_progress_bars: bool,
}

impl ActiveOptions {
    pub fn from_settings(settings: &Settings, proxies: ProxySet) -> Self {
        Self {
            proxies,
            site_url: settings.site_url.clone(),
            statistics_url: settings.active.statistics_url.clone(),
            threads: settings.thread_num,
            output_dir: settings.output_file_path.clone(),
            page_timeout: settings.page_timeout(),
            retry: settings.retry_policy(),
            show_progress_bars: true,
        }
    }
}

/// Collects every ranked organization's active squad and writes
/// `active_players_<date>.csv` into the output directory.
pub async fn execute_active_scrape(
    options: ActiveOptions,
    date: NaiveDate,
) -> Result<(RosterResults, PathBuf), ActiveError> {
    let base = Url::parse(&options.site_url).map_err(|_| ActiveError::SiteUrl(options.site_url.clone()))?;
    let fetcher = Fetcher::new(options.proxies)
        .with_timeout(options.page_timeout)
        .with_retry_policy(options.retry);
    let scraper = RosterScraper::new(fetcher, base)
        .with_statistics_url(options.statistics_url)
        .with_workers(options.threads);

    let pb = if options.show_progress_bars {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Collecting active rosters...");
        Some(pb)
    } else {
        None
    };

    let results = scraper.run().await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    let results = results?;

    let path = export_active_players(&results.players, &options.output_dir, date)?;
    Ok((results, path))
}
