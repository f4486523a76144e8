use crate::config::Settings;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use liquiscrape_scanner::error::ScanError;
use liquiscrape_scanner::{
    AssetPipeline, CrawlJob, CrawlResults, Extractor, Fetcher, JobEvent, Orchestrator, ProgressCallback,
    ProxyAddress, ProxyPool, ProxySet, RetryPolicy, ValidationPolicy,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Options for configuring a crawl operation
pub struct CrawlOptions {
    pub seeds: Vec<CrawlJob>,
    pub proxies: ProxySet,
    pub threads: usize,
    pub image_threads: usize,
    /// `None` skips image downloads entirely
    pub image_dir: Option<PathBuf>,
    pub page_timeout: Duration,
    pub image_timeout: Duration,
    pub min_image_bytes: u64,
    pub retry: RetryPolicy,
    pub show_progress_bars: bool,
}

impl CrawlOptions {
    pub fn from_settings(settings: &Settings, seeds: Vec<CrawlJob>, proxies: ProxySet) -> Self {
        Self {
            seeds,
            proxies,
            threads: settings.thread_num,
            image_threads: settings.image_thread_num,
            image_dir: Some(settings.image_dir.clone()),
            page_timeout: settings.page_timeout(),
            image_timeout: settings.image_timeout(),
            min_image_bytes: settings.fetch.min_image_bytes,
            retry: settings.retry_policy(),
            show_progress_bars: true,
        }
    }
}

/// Callback for reporting crawl progress
pub type CrawlProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

fn spinner(message: &'static str) -> Result<ProgressBar, String> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .map_err(|e| e.to_string())?,
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message);
    Ok(pb)
}

/// Builds the live proxy set: the configured static proxies when there are
/// any, otherwise a discovery run against the public listing.
pub async fn acquire_proxies(
    settings: &Settings,
    policy: Option<ValidationPolicy>,
    show_progress_bars: bool,
) -> Result<ProxySet, ScanError> {
    if !settings.proxy.static_proxies.is_empty() {
        let addresses = settings
            .proxy
            .static_proxies
            .iter()
            .map(|entry| entry.parse::<ProxyAddress>())
            .collect::<Result<Vec<_>, _>>()?;
        info!("Using {} configured proxies", addresses.len());
        return ProxySet::from_addresses(&addresses);
    }

    let proxy = &settings.proxy;
    let pool = ProxyPool::new(&proxy.listing_url, &proxy.target_url)?
        .with_ports(proxy.ports.clone())
        .with_max_listing_rows(proxy.max_listing_rows)
        .with_probe_concurrency(proxy.probe_concurrency)
        .with_probe_timeout(Duration::from_secs(proxy.probe_timeout_secs))
        .with_policy(policy.unwrap_or_else(|| settings.validation_policy()))
        .with_max_rounds(proxy.max_rounds)
        .with_round_delay(Duration::from_millis(proxy.round_delay_ms));

    let pb = if show_progress_bars {
        spinner("Fetching and validating proxies...").ok()
    } else {
        None
    };
    let result = pool.discover_and_validate().await;
    if let Some(pb) = pb {
        match &result {
            Ok(set) => pb.finish_with_message(format!("{} working proxies", set.len())),
            Err(_) => pb.finish_and_clear(),
        }
    }

    let set = result?;
    if set.is_empty() {
        return Err(ScanError::NoLiveProxies);
    }
    Ok(set)
}

/// Execute a crawl with the given options
/// Returns the crawl results
pub async fn execute_crawl(
    options: CrawlOptions,
    progress_callback: Option<CrawlProgressCallback>,
) -> Result<CrawlResults, String> {
    let CrawlOptions {
        seeds,
        proxies,
        threads,
        image_threads,
        image_dir,
        page_timeout,
        image_timeout,
        min_image_bytes,
        retry,
        show_progress_bars,
    } = options;

    if seeds.is_empty() {
        return Err("No profiles to crawl".to_string());
    }
    if proxies.is_empty() {
        return Err("No live proxies to crawl through".to_string());
    }

    // One tick per finished or failed profile
    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new(seeds.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .map_err(|e| e.to_string())?
                .progress_chars("=>-"),
        );
        pb.set_message("Starting crawl...");
        Some(Arc::new(pb))
    } else {
        None
    };

    let internal_callback: ProgressCallback = {
        let pb = progress_bar.clone();
        let outer = progress_callback.clone();
        Arc::new(move |_worker_id: usize, event: JobEvent| {
            if !event.state.is_terminal() {
                return;
            }
            if let Some(ref pb) = pb {
                pb.inc(1);
                pb.set_message(format!("{:?}: {}", event.state, short_name(&event.url)));
            }
            if let Some(ref callback) = outer {
                callback(format!("{:?} {} ({} remaining)", event.state, event.url, event.remaining));
            }
        })
    };

    let fetcher = Fetcher::new(proxies.clone())
        .with_timeout(page_timeout)
        .with_retry_policy(retry.clone());
    let mut orchestrator = Orchestrator::new(fetcher, Extractor::new())
        .with_workers(threads)
        .with_progress_callback(internal_callback);

    if let Some(dir) = image_dir {
        let pipeline = AssetPipeline::new(dir, proxies)
            .with_timeout(image_timeout)
            .with_retry_policy(retry)
            .with_min_bytes(min_image_bytes);
        orchestrator = orchestrator.with_assets(pipeline, image_threads);
    }

    let results = orchestrator.run(seeds).await.map_err(|e| e.to_string())?;

    if let Some(ref pb) = progress_bar {
        pb.finish_with_message(format!(
            "Crawl complete! {} profiles, {} failed",
            results.crawled.len(),
            results.failed.len()
        ));
    }

    Ok(results)
}

/// Last path segment of a profile URL
pub fn short_name(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|segment| !segment.is_empty())
        .unwrap_or_else(|| url.to_string())
}

/// Generate a crawl summary from results
pub fn generate_crawl_summary(results: &CrawlResults, written: &[PathBuf]) -> String {
    let mut report = String::new();
    report.push_str(&format!("{}\n\n", "━".repeat(52)));
    report.push_str(&format!("{}\n", "# Summary:".bold()));
    report.push_str(&format!("  Profiles crawled: {}\n", results.crawled.len().to_string().green()));
    report.push_str(&format!("  History entries: {}\n", results.history.len()));
    report.push_str(&format!("  Achievements: {}\n", results.achievements.len()));
    report.push_str(&format!("  Images downloaded: {}\n", results.images.len()));

    let failed = results.failed.len().to_string();
    if results.failed.is_empty() {
        report.push_str(&format!("  Failed: {}\n", failed.green()));
    } else {
        report.push_str(&format!("  Failed: {}\n", failed.red()));
        for job in &results.failed {
            report.push_str(&format!("    {} {}\n", "✗".red(), job.url));
            report.push_str(&format!("      {}\n", job.error.dimmed()));
        }
    }

    if !written.is_empty() {
        report.push_str(&format!("\n{}\n", "# Files:".bold()));
        for path in written {
            report.push_str(&format!("  {}\n", path.display()));
        }
    }

    report.push_str(&format!("\n{}\n", "━".repeat(52)));
    report
}
