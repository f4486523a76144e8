use crate::logging::init_logging;
use anyhow::Context;
use clap::ArgMatches;
use colored::Colorize;
use liquiscrape_core::active::{ActiveOptions, execute_active_scrape};
use liquiscrape_core::config::{DEFAULT_LOG_DIR, DEFAULT_SETTINGS_PATH, Settings};
use liquiscrape_core::crawl::{CrawlOptions, acquire_proxies, execute_crawl, generate_crawl_summary};
use liquiscrape_core::export::{ExportFormat, export_results};
use liquiscrape_core::seeds::load_seeds;
use liquiscrape_core::RunError;
use liquiscrape_scanner::ValidationPolicy;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

/// Settings file named by `--settings`, with `~` expanded
pub fn resolve_settings_path(args: &ArgMatches) -> PathBuf {
    let raw = args
        .get_one::<PathBuf>("settings")
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_SETTINGS_PATH.to_string());
    PathBuf::from(shellexpand::tilde(&raw).into_owned())
}

/// Applies the command-line overrides a subcommand defines. Arguments a
/// subcommand does not have are ignored.
pub fn apply_overrides(settings: &mut Settings, args: &ArgMatches) -> Result<(), RunError> {
    if let Some(threads) = args.try_get_one::<usize>("threads").ok().flatten() {
        settings.thread_num = *threads;
    }
    if let Some(input) = args.try_get_one::<PathBuf>("input").ok().flatten() {
        settings.input_file_path = input.clone();
    }
    if let Some(output) = args.try_get_one::<PathBuf>("output").ok().flatten() {
        settings.output_file_path = output.clone();
    }
    if let Some(format) = args.try_get_one::<String>("format").ok().flatten() {
        settings.export_format = format.clone();
    }
    settings.validate()?;
    Ok(())
}

fn single_pass(args: &ArgMatches) -> Option<ValidationPolicy> {
    args.try_get_one::<bool>("single-pass")
        .ok()
        .flatten()
        .copied()
        .unwrap_or(false)
        .then_some(ValidationPolicy::SinglePass)
}

/// Loads settings, applies overrides and installs logging. The returned
/// guard must outlive every log call, including a final fatal error.
pub fn prepare(args: &ArgMatches, quiet: bool) -> anyhow::Result<(Settings, WorkerGuard)> {
    let path = resolve_settings_path(args);
    let mut settings = Settings::load(&path).map_err(RunError::from)?;
    apply_overrides(&mut settings, args)?;
    let guard = init_logging(&settings.log_dir, quiet)
        .with_context(|| format!("Failed to set up logging in {}", settings.log_dir.display()))?;
    info!("Loaded settings from {}", path.display());
    Ok((settings, guard))
}

/// Records a fatal error and flushes the log file. Without a guard, logging
/// is first installed under the default log directory so errors raised
/// before settings were read still reach the file.
pub fn log_fatal(error: &anyhow::Error, guard: Option<WorkerGuard>, quiet: bool) {
    let guard = guard.or_else(|| init_logging(Path::new(DEFAULT_LOG_DIR), quiet).ok());
    tracing::error!("{:#}", error);
    drop(guard);
}

pub async fn handle_crawl(sub_matches: &ArgMatches, settings: &Settings, quiet: bool) -> anyhow::Result<()> {
    let no_images = sub_matches.get_flag("no-images");

    let format = ExportFormat::from_str(&settings.export_format)
        .ok_or_else(|| RunError::UnknownFormat(settings.export_format.clone()))?;
    let seeds = load_seeds(&settings.input_file_path).map_err(RunError::from)?;

    if !quiet {
        print_divider();
        println!("{}", "  LIQUISCRAPE CRAWL".bright_white().bold());
        print_divider();
        println!("{} Profiles: {}", "→".blue(), seeds.len().to_string().bright_white());
        println!("{} Workers: {}", "→".blue(), settings.thread_num);
        if no_images {
            println!("{} Images: {}", "→".blue(), "disabled".yellow());
        } else {
            println!(
                "{} Images: {} ({} workers)",
                "→".blue(),
                settings.image_dir.display(),
                settings.image_thread_num
            );
        }
        println!();
    }

    let proxies = acquire_proxies(settings, single_pass(sub_matches), !quiet).await?;
    info!("{} live proxies", proxies.len());

    let mut options = CrawlOptions::from_settings(settings, seeds, proxies);
    if no_images {
        options.image_dir = None;
    }
    options.show_progress_bars = !quiet;

    let progress_callback = Arc::new(|msg: String| {
        tracing::debug!("{}", msg);
    });
    let results = execute_crawl(options, Some(progress_callback))
        .await
        .map_err(RunError::Crawl)?;

    let date = chrono::Local::now().date_naive();
    let written =
        export_results(&results, &settings.output_file_path, format, date).map_err(RunError::from)?;

    if !quiet {
        println!("\n{} Crawl complete!\n", "✓".green().bold());
        print!("{}", generate_crawl_summary(&results, &written));
    }
    Ok(())
}

pub async fn handle_active(settings: &Settings, quiet: bool) -> anyhow::Result<()> {

    let proxies = acquire_proxies(settings, None, !quiet).await?;
    let mut options = ActiveOptions::from_settings(settings, proxies);
    options.show_progress_bars = !quiet;

    let date = chrono::Local::now().date_naive();
    let (results, path) = execute_active_scrape(options, date)
        .await
        .map_err(RunError::from)?;

    if !quiet {
        println!(
            "{} {} active players from {} organizations",
            "✓".green().bold(),
            results.players.len().to_string().bright_white(),
            results.organizations.len()
        );
        for (url, error) in &results.failed {
            println!("  {} {} {}", "✗".red(), url, error.dimmed());
        }
        println!("{} Saved to {}", "→".blue(), path.display().to_string().bright_white());
    }
    Ok(())
}

pub async fn handle_proxies(sub_matches: &ArgMatches, settings: &Settings, quiet: bool) -> anyhow::Result<()> {
    let proxies = acquire_proxies(settings, single_pass(sub_matches), !quiet).await?;

    for address in proxies.addresses() {
        println!("{}", address);
    }
    Ok(())
}
