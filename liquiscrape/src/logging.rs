use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_FILE_NAME: &str = "liquiscrape.log";

/// Installs the console and daily-rotating file layers. `RUST_LOG` controls
/// the level (default `info`); `quiet` limits the console to warnings while
/// the file keeps everything the filter allows.
///
/// The returned guard flushes the file writer on drop and must be held until
/// the process exits.
pub fn init_logging(log_dir: &Path, quiet: bool) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_ansi(false)
        .compact()
        .with_filter(env_filter("info")?);

    let console_layer = fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .with_filter(if quiet { EnvFilter::try_new("warn")? } else { env_filter("info")? });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()?;

    tracing::debug!("Logging to {}/{}", log_dir.display(), LOG_FILE_NAME);
    Ok(guard)
}

fn env_filter(default: &str) -> anyhow::Result<EnvFilter> {
    Ok(EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default))?)
}
