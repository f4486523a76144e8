// Seed file loading

use liquiscrape_scanner::CrawlJob;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;
use url::Url;

/// Header names that mark the URL column of a CSV seed file, in priority
/// order. `player_url` is what the `active` command writes.
pub const LINK_COLUMNS: [&str; 2] = ["Link", "player_url"];
/// Optional column naming the player, used for the image file name.
pub const NAME_COLUMN: &str = "ID";

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read seed file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed seed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("No valid URLs found in {0}")]
    Empty(String),
}

/// Load crawl jobs from a CSV with a `Link` column, or from a
/// newline-delimited list of URLs.
pub fn load_seeds(path: &Path) -> Result<Vec<CrawlJob>, SeedError> {
    let content = std::fs::read_to_string(path).map_err(|source| SeedError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let jobs = parse_seeds(&content)?;
    if jobs.is_empty() {
        return Err(SeedError::Empty(path.display().to_string()));
    }
    Ok(jobs)
}

pub fn parse_seeds(content: &str) -> Result<Vec<CrawlJob>, SeedError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let headers = reader.headers()?.clone();

    let link_column = LINK_COLUMNS
        .iter()
        .find_map(|name| headers.iter().position(|h| h == *name));
    let Some(link_column) = link_column else {
        return Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(parse_url_line)
            .map(CrawlJob::new)
            .collect());
    };
    let name_column = headers.iter().position(|h| h == NAME_COLUMN);

    let mut jobs = Vec::new();
    for record in reader.records() {
        let record = record?;
        let Some(url) = record.get(link_column).and_then(parse_url_line) else {
            continue;
        };
        let mut job = CrawlJob::new(url);
        if let Some(name) = name_column.and_then(|i| record.get(i)).filter(|n| !n.is_empty()) {
            job = job.with_name(name);
        }
        jobs.push(job);
    }
    Ok(jobs)
}

/// Parse a single entry as a URL, adding `https://` when it has no scheme.
pub fn parse_url_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if line.contains("://") {
        if Url::parse(line).is_ok() {
            return Some(line.to_string());
        }
    } else {
        let with_scheme = format!("https://{}", line);
        if Url::parse(&with_scheme).is_ok() {
            return Some(with_scheme);
        }
    }

    warn!("Skipping invalid URL '{}'", line);
    None
}
