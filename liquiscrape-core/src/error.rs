use crate::active::ActiveError;
use crate::config::ConfigError;
use crate::export::ExportError;
use crate::seeds::SeedError;
use liquiscrape_scanner::ScanError;
use thiserror::Error;

/// Any failure that ends a run before results are written.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Seeds(#[from] SeedError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Active(#[from] ActiveError),

    #[error("Unknown export format '{0}' (expected csv or json)")]
    UnknownFormat(String),

    #[error("Crawl failed: {0}")]
    Crawl(String),
}
