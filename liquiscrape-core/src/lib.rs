pub mod active;
pub mod config;
pub mod crawl;
pub mod error;
pub mod export;
pub mod seeds;

pub use active::{ActiveOptions, execute_active_scrape};
pub use config::{ConfigError, Settings};
pub use crawl::{CrawlOptions, acquire_proxies, execute_crawl, generate_crawl_summary};
pub use error::RunError;
pub use export::{ExportFormat, export_active_players, export_results};
pub use seeds::load_seeds;
