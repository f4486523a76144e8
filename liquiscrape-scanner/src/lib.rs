pub mod asset;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod orchestrator;
pub mod proxy;
pub mod result;
pub mod retry;
pub mod roster;

pub use asset::{AssetOutcome, AssetPipeline};
pub use error::ScanError;
pub use extractor::{Extractor, PageRecords, StageError, StageResult, StageStatus};
pub use fetcher::{Document, Fetcher};
pub use orchestrator::{CrawlJob, JobEvent, JobState, Orchestrator, ProgressCallback};
pub use proxy::{LiveProxy, ProxyAddress, ProxyPool, ProxySet, ValidationPolicy};
pub use result::{CrawlResults, Fields, ProfileRecord, ResultAggregator};
pub use retry::RetryPolicy;
pub use roster::{ActivePlayer, Organization, RosterScraper};

/// Sent on every request so proxied traffic looks like a desktop browser.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/109.0.0.0 Safari/537.36";
