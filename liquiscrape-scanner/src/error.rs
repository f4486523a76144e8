use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unexpected status {status} from {url}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("Page at {0} does not have the expected shape")]
    UnexpectedShape(String),

    #[error("Gave up on {url} after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },

    #[error("No live proxies available")]
    NoLiveProxies,

    #[error("Proxy discovery failed: {0}")]
    ProxyDiscoveryFailed(String),

    #[error("Downloaded asset is too small ({size} bytes, need more than {min})")]
    AssetTooSmall { size: u64, min: u64 },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),

    #[error("Other error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;
