use crate::error::{Result, ScanError};
use crate::extractor::extract_image_source;
use crate::fetcher::Document;
use crate::proxy::ProxySet;
use crate::result::ImageAsset;
use crate::retry::{RetryPolicy, retry_async};
use reqwest::StatusCode;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Files at or below this size are error pages or placeholders, not photos.
pub const MIN_IMAGE_BYTES: u64 = 500;
pub const DEFAULT_IMAGE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetOutcome {
    AlreadyPresent(PathBuf),
    Downloaded(ImageAsset),
    NoImage,
}

/// Downloads each player's infobox image once into `image_dir`.
pub struct AssetPipeline {
    image_dir: PathBuf,
    proxies: ProxySet,
    timeout: Duration,
    retry: RetryPolicy,
    min_bytes: u64,
}

impl AssetPipeline {
    pub fn new(image_dir: impl Into<PathBuf>, proxies: ProxySet) -> Self {
        Self {
            image_dir: image_dir.into(),
            proxies,
            timeout: DEFAULT_IMAGE_TIMEOUT,
            retry: RetryPolicy::default(),
            min_bytes: MIN_IMAGE_BYTES,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_min_bytes(mut self, min_bytes: u64) -> Self {
        self.min_bytes = min_bytes;
        self
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    pub fn image_path(&self, name: &str) -> PathBuf {
        self.image_dir.join(format!("{}.png", name.replace(['/', '\\'], "_")))
    }

    pub async fn is_present(&self, path: &Path) -> bool {
        match tokio::fs::metadata(path).await {
            Ok(meta) => meta.is_file() && meta.len() > self.min_bytes,
            Err(_) => false,
        }
    }

    /// Makes sure `<image_dir>/<name>.png` holds the player's photo. A file
    /// that is already there and large enough is never fetched again; a
    /// smaller one is overwritten.
    pub async fn ensure_image(&self, document: &Document, name: &str) -> Result<AssetOutcome> {
        let path = self.image_path(name);
        if self.is_present(&path).await {
            debug!("Image for {} already at {}", name, path.display());
            return Ok(AssetOutcome::AlreadyPresent(path));
        }

        let Some(source) = locate_image(document) else {
            debug!("No image on page for {}", name);
            return Ok(AssetOutcome::NoImage);
        };
        let url = document
            .url()
            .join(&source)
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", source, e)))?;

        tokio::fs::create_dir_all(&self.image_dir).await?;
        let bytes = self.download(&url, &path).await?;
        info!("Saved image for {} ({} bytes)", name, bytes);

        Ok(AssetOutcome::Downloaded(ImageAsset {
            name: name.to_string(),
            source_url: url.to_string(),
            path,
            bytes,
        }))
    }

    async fn download(&self, url: &Url, path: &Path) -> Result<u64> {
        if self.proxies.is_empty() {
            return Err(ScanError::NoLiveProxies);
        }
        retry_async(&self.retry, url.as_str(), move || self.attempt(url, path)).await
    }

    async fn attempt(&self, url: &Url, path: &Path) -> Result<u64> {
        let proxy = self.proxies.choose().ok_or(ScanError::NoLiveProxies)?;
        debug!("Downloading {} via {}", url, proxy.address());

        let response = proxy
            .client()
            .get(url.clone())
            .timeout(self.timeout)
            .send()
            .await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(ScanError::UnexpectedStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        tokio::fs::write(path, &body).await?;
        let size = tokio::fs::metadata(path).await?.len();
        if size <= self.min_bytes {
            return Err(ScanError::AssetTooSmall {
                size,
                min: self.min_bytes,
            });
        }
        Ok(size)
    }
}

fn locate_image(document: &Document) -> Option<String> {
    let html = document.parse();
    extract_image_source(&html)
}
