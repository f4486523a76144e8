use crate::error::{Result, ScanError};
use crate::proxy::ProxySet;
use crate::retry::{RetryPolicy, retry_async};
use reqwest::StatusCode;
use scraper::Html;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_PAGE_TIMEOUT: Duration = Duration::from_secs(10);

/// A fetched page. The parsed tree is built on demand because it cannot be
/// held across an await point.
#[derive(Debug, Clone)]
pub struct Document {
    url: Url,
    body: Arc<str>,
}

impl Document {
    pub fn new(url: Url, body: impl Into<Arc<str>>) -> Self {
        Self {
            url,
            body: body.into(),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn parse(&self) -> Html {
        Html::parse_document(&self.body)
    }
}

/// GETs pages through a random live proxy per attempt.
pub struct Fetcher {
    proxies: ProxySet,
    timeout: Duration,
    retry: RetryPolicy,
}

impl Fetcher {
    pub fn new(proxies: ProxySet) -> Self {
        Self {
            proxies,
            timeout: DEFAULT_PAGE_TIMEOUT,
            retry: RetryPolicy::default(),
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

    pub fn proxies(&self) -> &ProxySet {
        &self.proxies
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub async fn fetch(&self, url: &str) -> Result<Document> {
        let (document, ()) = self.fetch_until(url, |_| Some(())).await?;
        Ok(document)
    }

    /// Fetches `url` until `accept` recognizes the page or the retry budget
    /// runs out. A page that loads but is rejected by `accept` costs an
    /// attempt like any network failure.
    pub async fn fetch_until<T, F>(&self, url: &str, accept: F) -> Result<(Document, T)>
    where
        F: Fn(&Document) -> Option<T>,
    {
        let target = Url::parse(url).map_err(|e| ScanError::InvalidUrl(format!("{}: {}", url, e)))?;
        if self.proxies.is_empty() {
            return Err(ScanError::NoLiveProxies);
        }

        let target = &target;
        let accept = &accept;
        retry_async(&self.retry, url, move || async move {
            let document = self.attempt(target).await?;
            match accept(&document) {
                Some(value) => Ok((document, value)),
                None => Err(ScanError::UnexpectedShape(target.to_string())),
            }
        })
        .await
    }

    async fn attempt(&self, target: &Url) -> Result<Document> {
        let proxy = self.proxies.choose().ok_or(ScanError::NoLiveProxies)?;
        debug!("Fetching {} via {}", target, proxy.address());

        let response = proxy
            .client()
            .get(target.clone())
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ScanError::UnexpectedStatus {
                url: target.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let body = response.text().await?;
        Ok(Document::new(final_url, body))
    }
}
