use crate::error::{Result, ScanError};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// How many times a network operation is attempted and how long to wait
/// between attempts.
///
/// `max_attempts: None` retries forever, which is what the scraper did before
/// failed jobs had a terminal state. Keep it for runs against a site that is
/// known to be reachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: Option<u32>,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter_percent: u64,
}

impl RetryPolicy {
    pub fn bounded(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts.max(1)),
            ..Self::default()
        }
    }

    pub fn unbounded() -> Self {
        Self {
            max_attempts: None,
            ..Self::default()
        }
    }

    /// No waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::bounded(max_attempts)
            .with_backoff(Duration::ZERO, Duration::ZERO)
            .with_jitter(0)
    }

    pub fn with_backoff(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self.max_delay = max_delay;
        self
    }

    pub fn with_jitter(mut self, jitter_percent: u64) -> Self {
        self.jitter_percent = jitter_percent;
        self
    }

    /// Whether another attempt may follow `attempts_made` failed ones.
    pub fn allows_retry(&self, attempts_made: u32) -> bool {
        match self.max_attempts {
            Some(max) => attempts_made < max,
            None => true,
        }
    }

    /// Delay before the attempt following `attempts_made` failed ones.
    pub fn delay(&self, attempts_made: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let max_ms = self.max_delay.as_millis() as u64;
        let exponent = attempts_made.saturating_sub(1).min(20);
        let capped = base_ms.saturating_mul(2u64.saturating_pow(exponent)).min(max_ms);
        let jitter = if self.jitter_percent > 0 && capped > 0 {
            rand::thread_rng().gen_range(0..capped * self.jitter_percent / 100 + 1)
        } else {
            0
        };
        Duration::from_millis(capped + jitter)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Some(8),
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(10),
            jitter_percent: 10,
        }
    }
}

/// Runs `operation` until it succeeds or `policy` runs out of attempts.
/// `NoLiveProxies` is returned immediately since retrying cannot fix it.
pub async fn retry_async<T, F, Fut>(policy: &RetryPolicy, target: &str, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(ScanError::NoLiveProxies) => return Err(ScanError::NoLiveProxies),
            Err(e) => e,
        };

        debug!("Attempt {} for {} failed: {}", attempts, target, error);
        if !policy.allows_retry(attempts) {
            return Err(ScanError::RetriesExhausted {
                url: target.to_string(),
                attempts,
                last_error: error.to_string(),
            });
        }

        let delay = policy.delay(attempts);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_growth() {
        let policy = RetryPolicy::bounded(5)
            .with_backoff(Duration::from_millis(100), Duration::from_secs(10))
            .with_jitter(0);
        assert_eq!(policy.delay(1).as_millis(), 100);
        assert_eq!(policy.delay(2).as_millis(), 200);
        assert_eq!(policy.delay(3).as_millis(), 400);
    }

    #[test]
    fn test_max_cap() {
        let policy = RetryPolicy::bounded(5)
            .with_backoff(Duration::from_millis(100), Duration::from_millis(1000))
            .with_jitter(0);
        assert_eq!(policy.delay(12).as_millis(), 1000);
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let policy = RetryPolicy::bounded(5)
            .with_backoff(Duration::from_millis(1000), Duration::from_secs(10))
            .with_jitter(10);
        for _ in 0..50 {
            let delay = policy.delay(1).as_millis();
            assert!((1000..=1100).contains(&delay), "delay {} out of range", delay);
        }
    }

    #[test]
    fn test_bounded_attempts() {
        let policy = RetryPolicy::bounded(3);
        assert!(policy.allows_retry(1));
        assert!(policy.allows_retry(2));
        assert!(!policy.allows_retry(3));
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        assert_eq!(RetryPolicy::bounded(0).max_attempts, Some(1));
    }

    #[test]
    fn test_unbounded_never_gives_up() {
        let policy = RetryPolicy::unbounded();
        assert!(policy.allows_retry(u32::MAX - 1));
    }

    #[test]
    fn test_immediate_has_no_delay() {
        let policy = RetryPolicy::immediate(3);
        assert_eq!(policy.delay(1), Duration::ZERO);
        assert_eq!(policy.delay(7), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_retry_async_stops_on_success() {
        let mut calls = 0;
        let value = retry_async(&RetryPolicy::immediate(5), "job", || {
            calls += 1;
            let current = calls;
            async move {
                if current < 3 {
                    Err(ScanError::Other("not yet".to_string()))
                } else {
                    Ok(current)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 3);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_retry_async_reports_last_error() {
        let err = retry_async(&RetryPolicy::immediate(2), "job", || async {
            Err::<(), _>(ScanError::Other("still broken".to_string()))
        })
        .await
        .unwrap_err();

        match err {
            ScanError::RetriesExhausted { url, attempts, last_error } => {
                assert_eq!(url, "job");
                assert_eq!(attempts, 2);
                assert!(last_error.contains("still broken"));
            }
            other => panic!("expected RetriesExhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_retry_async_does_not_retry_without_proxies() {
        let mut calls = 0;
        let err = retry_async(&RetryPolicy::immediate(5), "job", || {
            calls += 1;
            async { Err::<(), _>(ScanError::NoLiveProxies) }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, ScanError::NoLiveProxies));
        assert_eq!(calls, 1);
    }
}
