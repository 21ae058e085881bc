//! HTTP fetching with exponential backoff retry.
//!
//! - [`Fetch`]: async "give me the body at this URL"
//! - [`HttpFetcher`]: `reqwest` client with a timeout and user agent
//! - [`RetryFetch`]: decorator that retries any [`Fetch`] with backoff and jitter
//!
//! The delay before retry `n` is
//! ```text
//! delay = min(base_delay * 2^(n-1), max_delay) + random_jitter(0..=max_jitter)
//! ```

use crate::error::PipelineError;
use rand::{Rng, rng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, instrument, warn};

/// Fetch settings, the `fetch` section of the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub max_retries: usize,
    pub base_delay_ms: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 3,
            base_delay_ms: 500,
            user_agent: concat!("awful_news_dedup/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

pub trait Fetch {
    /// Body of the resource at `url`.
    async fn fetch(&self, url: &str) -> Result<String, PipelineError>;
}

fn fetch_error(url: &str, reason: impl fmt::Display) -> PipelineError {
    PipelineError::Fetch {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| fetch_error("<client>", e))?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn fetch(&self, url: &str) -> Result<String, PipelineError> {
        let t0 = Instant::now();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| fetch_error(url, e))?;
        let body = response.text().await.map_err(|e| fetch_error(url, e))?;
        tracing::debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched"
        );
        Ok(body)
    }
}

/// Retries the wrapped fetcher on any error.
pub struct RetryFetch<T> {
    inner: T,
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
    max_jitter: Duration,
}

impl<T: Fetch> RetryFetch<T> {
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
            max_jitter: Duration::from_millis(250),
        }
    }

    pub fn with_max_jitter(mut self, max_jitter: Duration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let shift = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX).min(16);
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=self.max_jitter.as_millis() as u64);
        delay + Duration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T: Fetch> Fetch for RetryFetch<T> {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn fetch(&self, url: &str) -> Result<String, PipelineError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                            error = %e,
                            "fetch exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        ?delay,
                        error = %e,
                        "fetch attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// The fetcher collectors use: HTTP with retries, as configured.
pub fn fetcher(config: &FetchConfig) -> Result<RetryFetch<HttpFetcher>, PipelineError> {
    Ok(RetryFetch::new(
        HttpFetcher::new(config)?,
        config.max_retries,
        Duration::from_millis(config.base_delay_ms),
    ))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves canned bodies; fails the first `failures` calls.
    pub(crate) struct StaticFetch {
        pub pages: HashMap<String, String>,
        pub failures: usize,
        pub calls: AtomicUsize,
    }

    impl StaticFetch {
        pub fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(u, b)| (u.to_string(), b.to_string()))
                    .collect(),
                failures: 0,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Fetch for StaticFetch {
        async fn fetch(&self, url: &str) -> Result<String, PipelineError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(fetch_error(url, "connection reset"));
            }
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| fetch_error(url, "404 Not Found"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::StaticFetch;
    use super::*;

    fn flaky(failures: usize) -> StaticFetch {
        StaticFetch {
            failures,
            ..StaticFetch::new(&[("https://example.com/", "ok")])
        }
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_failures() {
        let retry = RetryFetch::new(flaky(2), 3, Duration::from_millis(1))
            .with_max_jitter(Duration::ZERO);
        assert_eq!(retry.fetch("https://example.com/").await.unwrap(), "ok");
        assert_eq!(retry.inner.calls(), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up() {
        let retry = RetryFetch::new(flaky(10), 2, Duration::from_millis(1))
            .with_max_jitter(Duration::ZERO);
        let err = retry.fetch("https://example.com/").await.unwrap_err();
        assert!(matches!(err, PipelineError::Fetch { .. }));
        assert_eq!(retry.inner.calls(), 3);
    }

    #[test]
    fn test_backoff_is_capped() {
        let retry = RetryFetch::new(flaky(0), 10, Duration::from_secs(1))
            .with_max_jitter(Duration::ZERO);
        assert_eq!(retry.backoff(1), Duration::from_secs(1));
        assert_eq!(retry.backoff(3), Duration::from_secs(4));
        assert_eq!(retry.backoff(10), Duration::from_secs(30));
    }
}
