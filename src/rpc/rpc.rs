use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::clock::{QuantaClock, QuantaInstant};
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Jitter, Quota, RateLimiter};
use thiserror::Error;
use url::Url;

use super::types::{BlockResults, BlockResultsResponse};
use super::BlockSource;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("RPC transport error: {0}")]
    Transport(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Malformed response body: {0}")]
    MalformedBody(String),

    #[error("Node returned an error: {0}")]
    Node(String),
}

impl RpcError {
    /// Check if this error is likely transient and worth retrying
    pub fn is_retryable(&self) -> bool {
        match self {
            RpcError::Transport(_) => true,
            // Client errors other than rate limiting will not go away
            RpcError::Status(code) => *code == 429 || (500..600).contains(code),
            // Truncated or garbled bodies come from overloaded nodes
            RpcError::MalformedBody(_) => true,
            RpcError::Node(_) => true,
            RpcError::InvalidUrl(_) => false,
        }
    }
}

/// A height whose block results could not be fetched within the retry budget.
#[derive(Debug, Error)]
#[error("failed to fetch block results at height {height}: {source}")]
pub struct BlockFetchError {
    pub height: u64,
    #[source]
    pub source: RpcError,
}

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 = no retries)
    pub max_retries: u32,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff (e.g., 2.0 doubles delay each retry)
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Retries without sleeping in between.
    #[cfg(test)]
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Calculate the delay for a given attempt number (0-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let delay_ms = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32 - 1);
        let delay = Duration::from_millis(delay_ms as u64);
        std::cmp::min(delay, self.max_delay)
    }
}

/// Execute an async operation with retry logic.
///
/// Every attempt re-runs `operation` from scratch; nothing from a failed
/// attempt is kept.
pub async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, RpcError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RpcError>>,
{
    let mut attempt: u32 = 0;

    loop {
        if attempt > 0 {
            let delay = config.delay_for_attempt(attempt);
            tracing::warn!(
                "RPC retry {}/{} for '{}' in {:?}",
                attempt,
                config.max_retries,
                operation_name,
                delay
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(
                        "RPC '{}' succeeded after {} retries",
                        operation_name,
                        attempt
                    );
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                tracing::warn!(
                    "RPC '{}' failed (attempt {}/{}): {}",
                    operation_name,
                    attempt + 1,
                    config.max_retries + 1,
                    e
                );
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(
                    "RPC '{}' failed after {} attempts: {}",
                    operation_name,
                    attempt + 1,
                    e
                );
                return Err(e);
            }
        }
    }
}

pub type StandardRateLimiter =
    RateLimiter<NotKeyed, InMemoryState, QuantaClock, NoOpMiddleware<QuantaInstant>>;

#[derive(Debug, Clone)]
pub struct RpcClientConfig {
    pub url: Url,
    pub rate_limit: Option<RateLimitConfig>,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub requests_per_second: NonZeroU32,
    pub jitter_min_ms: u64,
    pub jitter_max_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: NonZeroU32::MIN.saturating_add(9),
            jitter_min_ms: 5,
            jitter_max_ms: 50,
        }
    }
}

impl RpcClientConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            rate_limit: None,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_rate_limit(mut self, config: Option<RateLimitConfig>) -> Self {
        self.rate_limit = config;
        self
    }

    pub fn with_retry(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }
}

/// HTTP client for a Tendermint-style node.
pub struct RpcClient {
    http: reqwest::Client,
    block_results_url: Url,
    config: RpcClientConfig,
    rate_limiter: Option<Arc<StandardRateLimiter>>,
    jitter: Option<Jitter>,
}

impl RpcClient {
    pub fn new(config: RpcClientConfig) -> Result<Self, RpcError> {
        let block_results_url = endpoint(&config.url, "block_results")?;

        let (rate_limiter, jitter) = if let Some(ref rate_config) = config.rate_limit {
            let quota = Quota::per_second(rate_config.requests_per_second);
            let limiter = RateLimiter::direct(quota);
            let jitter = Jitter::new(
                Duration::from_millis(rate_config.jitter_min_ms),
                Duration::from_millis(rate_config.jitter_max_ms),
            );
            (Some(Arc::new(limiter)), Some(jitter))
        } else {
            (None, None)
        };

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            block_results_url,
            config,
            rate_limiter,
            jitter,
        })
    }

    pub fn config(&self) -> &RpcClientConfig {
        &self.config
    }

    async fn wait_for_rate_limit(&self) {
        if let (Some(limiter), Some(jitter)) = (&self.rate_limiter, &self.jitter) {
            limiter.until_ready_with_jitter(*jitter).await;
        }
    }

    /// One request/parse round trip, without retries.
    async fn request_block_results(&self, height: u64) -> Result<BlockResults, RpcError> {
        self.wait_for_rate_limit().await;

        let mut url = self.block_results_url.clone();
        url.query_pairs_mut()
            .append_pair("height", &height.to_string());

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        let parsed: BlockResultsResponse =
            serde_json::from_str(&body).map_err(|e| RpcError::MalformedBody(e.to_string()))?;

        match (parsed.result, parsed.error) {
            (Some(result), _) => Ok(result),
            (None, Some(error)) => Err(RpcError::Node(error.to_string())),
            (None, None) => Err(RpcError::MalformedBody(
                "response has neither result nor error".to_string(),
            )),
        }
    }
}

#[async_trait]
impl BlockSource for RpcClient {
    async fn block_results(&self, height: u64) -> Result<BlockResults, BlockFetchError> {
        let op_name = format!("block_results({})", height);
        with_retry(&self.config.retry, &op_name, || {
            self.request_block_results(height)
        })
        .await
        .map_err(|source| BlockFetchError { height, source })
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("config", &self.config)
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish()
    }
}

fn endpoint(base: &Url, method: &str) -> Result<Url, RpcError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| RpcError::InvalidUrl(format!("{} cannot be a base URL", base)))?
        .pop_if_empty()
        .push(method);
    Ok(url)
}
