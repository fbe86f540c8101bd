use std::num::NonZeroU32;
use std::time::Duration;

use serde::Deserialize;

use crate::rpc::{RateLimitConfig, RetryConfig};

/// Node client settings as they appear in the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RpcSettings {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub requests_per_second: Option<u32>,
}

impl Default for RpcSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
            requests_per_second: None,
        }
    }
}

impl RpcSettings {
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new(self.max_retries)
            .with_initial_delay(Duration::from_millis(self.initial_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
            .with_backoff_multiplier(self.backoff_multiplier)
    }

    pub fn rate_limit(&self) -> Option<RateLimitConfig> {
        self.requests_per_second
            .and_then(NonZeroU32::new)
            .map(|requests_per_second| RateLimitConfig {
                requests_per_second,
                ..Default::default()
            })
    }
}
