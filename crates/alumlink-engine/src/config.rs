//! Engine configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the engine can start with zero
//! configuration.

use std::time::Duration;

use alumlink_shared::constants::{
    DEFAULT_FEED_PAGE_SIZE, DEFAULT_SNAPSHOT_RETRY_ATTEMPTS, DEFAULT_SNAPSHOT_RETRY_DELAY_MS,
    DEFAULT_SUBSCRIPTION_BUFFER,
};

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Number of posts a feed page holds when the caller does not say.
    /// Env: `ALUMLINK_FEED_PAGE_SIZE`
    /// Default: `20`
    pub feed_page_size: usize,

    /// Delivery queue depth of each live subscription.
    /// Env: `ALUMLINK_SUBSCRIPTION_BUFFER`
    /// Default: `64`
    pub subscription_buffer: usize,

    /// How many times a live query re-runs a failing snapshot before the
    /// subscription is terminated with a `Subscription` error.
    /// Env: `ALUMLINK_SNAPSHOT_RETRY_ATTEMPTS`
    /// Default: `3`
    pub snapshot_retry_attempts: u32,

    /// Delay between snapshot retries.
    /// Env: `ALUMLINK_SNAPSHOT_RETRY_DELAY_MS`
    /// Default: `50`
    pub snapshot_retry_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            feed_page_size: DEFAULT_FEED_PAGE_SIZE,
            subscription_buffer: DEFAULT_SUBSCRIPTION_BUFFER,
            snapshot_retry_attempts: DEFAULT_SNAPSHOT_RETRY_ATTEMPTS,
            snapshot_retry_delay: Duration::from_millis(DEFAULT_SNAPSHOT_RETRY_DELAY_MS),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("ALUMLINK_FEED_PAGE_SIZE") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.feed_page_size = n,
                _ => tracing::warn!(value = %val, "Invalid ALUMLINK_FEED_PAGE_SIZE, using default"),
            }
        }

        if let Ok(val) = std::env::var("ALUMLINK_SUBSCRIPTION_BUFFER") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.subscription_buffer = n,
                _ => {
                    tracing::warn!(value = %val, "Invalid ALUMLINK_SUBSCRIPTION_BUFFER, using default")
                }
            }
        }

        if let Ok(val) = std::env::var("ALUMLINK_SNAPSHOT_RETRY_ATTEMPTS") {
            match val.parse::<u32>() {
                Ok(n) if n > 0 => config.snapshot_retry_attempts = n,
                _ => tracing::warn!(
                    value = %val,
                    "Invalid ALUMLINK_SNAPSHOT_RETRY_ATTEMPTS, using default"
                ),
            }
        }

        if let Ok(val) = std::env::var("ALUMLINK_SNAPSHOT_RETRY_DELAY_MS") {
            match val.parse::<u64>() {
                Ok(ms) => config.snapshot_retry_delay = Duration::from_millis(ms),
                _ => tracing::warn!(
                    value = %val,
                    "Invalid ALUMLINK_SNAPSHOT_RETRY_DELAY_MS, using default"
                ),
            }
        }

        config
    }
}
