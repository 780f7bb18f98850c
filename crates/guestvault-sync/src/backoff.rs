//! Retry delays for failed syncs

use guestvault_core::SyncConfiguration;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Exponential backoff: `base_delay × multiplier^retry_count`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    /// Delay unit
    pub base_delay: Duration,
    /// Growth factor per failed attempt
    pub multiplier: f64,
    /// Failed attempts after which automatic retries stop
    pub max_attempts: u32,
}

impl BackoffPolicy {
    /// Policy from the sync configuration
    pub fn from_config(config: &SyncConfiguration) -> Self {
        Self {
            base_delay: config.retry_base_delay(),
            multiplier: config.retry_backoff_multiplier,
            max_attempts: config.max_retry_attempts,
        }
    }

    /// Delay before the retry that follows `retry_count` failures
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        let exponent = i32::try_from(retry_count).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// Delay for the next automatic retry, or `None` once attempts run out
    pub fn next_retry(&self, retry_count: u32) -> Option<Duration> {
        (retry_count < self.max_attempts).then(|| self.delay_for(retry_count))
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_config(&SyncConfiguration::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_until_attempts_run_out() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.next_retry(1), Some(Duration::from_secs(2)));
        assert_eq!(policy.next_retry(2), Some(Duration::from_secs(4)));
        assert_eq!(policy.next_retry(3), None);
    }

    #[test]
    fn delays_are_strictly_increasing() {
        let policy = BackoffPolicy {
            base_delay: Duration::from_millis(250),
            multiplier: 1.5,
            max_attempts: 10,
        };
        let delays: Vec<_> = (0..policy.max_attempts)
            .filter_map(|n| policy.next_retry(n))
            .collect();
        assert_eq!(delays.len(), 10);
        assert!(delays.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn huge_exponents_saturate() {
        let policy = BackoffPolicy {
            base_delay: Duration::from_secs(1),
            multiplier: 10.0,
            max_attempts: u32::MAX,
        };
        assert_eq!(policy.delay_for(10_000), Duration::MAX);
    }
}
