use crate::error::ConferenceError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backoff schedule for transactions that lose an optimistic commit race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            initial_backoff_ms: 2,
            max_backoff_ms: 100,
        }
    }
}

impl RetryPolicy {
    /// Single attempt; contention surfaces immediately.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before attempt `attempt + 1`, doubling from the initial backoff
    /// and capped at the maximum.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        let millis = self
            .initial_backoff_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_backoff_ms);
        Duration::from_millis(millis)
    }
}

/// Runtime configuration for a conference service instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConferenceConfig {
    pub retry: RetryPolicy,
    /// Conferences with `0 < seatsAvailable <= threshold` are announced as
    /// nearly sold out.
    pub announcement_seat_threshold: i64,
    pub announcement_refresh_interval_ms: u64,
    pub default_city: String,
    pub default_topics: Vec<String>,
}

impl Default for ConferenceConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            announcement_seat_threshold: 5,
            announcement_refresh_interval_ms: 60 * 60 * 1000,
            default_city: "Default City".to_string(),
            default_topics: vec!["Default".to_string(), "Topic".to_string()],
        }
    }
}

impl ConferenceConfig {
    pub fn production() -> Self {
        Self {
            retry: RetryPolicy {
                max_attempts: 10,
                initial_backoff_ms: 5,
                max_backoff_ms: 250,
            },
            ..Self::default()
        }
    }

    /// Fast retries and a short refresh cadence for local runs and tests.
    pub fn development() -> Self {
        Self {
            retry: RetryPolicy {
                max_attempts: 16,
                initial_backoff_ms: 1,
                max_backoff_ms: 10,
            },
            announcement_refresh_interval_ms: 1_000,
            ..Self::default()
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConferenceError> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|e| ConferenceError::invalid(format!("config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConferenceError> {
        if self.retry.max_attempts == 0 {
            return Err(ConferenceError::invalid(
                "config: retry.max_attempts must be at least 1",
            ));
        }
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(ConferenceError::invalid(
                "config: retry.initial_backoff_ms exceeds retry.max_backoff_ms",
            ));
        }
        if self.announcement_seat_threshold < 0 {
            return Err(ConferenceError::invalid(
                "config: announcement_seat_threshold must not be negative",
            ));
        }
        if self.announcement_refresh_interval_ms == 0 {
            return Err(ConferenceError::invalid(
                "config: announcement_refresh_interval_ms must be positive",
            ));
        }
        Ok(())
    }

    pub fn announcement_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.announcement_refresh_interval_ms)
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_announcement_seat_threshold(mut self, threshold: i64) -> Self {
        self.announcement_seat_threshold = threshold;
        self
    }

    pub fn with_announcement_refresh_interval_ms(mut self, interval_ms: u64) -> Self {
        self.announcement_refresh_interval_ms = interval_ms;
        self
    }

    pub fn with_default_city(mut self, city: impl Into<String>) -> Self {
        self.default_city = city.into();
        self
    }

    pub fn with_default_topics(mut self, topics: Vec<String>) -> Self {
        self.default_topics = topics;
        self
    }
}
