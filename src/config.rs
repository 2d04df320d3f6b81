use std::num::NonZeroUsize;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::batch::BatchConfig;
use crate::retries::FixedRetryPolicy;

pub const RETRY_ATTEMPTS_DEFAULT: usize = 5;
pub const RETRY_INITIAL_BACKOFF_DEFAULT: Duration = Duration::from_secs(1);
pub const RETRY_MAX_DURATION_DEFAULT: Duration = Duration::from_secs(60);
pub const RETRY_JITTER_DEFAULT: f64 = 0.2;

/// Settings for outbound batch sends.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RequestConfig {
    /// The maximum number of send attempts per batch, the first attempt
    /// included.
    #[serde(default)]
    pub retry_attempts: Option<usize>,

    /// The delay before the first retry; it doubles after every failed
    /// attempt, with up to ±20% jitter applied.
    #[serde(default, with = "humanize::duration::serde_option")]
    pub retry_initial_backoff: Option<Duration>,

    /// The maximum delay between retries.
    #[serde(default, with = "humanize::duration::serde_option")]
    pub retry_max_duration: Option<Duration>,

    /// How many batch sends may be in flight at once. Unset keeps sends
    /// sequential.
    #[serde(default)]
    pub concurrency: Option<NonZeroUsize>,

    /// Minimum gap between batch dispatches. This is pacing, not retry:
    /// it is off by default and independent of backoff delays.
    #[serde(default, with = "humanize::duration::serde_option")]
    pub throttle: Option<Duration>,
}

impl RequestConfig {
    pub fn settings(&self) -> RequestSettings {
        RequestSettings {
            // a zero budget would mean "never send", clamp it to one try
            retry_attempts: self.retry_attempts.unwrap_or(RETRY_ATTEMPTS_DEFAULT).max(1),
            retry_initial_backoff: self
                .retry_initial_backoff
                .unwrap_or(RETRY_INITIAL_BACKOFF_DEFAULT),
            retry_max_duration: self.retry_max_duration.unwrap_or(RETRY_MAX_DURATION_DEFAULT),
            retry_jitter: RETRY_JITTER_DEFAULT,
            concurrency: self.concurrency.map(NonZeroUsize::get).unwrap_or(1),
            throttle: self.throttle,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RequestSettings {
    pub retry_attempts: usize,
    pub retry_initial_backoff: Duration,
    pub retry_max_duration: Duration,
    pub retry_jitter: f64,
    pub concurrency: usize,
    pub throttle: Option<Duration>,
}

impl RequestSettings {
    pub fn retry_policy(&self) -> FixedRetryPolicy {
        FixedRetryPolicy::new(
            self.retry_attempts,
            self.retry_initial_backoff,
            self.retry_max_duration,
            self.retry_jitter,
        )
    }
}

/// Top-level publisher configuration.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PublisherConfig {
    #[serde(default)]
    pub batch: BatchConfig,

    #[serde(default)]
    pub request: RequestConfig,
}
