use crate::core::error::ErrorClass;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Shape of the retry budget and backoff curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    #[serde(rename = "base_delay_seconds", with = "seconds")]
    pub base_delay: Duration,
    #[serde(rename = "max_delay_seconds", with = "seconds")]
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

mod seconds {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

/// Runs fallible async operations with exponential backoff.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Retries an async operation until it succeeds, fails permanently, or
    /// runs out of attempts
    ///
    /// # Parameters
    /// - `operation`: Closure returning a fresh future per attempt
    /// - `classify`: Decides whether an error may be retried
    ///
    /// # Returns
    /// Either the successful result or the last error observed, unchanged
    pub async fn execute<F, Fut, T, E, C>(&self, mut operation: F, classify: C) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        C: Fn(&E) -> ErrorClass,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut delay = self.policy.base_delay.min(self.policy.max_delay);
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(val) => return Ok(val),
                Err(err) => {
                    if classify(&err) == ErrorClass::Permanent {
                        debug!("Attempt {}/{} failed permanently: {}", attempt, max_attempts, err);
                        return Err(err);
                    }
                    if attempt >= max_attempts {
                        debug!("Retry budget exhausted after {} attempts: {}", attempt, err);
                        return Err(err);
                    }
                    debug!(
                        "Attempt {}/{} failed: {}. Retrying in {:?}...",
                        attempt, max_attempts, err, delay
                    );
                    attempt += 1;
                    tokio::time::sleep(delay).await;
                    delay = self.next_delay(delay);
                }
            }
        }
    }

    fn next_delay(&self, delay: Duration) -> Duration {
        delay.saturating_mul(2).min(self.policy.max_delay)
    }
}
