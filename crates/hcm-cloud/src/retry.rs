//! Caller-level retry for whole cloud operations
//!
//! The poller never retries on its own: a transport error aborts the loop and
//! is returned to the caller. Callers that want another attempt wrap the whole
//! orchestration in [`retry_with_policy`].

use crate::error::{CloudError, Result};
use crate::kit::Kit;
use std::future::Future;
use std::time::Duration;

/// Retry configuration for caller-level re-invocation
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,

    /// Delay before the second attempt
    pub initial_delay: Duration,

    /// Maximum delay between attempts
    pub max_delay: Duration,

    /// Backoff multiplier
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Never retry
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Delay after the given zero-based failed attempt
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(attempt.min(64) as i32);
        let millis = (self.initial_delay.as_millis() as f64 * factor)
            .min(self.max_delay.as_millis() as f64);
        Duration::from_millis(millis as u64)
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error or attempts
/// run out. The backoff sleep is interrupted by cancellation.
pub async fn retry_with_policy<T, F, Fut>(kt: &Kit, config: &RetryConfig, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt + 1 < max_attempts => {
                let delay = config.delay_for_attempt(attempt);
                tracing::warn!(
                    rid = kt.rid(),
                    attempt = attempt + 1,
                    max_attempts,
                    ?delay,
                    error = %err,
                    "retryable cloud error, retrying"
                );
                tokio::select! {
                    biased;
                    _ = kt.cancelled() => {
                        return Err(CloudError::Cancelled(format!(
                            "retry cancelled, rid: {}",
                            kt.rid()
                        )));
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
