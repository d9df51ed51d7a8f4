//! Exponential-backoff retry around one logical operation.
//!
//! The policy is a first-class configuration object. Only transient
//! failures retry; fatal errors return to the caller on the first attempt.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::error::{ClientError, Result};

/// Backoff configuration for one operation.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry following `attempt` (0-based):
    /// `base * 2^attempt`, capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }

    /// No retries at all; write operations use this.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    fn jittered(&self, delay: Duration) -> Duration {
        // +-10% so synchronized clients do not stampede the rate limiter.
        let jitter = rand::thread_rng().gen_range(0.9..1.1);
        delay.mul_f64(jitter)
    }
}

/// Run `operation` under `policy`, retrying transient failures with
/// exponential backoff. Exhausting the ceiling surfaces `RequestFailed`
/// carrying the last cause and `target` (the entity's id or url) for
/// operator diagnosis.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    target: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_transient() => return Err(err),
            Err(err) => {
                attempt += 1;
                if attempt >= policy.max_attempts {
                    return Err(ClientError::RequestFailed {
                        target: target.to_string(),
                        attempts: attempt,
                        source: Box::new(err),
                    });
                }
                let delay = policy.delay_for(attempt - 1);
                warn!(
                    "[Retry] {} failed (attempt {}/{}), retrying in {:?}: {}",
                    target, attempt, policy.max_attempts, delay, err
                );
                tokio::time::sleep(policy.jittered(delay)).await;
            }
        }
    }
}
