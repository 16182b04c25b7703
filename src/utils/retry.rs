use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::time::{sleep, Duration};
use tracing::warn;

/// How often a transient upstream failure is retried before it propagates.
///
/// The default performs no retries; callers opt in through configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Number of additional attempts after the first failure
    pub max_retries: u32,
    /// Delay before the first retry; grows linearly with each attempt
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay_ms: 500,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self::default()
    }
}

/// Runs `f` until it succeeds, fails with a non-transient error, or the policy is exhausted.
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, operation: &str, f: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempts = 0;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempts < policy.max_retries => {
                attempts += 1;
                warn!(operation, attempt = attempts, error = %e, "transient failure, retrying");
                sleep(Duration::from_millis(policy.base_delay_ms) * attempts).await;
            }
            Err(e) => return Err(e),
        }
    }
}
