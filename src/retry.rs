//! Bounded exponential-backoff executor for provider calls.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ErrorRecord;
use crate::metrics::MetricsLedger;

/// Retry policy for one provider connection.
///
/// Total attempts = `max_retries + 1`. The wait before retry `n`
/// (zero-based) is `base_delay_ms * 2^n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
        }
    }
}

impl RetryPolicy {
    /// Backoff delay before the retry with the given zero-based index.
    pub fn backoff(&self, attempt: u32) -> Duration {
        // Shift capped so pathological retry counts cannot overflow.
        let factor = 1u64 << attempt.min(16);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }
}

/// Ledger hookup for one retried call site.
pub struct RetryContext<'a> {
    pub metrics: &'a MetricsLedger,
    pub provider: &'a str,
    pub operation: &'a str,
}

/// Run `op` until it succeeds, the error is not retryable, or retries are
/// exhausted.
///
/// `op` must yield an already classified [`ErrorRecord`] on failure; the
/// decision to retry is taken from [`ErrorRecord::is_retryable`]. The final
/// classified error is propagated unchanged. Each wait increments the
/// ledger's retry counter when a [`RetryContext`] is supplied.
pub async fn retry_request<T, F, Fut>(
    policy: RetryPolicy,
    context: Option<RetryContext<'_>>,
    mut op: F,
) -> Result<T, ErrorRecord>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ErrorRecord>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if attempt >= policy.max_retries || !error.is_retryable() {
                    return Err(error);
                }

                let delay = policy.backoff(attempt);
                if let Some(ctx) = &context {
                    ctx.metrics.record_retry(ctx.provider, ctx.operation);
                    debug!(
                        provider = ctx.provider,
                        operation = ctx.operation,
                        code = %error.code,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "retrying after transient failure"
                    );
                } else {
                    debug!(
                        code = %error.code,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "retrying after transient failure"
                    );
                }

                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
