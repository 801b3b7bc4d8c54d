//! Retrying invoker for request/response calls.
//!
//! One parameterized invoker replaces the ad hoc retry loops that otherwise
//! accumulate around every call site. Classification is injected per call;
//! only rate limits and transient unavailability are retried, and the
//! server-suggested wait is honored only for rate limits.

use std::fmt::Display;
use std::future::Future;

use tracing::warn;

use crate::backoff::{next_delay, BackoffConfig, JitterSource};
use crate::error::{ClientError, ClientResult};

/// How a failure should be treated by the invoker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Retry; the server may have suggested a wait.
    RateLimited,
    /// Retry with generic backoff.
    Transient,
    /// Propagate immediately.
    Fatal,
}

/// Execute `op` with bounded, jittered retries.
///
/// `classify` maps a failure to a [`RetryClass`]; `retry_after` supplies the
/// structured server hint for rate-limited failures. A `Fatal`
/// classification propagates the error unchanged with zero retries.
/// `config.max_retries = k` allows `k` retries (`k + 1` total attempts);
/// exhaustion propagates the last underlying error unmodified so operators
/// can diagnose the root cause.
pub async fn invoke<T, E, F, Fut, C, H>(
    config: &BackoffConfig,
    jitter: &dyn JitterSource,
    operation: &str,
    op: F,
    classify: C,
    retry_after: H,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> RetryClass,
    H: Fn(&E) -> Option<std::time::Duration>,
    E: Display,
{
    let mut attempt = 0;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                let class = classify(&e);
                if class == RetryClass::Fatal || attempt >= config.max_retries {
                    return Err(e);
                }

                attempt += 1;
                let hint = match class {
                    RetryClass::RateLimited => retry_after(&e),
                    _ => None,
                };
                let delay = next_delay(attempt, config, hint, jitter.draw());

                warn!(
                    operation = %operation,
                    attempt,
                    max_retries = config.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "operation failed, retrying: {}",
                    e
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// [`invoke`] specialized to [`ClientError`], classifying via the error's
/// own retryability.
pub async fn with_retry<T, F, Fut>(
    config: &BackoffConfig,
    jitter: &dyn JitterSource,
    operation: &str,
    op: F,
) -> ClientResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = ClientResult<T>>,
{
    invoke(
        config,
        jitter,
        operation,
        op,
        |e: &ClientError| match e {
            ClientError::RateLimited { .. } => RetryClass::RateLimited,
            e if e.is_retryable() => RetryClass::Transient,
            _ => RetryClass::Fatal,
        },
        |e: &ClientError| e.retry_after(),
    )
    .await
}
