use backon::{ExponentialBuilder, Retryable};
use shared_types::{AppError, RetryConfig};
use std::future::Future;
use std::time::Duration;

/// Run a collaborator call with exponential backoff.
///
/// Only errors where [`AppError::is_retryable`] holds are retried; anything
/// else is returned on first sight. `max_attempts` counts the first call.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryConfig,
    operation: &'static str,
    call: F,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let backoff = ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(policy.min_delay_ms))
        .with_max_delay(Duration::from_millis(policy.max_delay_ms))
        .with_max_times(policy.max_attempts.saturating_sub(1));

    call.retry(backoff)
        .when(|err: &AppError| err.is_retryable())
        .notify(|err: &AppError, delay: Duration| {
            tracing::warn!(
                operation = operation,
                error = %err,
                delay_ms = delay.as_millis() as u64,
                "Collaborator call failed, retrying"
            );
        })
        .await
        .inspect_err(|err| {
            tracing::error!(operation = operation, error = %err, "Collaborator call gave up");
        })
}
