//! Bounded retry loop shared by all provider clients.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error_handler::AiLlmError;

/// First backoff delay; doubled after every failed attempt.
pub const BASE_BACKOFF: Duration = Duration::from_millis(500);

/// Upper bound for a single backoff delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(20);

/// Runs `op` once plus up to `max_retries` more times while it fails with a
/// retryable error (see [`AiLlmError::is_retryable`]).
///
/// The delay honors a `Retry-After` hint when the upstream provided one.
pub async fn with_retries<T, F, Fut>(
    label: &str,
    max_retries: u32,
    base: Duration,
    mut op: F,
) -> Result<T, AiLlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AiLlmError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(err) if attempt < max_retries && err.is_retryable() => {
                let delay = backoff_delay(base, attempt, err.retry_after_secs());
                attempt += 1;
                warn!(
                    op = label,
                    attempt,
                    max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying after transient failure"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Exponential delay for `attempt` (0-based), capped at [`MAX_BACKOFF`].
pub fn backoff_delay(base: Duration, attempt: u32, retry_after_secs: Option<u64>) -> Duration {
    if let Some(secs) = retry_after_secs {
        return Duration::from_secs(secs).min(MAX_BACKOFF);
    }
    let factor = 1u32.checked_shl(attempt.min(16)).unwrap_or(u32::MAX);
    base.saturating_mul(factor).min(MAX_BACKOFF)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use reqwest::StatusCode;

    use super::*;
    use crate::config::llm_provider::LlmProvider;
    use crate::error_handler::{HttpError, ProviderError, ProviderErrorKind};

    fn status(code: u16) -> AiLlmError {
        ProviderError::new(
            LlmProvider::OpenAI,
            ProviderErrorKind::HttpStatus(HttpError {
                status: StatusCode::from_u16(code).unwrap(),
                url: "http://localhost/v1/chat/completions".into(),
                snippet: String::new(),
                retry_after_secs: None,
            }),
        )
        .into()
    }

    #[tokio::test]
    async fn transient_failures_are_retried_until_budget_is_spent() {
        let calls = AtomicU32::new(0);
        let res: Result<(), _> = with_retries("test", 2, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(status(503)) }
        })
        .await;

        assert!(res.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn final_failures_are_not_retried() {
        let calls = AtomicU32::new(0);
        let res: Result<(), _> = with_retries("test", 2, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(status(401)) }
        })
        .await;

        assert!(res.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recovers_after_rate_limit() {
        let calls = AtomicU32::new(0);
        let res = with_retries("test", 2, Duration::from_millis(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(status(429))
                } else {
                    Ok("ok")
                }
            }
        })
        .await;

        assert_eq!(res.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn backoff_grows_and_is_capped() {
        let base = Duration::from_millis(500);
        assert_eq!(backoff_delay(base, 0, None), Duration::from_millis(500));
        assert_eq!(backoff_delay(base, 2, None), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, 30, None), MAX_BACKOFF);
        assert_eq!(backoff_delay(base, 0, Some(4)), Duration::from_secs(4));
    }
}
