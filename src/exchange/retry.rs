//! Bounded retry with exponential backoff for transient gateway failures

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::BotError;

/// Run `operation` up to `max_attempts` times, doubling the delay after each
/// transient failure. Only [`BotError::GatewayTransient`] is retried; every
/// other error returns immediately. The final error carries the total
/// attempt count.
pub async fn with_backoff<T, F, Fut>(
    label: &str,
    max_attempts: u32,
    initial_delay: Duration,
    mut operation: F,
) -> Result<T, BotError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BotError>>,
{
    let mut delay = initial_delay;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(BotError::GatewayTransient { message, .. }) if attempt < max_attempts => {
                warn!(
                    %label,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    %message,
                    "transient gateway failure, retrying"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(BotError::GatewayTransient { message, .. }) => {
                return Err(BotError::GatewayTransient {
                    attempts: attempt,
                    message,
                });
            }
            Err(other) => return Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient(msg: &str) -> BotError {
        BotError::GatewayTransient {
            attempts: 1,
            message: msg.to_string(),
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = with_backoff("test", 3, Duration::from_millis(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(transient("timeout"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_attempts_reported() {
        let result: Result<(), _> = with_backoff("test", 3, Duration::from_millis(1), || async {
            Err(transient("down"))
        })
        .await;

        match result {
            Err(BotError::GatewayTransient { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected transient error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rejection_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_backoff("test", 5, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(BotError::GatewayRejected("bad symbol".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(BotError::GatewayRejected(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
