//! Retry of transactions that fail for transient reasons.
//!
//! PostgreSQL reports serialization failures (`40001`) and detected
//! deadlocks (`40P01`) when concurrent transactions collide. Both are safe
//! to retry from the start of the transaction.

use std::future::Future;
use std::time::Duration;

/// Total attempts including the first.
pub const MAX_ATTEMPTS: u32 = 3;

/// Delay before the first retry; doubles on each further retry.
pub const BASE_BACKOFF: Duration = Duration::from_millis(50);

const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

/// Errors that can tell whether retrying the whole operation may succeed.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for sqlx::Error {
    fn is_transient(&self) -> bool {
        match self {
            sqlx::Error::Database(db_err) => matches!(
                db_err.code().as_deref(),
                Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED)
            ),
            _ => false,
        }
    }
}

/// Backoff before retry number `retry` (1-based).
pub fn backoff_for(retry: u32) -> Duration {
    BASE_BACKOFF * 2u32.saturating_pow(retry.saturating_sub(1))
}

/// Run `op` until it succeeds, fails with a non-transient error, or
/// [`MAX_ATTEMPTS`] is reached. `op` must start a fresh transaction on
/// every call.
pub async fn with_retry<T, E, F, Fut>(mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Transient,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(err) if err.is_transient() && attempt < MAX_ATTEMPTS => {
                let delay = backoff_for(attempt);
                tracing::warn!(attempt, delay_ms = delay.as_millis() as u64, "Transient database error, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[derive(Debug, PartialEq)]
    enum FakeError {
        Transient,
        Fatal,
    }

    impl Transient for FakeError {
        fn is_transient(&self) -> bool {
            matches!(self, FakeError::Transient)
        }
    }

    #[test]
    fn backoff_doubles() {
        assert_eq!(backoff_for(1), Duration::from_millis(50));
        assert_eq!(backoff_for(2), Duration::from_millis(100));
        assert_eq!(backoff_for(3), Duration::from_millis(200));
    }

    #[tokio::test]
    async fn transient_errors_retry_until_success() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, FakeError> = with_retry(|| async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(FakeError::Transient)
            } else {
                Ok(n)
            }
        })
        .await;
        assert_eq!(result, Ok(3));
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), FakeError> = with_retry(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(FakeError::Transient)
        })
        .await;
        assert_eq!(result, Err(FakeError::Transient));
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn fatal_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), FakeError> = with_retry(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(FakeError::Fatal)
        })
        .await;
        assert_eq!(result, Err(FakeError::Fatal));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
