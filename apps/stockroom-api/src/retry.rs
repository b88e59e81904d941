//! Bounded retry of engine calls that lost a write race.
//!
//! The engine reports a competing writer as [`DbError::Conflict`] and never
//! retries on its own. Handlers wrap mutating calls in [`with_retry`], which
//! replays the whole operation with exponential backoff until it succeeds,
//! fails for a non-transient reason, or runs out of attempts.

use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use stockroom_db::{DbError, DbResult};
use tracing::{debug, warn};

use crate::config::RetrySettings;

impl RetrySettings {
    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: Duration::from_millis(self.initial_backoff_ms),
            max_interval: Duration::from_millis(self.max_backoff_ms),
            multiplier: 2.0,
            // Bounded by attempts instead
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

/// Runs `op` until it returns something other than a retryable error, at
/// most `settings.max_attempts` times.
///
/// The last error is returned once attempts are exhausted.
pub async fn with_retry<T, F, Fut>(settings: &RetrySettings, operation: &str, mut op: F) -> DbResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = DbResult<T>>,
{
    let mut backoff = settings.backoff();
    let mut attempt = 1;

    loop {
        match op().await {
            Err(err) if err.is_retryable() && attempt < settings.max_attempts => {
                let Some(delay) = backoff.next_backoff() else {
                    return Err(err);
                };
                debug!(
                    operation,
                    attempt,
                    ?delay,
                    error = %err,
                    "Retrying after write conflict"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                if let DbError::Conflict(_) | DbError::PoolExhausted = err {
                    warn!(operation, attempts = attempt, error = %err, "Giving up after conflicts");
                }
                return Err(err);
            }
            Ok(value) => return Ok(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_core::InventoryError;

    fn fast(max_attempts: u32) -> RetrySettings {
        RetrySettings {
            max_attempts,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
        }
    }

    #[tokio::test]
    async fn test_conflicts_are_replayed() {
        let mut calls = 0;
        let result = with_retry(&fast(4), "reserve", || {
            calls += 1;
            let n = calls;
            async move {
                if n < 3 {
                    Err(DbError::Conflict("database is locked".to_string()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_business_errors_are_not_retried() {
        let mut calls = 0;
        let result: DbResult<()> = with_retry(&fast(4), "reserve", || {
            calls += 1;
            async { Err(InventoryError::bad_input("qty must be positive").into()) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_attempts_are_bounded() {
        let mut calls = 0;
        let result: DbResult<()> = with_retry(&fast(3), "receive", || {
            calls += 1;
            async { Err(DbError::PoolExhausted) }
        })
        .await;

        assert!(matches!(result, Err(DbError::PoolExhausted)));
        assert_eq!(calls, 3);
    }
}
