//! Retry with exponential backoff
//!
//! Two callers share the same backoff loop:
//! - store writes, retried while SQLite reports "database is locked"
//! - registration lookups, retried while the registry reports a transient failure
//!
//! **Backoff Strategy:**
//! - Initial delay: 10ms
//! - Max delay: 1000ms
//! - Multiplier: 2.0 (exponential)

use std::future::Future;
use std::time::{Duration, Instant};
use inq_common::{Error, Result};

const INITIAL_BACKOFF_MS: u64 = 10;
const MAX_BACKOFF_MS: u64 = 1000;

/// Bounds on a retry loop; whichever limit is hit first ends it
#[derive(Debug, Clone, Copy)]
pub struct RetryLimits {
    pub max_attempts: u32,
    pub max_wait: Duration,
}

impl RetryLimits {
    pub fn attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            max_wait: Duration::MAX,
        }
    }

    pub fn deadline(max_wait_ms: u64) -> Self {
        Self {
            max_attempts: u32::MAX,
            max_wait: Duration::from_millis(max_wait_ms),
        }
    }
}

/// Retry `operation` while `is_retryable` accepts its error
///
/// Non-retryable errors are returned immediately. When the limits are
/// exhausted the last error is returned unchanged.
pub async fn retry_with_backoff<F, Fut, T, E, R>(
    operation_name: &str,
    limits: RetryLimits,
    is_retryable: R,
    mut operation: F,
) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    R: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let start_time = Instant::now();
    let mut attempt = 0u32;
    let mut backoff_ms = INITIAL_BACKOFF_MS;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis(),
                        "Operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) => {
                if !is_retryable(&err) {
                    return Err(err);
                }

                let elapsed = start_time.elapsed();
                if attempt >= limits.max_attempts || elapsed >= limits.max_wait {
                    tracing::warn!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = elapsed.as_millis(),
                        error = %err,
                        "Giving up after retries"
                    );
                    return Err(err);
                }

                tracing::debug!(
                    operation = operation_name,
                    attempt,
                    backoff_ms,
                    error = %err,
                    "Retryable failure, backing off"
                );

                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
            }
        }
    }
}

/// True for SQLite busy/lock contention
pub fn is_lock_error(err: &Error) -> bool {
    match err {
        Error::Database(db_err) => db_err.to_string().contains("database is locked"),
        _ => false,
    }
}

/// Retry a store operation until `max_wait_ms` elapses while the database is locked
pub async fn retry_on_lock<F, Fut, T>(operation_name: &str, max_wait_ms: u64, operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    retry_with_backoff(
        operation_name,
        RetryLimits::deadline(max_wait_ms),
        is_lock_error,
        operation,
    )
    .await
}
