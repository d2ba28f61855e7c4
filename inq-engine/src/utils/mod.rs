//! Utility modules for inq-engine

pub mod db_retry;
pub mod key_locks;

pub use db_retry::{retry_on_lock, retry_with_backoff, RetryLimits};
pub use key_locks::KeyLocks;
