//! Lock stores.
//!
//! A lock store is the shared key-value store through which all holders of a lock coordinate.
//! It must provide two operations that are atomic as observed by every client:
//!  - [`acquire_if_absent`](LockStoreTraits::acquire_if_absent): set a key with an expiry only if it does not exist, and
//!  - [`release_if_owned`](LockStoreTraits::release_if_owned): delete a key only if it still holds a given value.
//!
//! The stores include:
//!  - [`RedisLockStore`] (feature `redis`, default): a Redis server accessed through a connection pool.
//!  - [`MemoryLockStore`]: an in-process store, for tests and for coordinating threads within a single process.
//!
//! [Store adapters](crate::store_adapter) can be layered on stores.

mod lock_key;
mod memory_store;
#[cfg(feature = "redis")]
mod redis_store;

use std::{sync::Arc, time::Duration};

use thiserror::Error;

use crate::identity::HolderToken;

pub use lock_key::{LockKey, LockNameError, LOCK_KEY_SUFFIX};
pub use memory_store::MemoryLockStore;
#[cfg(feature = "redis")]
pub use redis_store::{RedisLockStore, RedisLockStoreOptions, MAX_TTL_MILLIS, RELEASE_SCRIPT};

/// [`Arc`] wrapped lock store.
pub type LockStore = Arc<dyn LockStoreTraits>;

/// Traits for a lock store.
///
/// Failing to reach the store is reported as a [`LockStoreError`], which is distinct from the normal outcome of a key being held (`Ok(false)`) or not owned (`Ok(0)`).
pub trait LockStoreTraits: Send + Sync + core::fmt::Debug {
    /// Set `key` to `token` with an expiry of `ttl` if and only if `key` does not exist.
    ///
    /// Returns [`true`] if the value was set.
    ///
    /// # Errors
    /// Returns a [`LockStoreError`] if the store could not be reached or the command failed.
    fn acquire_if_absent(
        &self,
        key: &LockKey,
        token: &HolderToken,
        ttl: Duration,
    ) -> Result<bool, LockStoreError>;

    /// Delete `key` if and only if it currently holds `token`.
    ///
    /// Returns the number of deleted keys: `1` if the key was owned and deleted, otherwise `0`.
    ///
    /// # Errors
    /// Returns a [`LockStoreError`] if the store could not be reached or the command failed.
    fn release_if_owned(&self, key: &LockKey, token: &HolderToken) -> Result<u64, LockStoreError>;

    /// Returns the token currently held at `key`, or [`None`] if the key is absent or has expired.
    ///
    /// This is an inspection aid; the locking protocol never depends on it.
    ///
    /// # Errors
    /// Returns a [`LockStoreError`] if the store could not be reached or the command failed.
    fn holder(&self, key: &LockKey) -> Result<Option<String>, LockStoreError>;
}

/// A lock store error.
#[derive(Debug, Error)]
pub enum LockStoreError {
    /// No connection to the store could be obtained.
    #[error("lock store unavailable: {0}")]
    Unavailable(String),
    /// A redis command failed.
    #[cfg(feature = "redis")]
    #[error(transparent)]
    Redis(#[from] redis::RedisError),
    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl From<&str> for LockStoreError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<String> for LockStoreError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}

/// Convert a lock time to live to whole milliseconds, rounding up.
///
/// Stores with millisecond expiry resolution use this so that a lock never expires earlier than requested.
#[must_use]
pub fn ttl_millis(ttl: Duration) -> u64 {
    let millis = ttl.as_millis() + u128::from(ttl.subsec_nanos() % 1_000_000 != 0);
    u64::try_from(millis).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_to_millis() {
        assert_eq!(ttl_millis(Duration::from_millis(500)), 500);
        assert_eq!(ttl_millis(Duration::from_micros(1500)), 2);
        assert_eq!(ttl_millis(Duration::from_secs(30)), 30_000);
        assert_eq!(ttl_millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn lock_store_error() {
        assert_eq!(
            LockStoreError::Unavailable("no connection".to_string()).to_string(),
            "lock store unavailable: no connection"
        );
        assert_eq!(LockStoreError::from("oops").to_string(), "oops");
    }
}
