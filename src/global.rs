//! The process-wide locker.
//!
//! Applications that use a single lock store can configure a process-wide [`Locker`] once at startup with [`configure`] (or [`configure_with`]), and then create locks anywhere with [`new_lock`].
//! Creating a lock before the global locker is configured returns [`StoreLockCreateError::NotConfigured`].
//!
//! The global locker is a convenience layer over [`Locker`], which should be preferred where more than one store (or configuration) is needed, such as in tests.

use std::{sync::OnceLock, time::Duration};

use thiserror::Error;

use crate::{
    backoff::BackoffError,
    lock::{StoreLock, StoreLockCreateError},
    locker::Locker,
    store::LockStoreError,
};

static GLOBAL_LOCKER: OnceLock<Locker> = OnceLock::new();

/// A global locker configuration error.
#[derive(Debug, Error)]
pub enum GlobalLockerError {
    /// The global locker has already been configured.
    #[error("the global locker has already been configured")]
    AlreadyConfigured,
    /// The global retry interval range is invalid.
    #[error(transparent)]
    Backoff(#[from] BackoffError),
    /// The lock store could not be created.
    #[error(transparent)]
    Store(#[from] LockStoreError),
}

/// Configure the global locker with a [`RedisLockStore`](crate::store::RedisLockStore) for the server at `server_address`.
///
/// `max_idle_connections` bounds the connection pool and should reflect the expected number of concurrent lock operations.
/// This must be called once, before any lock is created with [`new_lock`].
///
/// # Errors
/// Returns a [`GlobalLockerError`] if the global locker is already configured, `server_address` is invalid, or the global retry interval range is invalid.
#[cfg(feature = "redis")]
pub fn configure(server_address: &str, max_idle_connections: u32) -> Result<(), GlobalLockerError> {
    if GLOBAL_LOCKER.get().is_some() {
        return Err(GlobalLockerError::AlreadyConfigured);
    }
    let store = crate::store::RedisLockStore::new(server_address, max_idle_connections)?;
    configure_with(Locker::new(std::sync::Arc::new(store))?)
}

/// Configure the global locker with `locker`.
///
/// # Errors
/// Returns [`GlobalLockerError::AlreadyConfigured`] if the global locker is already configured.
pub fn configure_with(locker: Locker) -> Result<(), GlobalLockerError> {
    GLOBAL_LOCKER
        .set(locker)
        .map_err(|_| GlobalLockerError::AlreadyConfigured)?;
    tracing::debug!("global locker configured");
    Ok(())
}

/// Returns the global locker, or [`None`] if it has not been configured.
#[must_use]
pub fn global_locker() -> Option<&'static Locker> {
    GLOBAL_LOCKER.get()
}

/// Create a new lock named `name` with a time to live of `ttl` from the global locker.
///
/// # Errors
/// Returns [`StoreLockCreateError::NotConfigured`] if the global locker has not been configured, or another [`StoreLockCreateError`] if `name` or `ttl` is invalid.
pub fn new_lock(name: &str, ttl: Duration) -> Result<StoreLock, StoreLockCreateError> {
    global_locker()
        .ok_or(StoreLockCreateError::NotConfigured)?
        .new_lock(name, ttl)
}
