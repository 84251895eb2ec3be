//! Store locks, their acquisition strategies and release.
//!
//! A [`StoreLock`] is created by a [`Locker`](crate::locker::Locker) with a name and a time to live (TTL).
//! Every lock generates its own [`HolderToken`] on creation, which it writes to the store to claim the lock.
//!
//! There are three acquisition strategies, which all attempt the same atomic [`acquire_if_absent`](crate::store::LockStoreTraits::acquire_if_absent) store operation:
//!  - [`try_acquire`](StoreLock::try_acquire): a single attempt,
//!  - [`acquire`](StoreLock::acquire): retry until acquired, and
//!  - [`acquire_with_timeout`](StoreLock::acquire_with_timeout): retry until acquired or a deadline passes.
//!
//! The blocking strategies sleep for a random [backoff](crate::backoff::Backoff) interval between attempts.
//! They retry on contention only, and stop as soon as the store reports an error.
//!
//! A lock is [released](StoreLock::release) by deleting its store key only if the key still holds the lock's token.
//! A lock that has expired and been acquired by another holder is therefore never released by its previous holder.

use std::time::{Duration, Instant};

use thiserror::Error;

use crate::{
    backoff::Backoff,
    identity::HolderToken,
    store::{LockKey, LockNameError, LockStore, LockStoreError},
};

/// A store lock creation error.
#[derive(Debug, Error)]
pub enum StoreLockCreateError {
    /// The lock name is invalid.
    #[error(transparent)]
    InvalidName(#[from] LockNameError),
    /// The time to live is zero.
    #[error("invalid lock time to live {0:?}, must be greater than zero")]
    InvalidTtl(Duration),
    /// No global locker has been configured.
    #[error("the global locker has not been configured")]
    NotConfigured,
}

/// The outcome of a lock acquisition.
#[derive(Debug)]
#[must_use]
pub enum AcquireOutcome {
    /// The lock was acquired.
    Acquired,
    /// The lock is held by another holder (or the deadline passed while it was).
    Contended,
    /// The store could not be reached or failed.
    StoreUnavailable(LockStoreError),
}

impl AcquireOutcome {
    /// Returns true if the lock was acquired.
    #[must_use]
    pub const fn is_acquired(&self) -> bool {
        matches!(self, Self::Acquired)
    }

    /// Returns true if the lock is held by another holder.
    #[must_use]
    pub const fn is_contended(&self) -> bool {
        matches!(self, Self::Contended)
    }

    /// Returns the store error, if any.
    #[must_use]
    pub const fn store_error(&self) -> Option<&LockStoreError> {
        match self {
            Self::StoreUnavailable(err) => Some(err),
            Self::Acquired | Self::Contended => None,
        }
    }
}

/// The outcome of a lock release.
#[derive(Debug)]
#[must_use]
pub enum ReleaseOutcome {
    /// The lock was held by this lock's token and has been deleted.
    Released,
    /// The store key does not hold this lock's token, so nothing was deleted.
    ///
    /// The lock was never acquired, was already released, or has expired (and possibly been acquired by another holder).
    NotOwned,
    /// The store could not be reached or failed.
    StoreUnavailable(LockStoreError),
}

impl ReleaseOutcome {
    /// Returns true if the lock was released.
    #[must_use]
    pub const fn is_released(&self) -> bool {
        matches!(self, Self::Released)
    }
}

/// A lock coordinated through a [`LockStore`].
///
/// The token of a lock is fixed on creation.
/// A lock instance belongs to a single logical holder: concurrent callers should each create their own lock with the same name.
#[derive(Debug)]
pub struct StoreLock {
    key: LockKey,
    ttl: Duration,
    token: HolderToken,
    store: LockStore,
    backoff: Backoff,
}

impl StoreLock {
    /// Create a new store lock named `name` with a time to live of `ttl`.
    ///
    /// This does not access the store.
    ///
    /// # Errors
    /// Returns a [`StoreLockCreateError`] if `name` is empty or `ttl` is zero.
    pub fn new(
        store: LockStore,
        name: &str,
        ttl: Duration,
        token: HolderToken,
        backoff: Backoff,
    ) -> Result<Self, StoreLockCreateError> {
        if ttl.is_zero() {
            return Err(StoreLockCreateError::InvalidTtl(ttl));
        }
        Ok(Self {
            key: LockKey::from_name(name)?,
            ttl,
            token,
            store,
            backoff,
        })
    }

    /// Returns the lock name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.key.name()
    }

    /// Returns the store key of the lock.
    #[must_use]
    pub fn key(&self) -> &LockKey {
        &self.key
    }

    /// Returns the time to live of the lock once acquired.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the holder token of the lock.
    #[must_use]
    pub fn token(&self) -> &HolderToken {
        &self.token
    }

    /// Returns the store of the lock.
    #[must_use]
    pub fn store(&self) -> &LockStore {
        &self.store
    }

    /// Attempt to acquire the lock once, without blocking.
    pub fn try_acquire(&self) -> AcquireOutcome {
        match self.store.acquire_if_absent(&self.key, &self.token, self.ttl) {
            Ok(true) => {
                tracing::debug!(key = %self.key, token = %self.token, "lock acquired");
                AcquireOutcome::Acquired
            }
            Ok(false) => {
                tracing::trace!(key = %self.key, "lock contended");
                AcquireOutcome::Contended
            }
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "lock acquisition failed");
                AcquireOutcome::StoreUnavailable(err)
            }
        }
    }

    /// Acquire the lock, blocking the current thread until it is acquired.
    ///
    /// Returns [`AcquireOutcome::StoreUnavailable`] as soon as an attempt fails with a store error.
    pub fn acquire(&self) -> AcquireOutcome {
        loop {
            match self.try_acquire() {
                AcquireOutcome::Contended => std::thread::sleep(self.backoff.next_interval()),
                outcome => return outcome,
            }
        }
    }

    /// Acquire the lock, blocking the current thread until it is acquired or `timeout` has elapsed.
    ///
    /// The deadline is computed when called and is independent of the lock [time to live](StoreLock::ttl).
    /// No attempt is made once the deadline has passed, and sleeps between attempts end at the deadline.
    /// Returns [`AcquireOutcome::Contended`] if the deadline passes, including for a zero `timeout`.
    /// Returns [`AcquireOutcome::StoreUnavailable`] as soon as an attempt fails with a store error.
    pub fn acquire_with_timeout(&self, timeout: Duration) -> AcquireOutcome {
        let start = Instant::now();
        let Some(deadline) = start.checked_add(timeout) else {
            return self.acquire();
        };
        let mut now = start;
        while now < deadline {
            match self.try_acquire() {
                AcquireOutcome::Contended => {}
                outcome => return outcome,
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            std::thread::sleep(self.backoff.next_interval().min(remaining));
            now = Instant::now();
        }
        tracing::debug!(key = %self.key, ?timeout, "lock acquisition timed out");
        AcquireOutcome::Contended
    }

    /// Attempt to acquire the lock once, without blocking.
    ///
    /// Returns true if the lock was acquired.
    /// Contention and store errors both return false; use [`try_acquire`](StoreLock::try_acquire) to distinguish them.
    #[must_use]
    pub fn try_lock(&self) -> bool {
        self.try_acquire().is_acquired()
    }

    /// Acquire the lock, blocking until it is acquired.
    ///
    /// Returns false only if the store failed; use [`acquire`](StoreLock::acquire) for the error.
    #[must_use]
    pub fn lock(&self) -> bool {
        self.acquire().is_acquired()
    }

    /// Acquire the lock, blocking until it is acquired or `timeout` has elapsed.
    ///
    /// Returns true if the lock was acquired.
    #[must_use]
    pub fn lock_with_timeout(&self, timeout: Duration) -> bool {
        self.acquire_with_timeout(timeout).is_acquired()
    }

    /// Acquire the lock and return a guard which releases it when dropped.
    ///
    /// Blocks until the lock is acquired, or until `timeout` has elapsed if it is [`Some`].
    ///
    /// # Errors
    /// Returns the [`AcquireOutcome`] if the lock was not acquired.
    pub fn acquire_guard(
        &self,
        timeout: Option<Duration>,
    ) -> Result<StoreLockGuard<'_>, AcquireOutcome> {
        let outcome = match timeout {
            Some(timeout) => self.acquire_with_timeout(timeout),
            None => self.acquire(),
        };
        if outcome.is_acquired() {
            Ok(StoreLockGuard {
                lock: self,
                released: false,
            })
        } else {
            Err(outcome)
        }
    }

    /// Release the lock if it is still held by this lock's token.
    ///
    /// Releasing a lock that is not held (never acquired, already released, or expired) deletes nothing and returns [`ReleaseOutcome::NotOwned`].
    pub fn release(&self) -> ReleaseOutcome {
        match self.store.release_if_owned(&self.key, &self.token) {
            Ok(0) => {
                tracing::debug!(key = %self.key, token = %self.token, "lock not owned on release");
                ReleaseOutcome::NotOwned
            }
            Ok(_) => {
                tracing::debug!(key = %self.key, token = %self.token, "lock released");
                ReleaseOutcome::Released
            }
            Err(err) => {
                tracing::warn!(
                    key = %self.key,
                    error = %err,
                    "lock release failed, it will expire after its time to live"
                );
                ReleaseOutcome::StoreUnavailable(err)
            }
        }
    }

    /// Release the lock if it is still held by this lock's token, ignoring the outcome.
    ///
    /// Store errors are logged. An unreleased lock expires after its time to live.
    pub fn unlock(&self) {
        let _ = self.release();
    }
}

/// A guard which releases a [`StoreLock`] when dropped.
#[derive(Debug)]
#[must_use = "if unused the lock is released immediately"]
pub struct StoreLockGuard<'a> {
    lock: &'a StoreLock,
    released: bool,
}

impl StoreLockGuard<'_> {
    /// Returns the guarded lock.
    #[must_use]
    pub fn lock(&self) -> &StoreLock {
        self.lock
    }

    /// Release the lock now and return the outcome.
    pub fn release(mut self) -> ReleaseOutcome {
        self.released = true;
        self.lock.release()
    }
}

impl Drop for StoreLockGuard<'_> {
    fn drop(&mut self) {
        if !self.released {
            self.lock.unlock();
        }
    }
}
