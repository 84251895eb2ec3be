//! A lock store adapter which records performance metrics.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use crate::{
    identity::HolderToken,
    store::{LockKey, LockStoreError, LockStoreTraits},
};

/// The performance metrics lock store adapter. Accumulates metrics, such as the number of acquisition attempts and releases.
///
/// It is intended to aid in testing by allowing the application to validate that metrics (e.g. acquisition attempts made by a blocking acquisition) match expected values for specific operations.
#[derive(Debug)]
pub struct PerformanceMetricsLockStoreAdapter<TStore: ?Sized> {
    store: Arc<TStore>,
    acquire_attempts: AtomicUsize,
    acquisitions: AtomicUsize,
    releases: AtomicUsize,
    deletions: AtomicUsize,
    errors: AtomicUsize,
}

impl<TStore: ?Sized> PerformanceMetricsLockStoreAdapter<TStore> {
    /// Create a new performance metrics lock store adapter.
    #[must_use]
    pub fn new(store: Arc<TStore>) -> Self {
        Self {
            store,
            acquire_attempts: AtomicUsize::default(),
            acquisitions: AtomicUsize::default(),
            releases: AtomicUsize::default(),
            deletions: AtomicUsize::default(),
            errors: AtomicUsize::default(),
        }
    }

    /// Returns the number of acquisition attempts.
    pub fn acquire_attempts(&self) -> usize {
        self.acquire_attempts.load(Ordering::Relaxed)
    }

    /// Returns the number of successful acquisitions.
    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::Relaxed)
    }

    /// Returns the number of release requests.
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::Relaxed)
    }

    /// Returns the number of keys deleted by release requests.
    pub fn deletions(&self) -> usize {
        self.deletions.load(Ordering::Relaxed)
    }

    /// Returns the number of requests that failed with a store error.
    pub fn errors(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }

    fn record_error<T>(&self, result: &Result<T, LockStoreError>) {
        if result.is_err() {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl<TStore: ?Sized + LockStoreTraits> LockStoreTraits for PerformanceMetricsLockStoreAdapter<TStore> {
    fn acquire_if_absent(
        &self,
        key: &LockKey,
        token: &HolderToken,
        ttl: Duration,
    ) -> Result<bool, LockStoreError> {
        self.acquire_attempts.fetch_add(1, Ordering::Relaxed);
        let result = self.store.acquire_if_absent(key, token, ttl);
        if let Ok(true) = result {
            self.acquisitions.fetch_add(1, Ordering::Relaxed);
        }
        self.record_error(&result);
        result
    }

    fn release_if_owned(&self, key: &LockKey, token: &HolderToken) -> Result<u64, LockStoreError> {
        self.releases.fetch_add(1, Ordering::Relaxed);
        let result = self.store.release_if_owned(key, token);
        if let Ok(deleted) = result {
            self.deletions
                .fetch_add(usize::try_from(deleted).unwrap_or(usize::MAX), Ordering::Relaxed);
        }
        self.record_error(&result);
        result
    }

    fn holder(&self, key: &LockKey) -> Result<Option<String>, LockStoreError> {
        self.store.holder(key)
    }
}
