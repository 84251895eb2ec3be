//! The lock factory.

use std::{sync::Arc, time::Duration};

use crate::{
    backoff::{Backoff, BackoffError},
    config::{global_config, Config},
    identity::{HolderToken, NodeId},
    lock::{StoreLock, StoreLockCreateError},
    store::{LockStore, LockStoreTraits},
};

/// Creates [`StoreLock`]s that coordinate through a shared [`LockStore`].
///
/// A locker bundles everything its locks share: the store, the retry [`Backoff`] policy, and the [`NodeId`] used to generate holder tokens.
/// Lockers are cheap to clone, and independently configured lockers can coexist in one process.
///
/// ### Example
/// ```rust
/// # use std::{sync::Arc, time::Duration};
/// use kvlock::{locker::Locker, store::MemoryLockStore};
///
/// let locker = Locker::new(Arc::new(MemoryLockStore::new()))?;
/// let lock = locker.new_lock("report", Duration::from_secs(30))?;
/// if lock.try_lock() {
///     // ----- critical section -----
///     lock.unlock();
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct Locker {
    store: LockStore,
    backoff: Backoff,
    node_id: NodeId,
}

impl Locker {
    /// Create a new locker with the [global configuration](crate::config::global_config).
    ///
    /// # Errors
    /// Returns a [`BackoffError`] if the global retry interval range is invalid.
    pub fn new(store: LockStore) -> Result<Self, BackoffError> {
        let config = global_config().clone();
        Self::new_with_config(store, &config)
    }

    /// Create a new locker with an explicit `config`.
    ///
    /// # Errors
    /// Returns a [`BackoffError`] if the retry interval range in `config` is invalid.
    pub fn new_with_config(store: LockStore, config: &Config) -> Result<Self, BackoffError> {
        Ok(Self {
            store,
            backoff: Backoff::from_config(config)?,
            node_id: NodeId::local().clone(),
        })
    }

    /// Set the node identifier embedded in the holder tokens of new locks.
    #[must_use]
    pub fn with_node_id(mut self, node_id: NodeId) -> Self {
        self.node_id = node_id;
        self
    }

    /// Set the backoff policy of new locks.
    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Returns the store.
    #[must_use]
    pub fn store(&self) -> &LockStore {
        &self.store
    }

    /// Returns the backoff policy.
    #[must_use]
    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Returns the node identifier.
    #[must_use]
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Create a new lock named `name` with a time to live of `ttl`.
    ///
    /// The lock receives a newly generated holder token. The store is not accessed.
    ///
    /// # Errors
    /// Returns a [`StoreLockCreateError`] if `name` is empty or `ttl` is zero.
    pub fn new_lock(&self, name: &str, ttl: Duration) -> Result<StoreLock, StoreLockCreateError> {
        StoreLock::new(
            self.store.clone(),
            name,
            ttl,
            HolderToken::generate(&self.node_id),
            self.backoff,
        )
    }
}

impl<TStore: LockStoreTraits + 'static> From<Arc<TStore>> for Locker {
    /// Create a locker with the [global configuration](crate::config::global_config).
    ///
    /// If the global retry interval range is invalid, a warning is logged and the default backoff policy is used.
    fn from(store: Arc<TStore>) -> Self {
        let backoff = Backoff::from_config(&global_config()).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "invalid global retry configuration, using the default backoff");
            Backoff::default()
        });
        Self {
            store,
            backoff,
            node_id: NodeId::local().clone(),
        }
    }
}
