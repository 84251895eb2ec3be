//! An in-memory lock store.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use parking_lot::Mutex;

use crate::identity::HolderToken;

use super::{LockKey, LockStoreError, LockStoreTraits};

#[derive(Debug)]
struct Entry {
    token: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// An in-memory lock store.
///
/// Keys expire lazily: an entry past its expiry is treated as absent, and expired entries are removed whenever a key is acquired.
/// All operations on the store are serialised by a single mutex, so they are atomic with respect to each other.
#[derive(Debug, Default)]
pub struct MemoryLockStore {
    entries: Mutex<HashMap<LockKey, Entry>>,
}

impl MemoryLockStore {
    /// Create a new, empty memory lock store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live (unexpired) keys in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        entries.retain(|_, entry| entry.is_live(now));
        entries.len()
    }

    /// Returns true if the store holds no live keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LockStoreTraits for MemoryLockStore {
    fn acquire_if_absent(
        &self,
        key: &LockKey,
        token: &HolderToken,
        ttl: Duration,
    ) -> Result<bool, LockStoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        if entries.get(key).is_some_and(|entry| entry.is_live(now)) {
            return Ok(false);
        }
        // expired keys of other names are swept on every insertion
        entries.retain(|_, entry| entry.is_live(now));
        let expires_at = now
            .checked_add(ttl)
            .unwrap_or_else(|| now + Duration::from_secs(u64::from(u32::MAX)));
        entries.insert(
            key.clone(),
            Entry {
                token: token.as_str().to_string(),
                expires_at,
            },
        );
        Ok(true)
    }

    fn release_if_owned(&self, key: &LockKey, token: &HolderToken) -> Result<u64, LockStoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if !entry.is_live(now) => {
                entries.remove(key);
                Ok(0)
            }
            Some(entry) if token == &entry.token => {
                entries.remove(key);
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    fn holder(&self, key: &LockKey) -> Result<Option<String>, LockStoreError> {
        let now = Instant::now();
        let entries = self.entries.lock();
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.token.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use crate::identity::NodeId;

    use super::*;

    #[test]
    fn memory_store() -> Result<(), Box<dyn Error>> {
        let store = MemoryLockStore::new();
        crate::store_test::acquire_release(&store)?;
        crate::store_test::expiry(&store)?;
        crate::store_test::safe_release(&store)?;
        Ok(())
    }

    #[test]
    fn memory_store_len() -> Result<(), Box<dyn Error>> {
        let store = MemoryLockStore::new();
        assert!(store.is_empty());
        let token = HolderToken::generate(&NodeId::default());
        store.acquire_if_absent(&"a".try_into()?, &token, Duration::from_secs(60))?;
        store.acquire_if_absent(&"b".try_into()?, &token, Duration::from_millis(10))?;
        assert_eq!(store.len(), 2);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(store.len(), 1);
        Ok(())
    }

    #[test]
    fn memory_store_sweeps_expired_keys() -> Result<(), Box<dyn Error>> {
        let store = MemoryLockStore::new();
        let token = HolderToken::generate(&NodeId::default());
        for i in 0..1000 {
            let key: LockKey = format!("expiring_{i}").as_str().try_into()?;
            assert!(store.acquire_if_absent(&key, &token, Duration::from_millis(500))?);
        }
        assert_eq!(store.entries.lock().len(), 1000);
        std::thread::sleep(Duration::from_millis(600));
        store.acquire_if_absent(&"other".try_into()?, &token, Duration::from_secs(60))?;
        assert_eq!(store.entries.lock().len(), 1);
        Ok(())
    }

    #[test]
    fn memory_store_huge_ttl() -> Result<(), Box<dyn Error>> {
        let store = MemoryLockStore::new();
        let token = HolderToken::generate(&NodeId::default());
        assert!(store.acquire_if_absent(&"a".try_into()?, &token, Duration::MAX)?);
        assert_eq!(store.holder(&"a".try_into()?)?, Some(token.to_string()));
        Ok(())
    }
}
