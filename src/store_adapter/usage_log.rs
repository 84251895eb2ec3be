//! A lock store adapter which prints function calls.

use std::{io::Write, sync::Arc, time::Duration};

use parking_lot::Mutex;

use crate::{
    identity::HolderToken,
    store::{LockKey, LockStoreError, LockStoreTraits},
};

/// The usage log lock store adapter. Logs lock store method calls.
///
/// It is intended to aid in debugging by revealing lock store access patterns.
/// Failures to write the log are ignored and never affect the result of a store call.
///
/// ### Example (log to stdout)
/// ```rust
/// # use std::sync::Arc;
/// # use parking_lot::Mutex;
/// # use kvlock::store::MemoryLockStore;
/// # use kvlock::store_adapter::usage_log::UsageLogLockStoreAdapter;
/// let store = Arc::new(MemoryLockStore::new());
/// let log_writer = Arc::new(Mutex::new(std::io::stdout()));
/// let store = Arc::new(UsageLogLockStoreAdapter::new(store, log_writer, || {
///     format!("[{:?}] ", std::thread::current().id())
/// }));
/// ```
///
/// Applying lock methods with the above [`UsageLogLockStoreAdapter`] prints outputs like:
/// ```text
/// [ThreadId(2)] acquire_if_absent(job.rl, 10.0.0.1:1718000000000000000:5f0c.., 30000ms) -> Ok(true)
/// [ThreadId(3)] acquire_if_absent(job.rl, 10.0.0.1:1718000000000001000:9a1e.., 30000ms) -> Ok(false)
/// [ThreadId(2)] release_if_owned(job.rl, 10.0.0.1:1718000000000000000:5f0c..) -> Ok(1)
/// ```
pub struct UsageLogLockStoreAdapter<TStore: ?Sized> {
    store: Arc<TStore>,
    handle: Arc<Mutex<dyn Write + Send + Sync>>,
    prefix_func: fn() -> String,
}

impl<TStore: ?Sized> core::fmt::Debug for UsageLogLockStoreAdapter<TStore> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UsageLogLockStoreAdapter")
            .finish_non_exhaustive()
    }
}

impl<TStore: ?Sized> UsageLogLockStoreAdapter<TStore> {
    /// Create a new usage log lock store adapter.
    pub fn new(
        store: Arc<TStore>,
        handle: Arc<Mutex<dyn Write + Send + Sync>>,
        prefix_func: fn() -> String,
    ) -> Self {
        Self {
            store,
            handle,
            prefix_func,
        }
    }
}

impl<TStore: ?Sized + LockStoreTraits> LockStoreTraits for UsageLogLockStoreAdapter<TStore> {
    fn acquire_if_absent(
        &self,
        key: &LockKey,
        token: &HolderToken,
        ttl: Duration,
    ) -> Result<bool, LockStoreError> {
        let result = self.store.acquire_if_absent(key, token, ttl);
        let _ = writeln!(
            self.handle.lock(),
            "{}acquire_if_absent({key}, {token}, {}ms) -> {result:?}",
            (self.prefix_func)(),
            ttl.as_millis()
        );
        result
    }

    fn release_if_owned(&self, key: &LockKey, token: &HolderToken) -> Result<u64, LockStoreError> {
        let result = self.store.release_if_owned(key, token);
        let _ = writeln!(
            self.handle.lock(),
            "{}release_if_owned({key}, {token}) -> {result:?}",
            (self.prefix_func)()
        );
        result
    }

    fn holder(&self, key: &LockKey) -> Result<Option<String>, LockStoreError> {
        let result = self.store.holder(key);
        let _ = writeln!(
            self.handle.lock(),
            "{}holder({key}) -> {result:?}",
            (self.prefix_func)()
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use crate::{identity::NodeId, store::MemoryLockStore};

    use super::*;

    #[test]
    fn usage_log() -> Result<(), Box<dyn Error>> {
        let log = Arc::new(Mutex::new(Vec::<u8>::new()));
        let store = UsageLogLockStoreAdapter::new(
            Arc::new(MemoryLockStore::new()),
            log.clone(),
            || "> ".to_string(),
        );
        let key: LockKey = "log".try_into()?;
        let token = HolderToken::generate(&NodeId::new("n"));
        store.acquire_if_absent(&key, &token, Duration::from_millis(1500))?;
        store.holder(&key)?;
        store.release_if_owned(&key, &token)?;

        let log = String::from_utf8(log.lock().clone())?;
        let lines: Vec<_> = log.lines().collect();
        assert_eq!(
            lines,
            vec![
                format!("> acquire_if_absent(log.rl, {token}, 1500ms) -> Ok(true)"),
                format!("> holder(log.rl) -> Ok(Some({:?}))", token.as_str()),
                format!("> release_if_owned(log.rl, {token}) -> Ok(1)"),
            ]
        );
        assert_eq!(format!("{store:?}"), "UsageLogLockStoreAdapter { .. }");
        Ok(())
    }
}
