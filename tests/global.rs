#![allow(missing_docs)]

use std::{error::Error, sync::Arc, time::Duration};

use kvlock::{
    global::{self, GlobalLockerError},
    identity::NodeId,
    lock::StoreLockCreateError,
    locker::Locker,
    store::MemoryLockStore,
};

// The global locker can only be configured once per process, so this is a single test.
#[test]
fn global_locker() -> Result<(), Box<dyn Error>> {
    assert!(global::global_locker().is_none());
    assert!(matches!(
        global::new_lock("global", Duration::from_secs(10)),
        Err(StoreLockCreateError::NotConfigured)
    ));

    let locker = Locker::new(Arc::new(MemoryLockStore::new()))?.with_node_id(NodeId::new("global"));
    global::configure_with(locker)?;
    assert!(matches!(
        global::configure_with(Locker::from(Arc::new(MemoryLockStore::new()))),
        Err(GlobalLockerError::AlreadyConfigured)
    ));
    #[cfg(feature = "redis")]
    assert!(matches!(
        global::configure("127.0.0.1:6379", 4),
        Err(GlobalLockerError::AlreadyConfigured)
    ));

    let lock_a = global::new_lock("global", Duration::from_secs(10))?;
    let lock_b = global::new_lock("global", Duration::from_secs(10))?;
    assert!(lock_a.token().as_str().starts_with("global:"));
    assert!(lock_a.try_lock());
    assert!(!lock_b.try_lock());
    assert!(lock_a.release().is_released());
    assert!(lock_b.try_lock());
    lock_b.unlock();

    assert!(matches!(
        global::new_lock("", Duration::from_secs(10)),
        Err(StoreLockCreateError::InvalidName(_))
    ));
    Ok(())
}
