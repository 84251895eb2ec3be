#![allow(missing_docs)]
#![cfg(all(feature = "redis", feature = "tests"))]

use std::{error::Error, sync::Arc, time::Duration};

use kvlock::{
    identity::{HolderToken, NodeId},
    locker::Locker,
    store::{LockKey, LockStoreTraits, RedisLockStore},
};

fn redis_server() -> Option<String> {
    let server = std::env::var("KVLOCK_TEST_REDIS").ok();
    if server.is_none() {
        println!("skipping Redis test, KVLOCK_TEST_REDIS is not set");
    }
    server
}

/// Returns a store for the server in `KVLOCK_TEST_REDIS`, or [`None`] if it is unset.
fn redis_store() -> Result<Option<Arc<RedisLockStore>>, Box<dyn Error>> {
    let Some(server) = redis_server() else {
        return Ok(None);
    };
    Ok(Some(Arc::new(RedisLockStore::new(&server, 4)?)))
}

#[test]
fn redis_store_conformance() -> Result<(), Box<dyn Error>> {
    let Some(store) = redis_store()? else {
        return Ok(());
    };
    kvlock::store_test::acquire_release(&*store)?;
    kvlock::store_test::expiry(&*store)?;
    kvlock::store_test::safe_release(&*store)?;
    Ok(())
}

#[test]
fn redis_store_lock() -> Result<(), Box<dyn Error>> {
    let Some(store) = redis_store()? else {
        return Ok(());
    };
    let locker = Locker::from(store.clone());
    let lock_a = locker.new_lock("kvlock_test/redis_store_lock", Duration::from_secs(10))?;
    let lock_b = locker.new_lock("kvlock_test/redis_store_lock", Duration::from_secs(10))?;

    assert!(lock_a.try_lock());
    assert_eq!(store.holder(lock_a.key())?, Some(lock_a.token().to_string()));
    assert!(lock_b
        .acquire_with_timeout(Duration::from_millis(100))
        .is_contended());
    assert!(!lock_b.release().is_released());
    assert!(lock_a.release().is_released());
    assert!(lock_b.lock_with_timeout(Duration::from_secs(1)));
    lock_b.unlock();
    assert!(store.holder(lock_b.key())?.is_none());
    Ok(())
}

#[test]
fn redis_store_release_uncached_script() -> Result<(), Box<dyn Error>> {
    let Some(server) = redis_server() else {
        return Ok(());
    };
    let store = RedisLockStore::new(&server, 1)?;
    let url = if server.contains("://") {
        server
    } else {
        format!("redis://{server}")
    };
    let mut connection = redis::Client::open(url)?.get_connection()?;

    let key: LockKey = "kvlock_test/uncached_script".try_into()?;
    let token = HolderToken::generate(&NodeId::new("redis-test"));
    assert!(store.acquire_if_absent(&key, &token, Duration::from_secs(10))?);

    // EVALSHA fails with NOSCRIPT and the release falls back to EVAL
    redis::cmd("SCRIPT").arg("FLUSH").query::<()>(&mut connection)?;
    let cached: Vec<bool> = redis::cmd("SCRIPT")
        .arg("EXISTS")
        .arg(store.release_script_sha1())
        .query(&mut connection)?;
    assert_eq!(cached, vec![false]);
    assert_eq!(store.release_if_owned(&key, &token)?, 1);
    assert!(store.holder(&key)?.is_none());

    // EVAL loads the script, so later releases use EVALSHA
    let cached: Vec<bool> = redis::cmd("SCRIPT")
        .arg("EXISTS")
        .arg(store.release_script_sha1())
        .query(&mut connection)?;
    assert_eq!(cached, vec![true]);
    assert!(store.acquire_if_absent(&key, &token, Duration::from_secs(10))?);
    assert_eq!(store.release_if_owned(&key, &token)?, 1);
    Ok(())
}

#[test]
fn redis_store_huge_ttl() -> Result<(), Box<dyn Error>> {
    let Some(store) = redis_store()? else {
        return Ok(());
    };
    let key: LockKey = "kvlock_test/huge_ttl".try_into()?;
    let token = HolderToken::generate(&NodeId::new("redis-test"));
    assert!(store.acquire_if_absent(&key, &token, Duration::MAX)?);
    assert_eq!(store.holder(&key)?, Some(token.to_string()));
    assert_eq!(store.release_if_owned(&key, &token)?, 1);
    Ok(())
}
