//! A mutual-exclusion lock coordinated through a shared key-value store.
//!
//! `kvlock` lets independent processes, possibly on different machines, take turns at a critical section by claiming a key in a single shared store such as Redis.
//!
//! ## Getting Started
//! - Create a [`Locker`](locker::Locker) for a [lock store](store), or configure the [process-wide locker](global).
//! - Create a [`StoreLock`](lock::StoreLock) with a name and a time to live (TTL) for each holder.
//! - Acquire the lock with one of the [acquisition strategies](lock), do the protected work, and release the lock.
//!
//! ## Example
//! ```rust,no_run
//! # use std::{sync::Arc, time::Duration};
//! use kvlock::{locker::Locker, store::RedisLockStore};
//!
//! let store = Arc::new(RedisLockStore::new("127.0.0.1:6379", 10)?);
//! let locker = Locker::new(store)?;
//!
//! let lock = locker.new_lock("nightly-report", Duration::from_secs(30))?;
//! if lock.lock_with_timeout(Duration::from_secs(2)) {
//!     // ----- critical section -----
//!     lock.unlock();
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Guarantees
//!  - **Mutual exclusion**: a lock key holds at most one holder token at a time, enforced by the store's atomic set-if-absent.
//!  - **Bounded holding**: an acquired lock expires after its TTL, so a crashed holder blocks others for at most the TTL.
//!  - **Safe release**: a lock is only deleted if it still holds the releasing lock's token.
//!    A holder whose lock expired and was re-acquired by another holder cannot release the new holder's lock.
//!
//! Locks are not renewed, waiters are not ordered, and no fencing tokens are issued.
//! A holder whose work may outlast the TTL must account for losing the lock.
//!
//! ## Crate Features
//! #### Default
//!  - `redis`: the [`RedisLockStore`](store::RedisLockStore) and [`global::configure`].
//!
//! #### Non-Default
//!  - `tests`: lock store conformance functions in `store_test` (for external store development).
//!
//! ## Logging
//! `kvlock` emits [`tracing`] events. Contention is logged at `trace`/`debug` level and store failures at `warn` level.
//!
//! ## Licence
//! `kvlock` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.
//!
//! Unless you explicitly state otherwise, any contribution intentionally submitted for inclusion in the work by you, as defined in the Apache-2.0 license, shall be dual licensed as above, without any additional terms or conditions.

#![warn(unused_variables)]
#![warn(dead_code)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![deny(clippy::missing_panics_doc)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod backoff;
pub mod config;
pub mod global;
pub mod identity;
pub mod lock;
pub mod locker;
pub mod store;
pub mod store_adapter;
