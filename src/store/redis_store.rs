//! A redis lock store.

use std::time::Duration;

use r2d2::{Pool, PooledConnection};
use redis::{Client, ErrorKind, Script};

use crate::identity::HolderToken;

use super::{ttl_millis, LockKey, LockStoreError, LockStoreTraits};

/// The release script, deleting `KEYS[1]` only if it holds `ARGV[1]`.
pub const RELEASE_SCRIPT: &str = r#"
if redis.call("get",KEYS[1]) == ARGV[1] then
    return redis.call("del",KEYS[1])
else
    return 0
end
"#;

/// The longest expiry sent with `SET .. PX`, in milliseconds.
///
/// Redis rejects an expiry that overflows a signed 64-bit millisecond timestamp, so longer times to live are clamped to this.
pub const MAX_TTL_MILLIS: u64 = u64::MAX / 4;

fn redis_ttl_millis(ttl: Duration) -> u64 {
    ttl_millis(ttl).min(MAX_TTL_MILLIS)
}

/// Options for use with [`RedisLockStore`].
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct RedisLockStoreOptions {
    max_connections: u32,
    connection_timeout: Duration,
}

impl Default for RedisLockStoreOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            connection_timeout: Duration::from_secs(5),
        }
    }
}

impl RedisLockStoreOptions {
    /// Set the maximum number of pooled connections (at least one). Defaults to `10`.
    ///
    /// This should reflect the expected number of concurrent lock operations.
    pub fn max_connections(&mut self, max_connections: u32) -> &mut Self {
        self.max_connections = max_connections.max(1);
        self
    }

    /// Set how long to wait for a pooled connection before the store is reported unavailable. Defaults to `5s`.
    pub fn connection_timeout(&mut self, connection_timeout: Duration) -> &mut Self {
        self.connection_timeout = connection_timeout;
        self
    }
}

/// A redis lock store.
///
/// Connections are borrowed from a bounded [`r2d2`] pool for the duration of a single command and returned when dropped.
/// The pool is filled lazily, so creating the store does not contact the server.
///
/// Acquisition maps to `SET key token NX PX ttl`, with `ttl` clamped to [`MAX_TTL_MILLIS`].
/// Release runs [`RELEASE_SCRIPT`] by its SHA-1 (`EVALSHA`), and sends the full script (`EVAL`) if the server does not have it cached.
pub struct RedisLockStore {
    pool: Pool<Client>,
    release_script_sha1: String,
}

impl core::fmt::Debug for RedisLockStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RedisLockStore")
            .field("max_size", &self.pool.max_size())
            .field("release_script_sha1", &self.release_script_sha1)
            .finish_non_exhaustive()
    }
}

impl RedisLockStore {
    /// Create a new redis lock store for the server at `server_address`.
    ///
    /// `server_address` is either `host:port` or a redis connection url (e.g. `redis://127.0.0.1:6379/0`).
    /// `max_idle_connections` bounds the number of pooled connections.
    ///
    /// # Errors
    /// Returns [`LockStoreError::Redis`] if `server_address` is not a valid address.
    pub fn new(server_address: &str, max_idle_connections: u32) -> Result<Self, LockStoreError> {
        let mut options = RedisLockStoreOptions::default();
        options.max_connections(max_idle_connections);
        Self::new_with_options(server_address, &options)
    }

    /// Create a new redis lock store for the server at `server_address` with `options`.
    ///
    /// # Errors
    /// Returns [`LockStoreError::Redis`] if `server_address` is not a valid address.
    pub fn new_with_options(
        server_address: &str,
        options: &RedisLockStoreOptions,
    ) -> Result<Self, LockStoreError> {
        let client = Client::open(Self::connection_url(server_address))?;
        Ok(Self::from_client(client, options))
    }

    /// Create a new redis lock store from a redis [`Client`] with `options`.
    #[must_use]
    pub fn from_client(client: Client, options: &RedisLockStoreOptions) -> Self {
        let pool = Pool::builder()
            .max_size(options.max_connections)
            .min_idle(Some(0))
            .connection_timeout(options.connection_timeout)
            .build_unchecked(client);
        Self {
            pool,
            release_script_sha1: Script::new(RELEASE_SCRIPT).get_hash().to_string(),
        }
    }

    /// Returns the SHA-1 digest of [`RELEASE_SCRIPT`], as used with `EVALSHA`.
    #[must_use]
    pub fn release_script_sha1(&self) -> &str {
        &self.release_script_sha1
    }

    fn connection_url(server_address: &str) -> String {
        if server_address.contains("://") {
            server_address.to_string()
        } else {
            format!("redis://{server_address}")
        }
    }

    fn connection(&self) -> Result<PooledConnection<Client>, LockStoreError> {
        self.pool
            .get()
            .map_err(|err| LockStoreError::Unavailable(err.to_string()))
    }
}

impl LockStoreTraits for RedisLockStore {
    fn acquire_if_absent(
        &self,
        key: &LockKey,
        token: &HolderToken,
        ttl: Duration,
    ) -> Result<bool, LockStoreError> {
        let mut connection = self.connection()?;
        let reply: Option<String> = redis::cmd("SET")
            .arg(key.as_str())
            .arg(token.as_str())
            .arg("NX")
            .arg("PX")
            .arg(redis_ttl_millis(ttl))
            .query(&mut *connection)?;
        Ok(reply.as_deref() == Some("OK"))
    }

    fn release_if_owned(&self, key: &LockKey, token: &HolderToken) -> Result<u64, LockStoreError> {
        let mut connection = self.connection()?;
        let reply: redis::RedisResult<u64> = redis::cmd("EVALSHA")
            .arg(self.release_script_sha1.as_str())
            .arg(1)
            .arg(key.as_str())
            .arg(token.as_str())
            .query(&mut *connection);
        match reply {
            Err(err) if err.kind() == ErrorKind::NoScriptError => {
                tracing::debug!(%key, "release script not cached, sending script body");
                Ok(redis::cmd("EVAL")
                    .arg(RELEASE_SCRIPT)
                    .arg(1)
                    .arg(key.as_str())
                    .arg(token.as_str())
                    .query::<u64>(&mut *connection)?)
            }
            reply => Ok(reply?),
        }
    }

    fn holder(&self, key: &LockKey) -> Result<Option<String>, LockStoreError> {
        let mut connection = self.connection()?;
        Ok(redis::cmd("GET").arg(key.as_str()).query(&mut *connection)?)
    }
}
