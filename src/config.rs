//! kvlock global configuration options.

use std::{
    sync::{OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

/// Configuration options for lock acquisition.
///
/// A [`Locker`](crate::locker::Locker) takes a copy of a [`Config`] when it is created.
/// The process-wide defaults are retrieved with [`global_config`] and modified with [`global_config_mut`].
/// Changing the global configuration does not affect lockers that have already been created.
///
/// # Retry Configuration Options
///
/// When a blocking acquisition finds the lock held by another holder, it sleeps for a random interval in
/// `[retry_min_interval, retry_max_interval)` before the next attempt.
///
/// ## Retry Minimum Interval
/// > default: `5ms`
///
/// The shortest interval slept between two acquisition attempts.
///
/// ## Retry Maximum Interval
/// > default: `30ms`
///
/// The (exclusive) upper bound of the interval slept between two acquisition attempts.
/// If equal to the [retry minimum interval](#retry-minimum-interval), the interval is constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    retry_min_interval: Duration,
    retry_max_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            retry_min_interval: Duration::from_millis(5),
            retry_max_interval: Duration::from_millis(30),
        }
    }
}

impl Config {
    /// Get the [retry minimum interval](#retry-minimum-interval) configuration.
    #[must_use]
    pub fn retry_min_interval(&self) -> Duration {
        self.retry_min_interval
    }

    /// Set the [retry minimum interval](#retry-minimum-interval) configuration.
    pub fn set_retry_min_interval(&mut self, retry_min_interval: Duration) -> &mut Self {
        self.retry_min_interval = retry_min_interval;
        self
    }

    /// Get the [retry maximum interval](#retry-maximum-interval) configuration.
    #[must_use]
    pub fn retry_max_interval(&self) -> Duration {
        self.retry_max_interval
    }

    /// Set the [retry maximum interval](#retry-maximum-interval) configuration.
    pub fn set_retry_max_interval(&mut self, retry_max_interval: Duration) -> &mut Self {
        self.retry_max_interval = retry_max_interval;
        self
    }
}

static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

/// Returns a reference to the global kvlock configuration.
///
/// # Panics
/// This function panics if the underlying lock has been poisoned and might panic if the global config is already held by the current thread.
pub fn global_config() -> RwLockReadGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .read()
        .unwrap()
}

/// Returns a mutable reference to the global kvlock configuration.
///
/// # Panics
/// This function panics if the underlying lock has been poisoned and might panic if the global config is already held by the current thread.
pub fn global_config_mut() -> RwLockWriteGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .write()
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = Config::default();
        assert_eq!(config.retry_min_interval(), Duration::from_millis(5));
        assert_eq!(config.retry_max_interval(), Duration::from_millis(30));
    }

    #[test]
    fn config_setters() {
        let mut config = Config::default();
        config
            .set_retry_min_interval(Duration::from_millis(1))
            .set_retry_max_interval(Duration::from_millis(2));
        assert_eq!(config.retry_min_interval(), Duration::from_millis(1));
        assert_eq!(config.retry_max_interval(), Duration::from_millis(2));
    }

    #[test]
    fn config_global() {
        let max = global_config().retry_max_interval();
        global_config_mut().set_retry_max_interval(max + Duration::from_millis(1));
        assert_eq!(
            global_config().retry_max_interval(),
            max + Duration::from_millis(1)
        );
        global_config_mut().set_retry_max_interval(max);
    }
}
