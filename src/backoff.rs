//! The randomised retry backoff policy.

use std::time::Duration;

use rand::Rng;
use thiserror::Error;

use crate::config::Config;

/// An invalid backoff interval range.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid backoff range: minimum interval {min:?} exceeds maximum interval {max:?}")]
pub struct BackoffError {
    min: Duration,
    max: Duration,
}

/// A randomised backoff policy.
///
/// Intervals are drawn uniformly from `[min, max)` using the thread-local random number generator, so concurrent waiters do not retry in lockstep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    min: Duration,
    max: Duration,
}

impl Backoff {
    /// Create a new backoff policy with intervals in `[min, max)`.
    ///
    /// If `min == max` every interval is `min`.
    ///
    /// # Errors
    /// Returns [`BackoffError`] if `min` exceeds `max`.
    pub fn new(min: Duration, max: Duration) -> Result<Self, BackoffError> {
        if min > max {
            Err(BackoffError { min, max })
        } else {
            Ok(Self { min, max })
        }
    }

    /// Create a backoff policy from the retry intervals in `config`.
    ///
    /// # Errors
    /// Returns [`BackoffError`] if the retry minimum interval exceeds the retry maximum interval.
    pub fn from_config(config: &Config) -> Result<Self, BackoffError> {
        Self::new(config.retry_min_interval(), config.retry_max_interval())
    }

    /// Returns the minimum interval.
    #[must_use]
    pub const fn min(&self) -> Duration {
        self.min
    }

    /// Returns the (exclusive) maximum interval.
    #[must_use]
    pub const fn max(&self) -> Duration {
        self.max
    }

    /// Returns the next interval to sleep before retrying.
    #[must_use]
    pub fn next_interval(&self) -> Duration {
        if self.min == self.max {
            self.min
        } else {
            rand::thread_rng().gen_range(self.min..self.max)
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        let config = Config::default();
        Self {
            min: config.retry_min_interval(),
            max: config.retry_max_interval(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_default() {
        let backoff = Backoff::default();
        assert_eq!(backoff.min(), Duration::from_millis(5));
        assert_eq!(backoff.max(), Duration::from_millis(30));
    }

    #[test]
    fn backoff_range() {
        let backoff = Backoff::new(Duration::from_millis(5), Duration::from_millis(30)).unwrap();
        for _ in 0..1000 {
            let interval = backoff.next_interval();
            assert!(interval >= Duration::from_millis(5));
            assert!(interval < Duration::from_millis(30));
        }
    }

    #[test]
    fn backoff_spread() {
        let backoff = Backoff::new(Duration::ZERO, Duration::from_secs(1)).unwrap();
        let intervals: std::collections::HashSet<_> =
            (0..100).map(|_| backoff.next_interval()).collect();
        assert!(intervals.len() > 1);
    }

    #[test]
    fn backoff_constant() {
        let backoff = Backoff::new(Duration::from_millis(7), Duration::from_millis(7)).unwrap();
        assert_eq!(backoff.next_interval(), Duration::from_millis(7));
    }

    #[test]
    fn backoff_invalid() {
        let err = Backoff::new(Duration::from_millis(30), Duration::from_millis(5)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid backoff range: minimum interval 30ms exceeds maximum interval 5ms"
        );
        let mut config = Config::default();
        config.set_retry_min_interval(Duration::from_secs(1));
        assert!(Backoff::from_config(&config).is_err());
    }
}
