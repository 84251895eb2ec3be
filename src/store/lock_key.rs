use derive_more::Display;
use thiserror::Error;

/// The namespace suffix appended to a lock name to form its [`LockKey`].
pub const LOCK_KEY_SUFFIX: &str = ".rl";

/// The store key of a lock.
///
/// The key of a lock named `name` is `name` followed by [`LOCK_KEY_SUFFIX`], keeping lock keys apart from unrelated keys in a shared store.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
pub struct LockKey(String);

/// An invalid lock name.
#[derive(Debug, Error)]
#[error("invalid lock name {0:?}")]
pub struct LockNameError(String);

impl LockKey {
    /// Create the store key of the lock named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`LockNameError`] if `name` is empty.
    pub fn from_name(name: &str) -> Result<Self, LockNameError> {
        if name.is_empty() {
            Err(LockNameError(name.to_string()))
        } else {
            Ok(Self(format!("{name}{LOCK_KEY_SUFFIX}")))
        }
    }

    /// Extracts a string slice of the underlying key [String].
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the lock name, the key without its namespace suffix.
    #[must_use]
    pub fn name(&self) -> &str {
        self.0.strip_suffix(LOCK_KEY_SUFFIX).unwrap_or(&self.0)
    }
}

impl TryFrom<&str> for LockKey {
    type Error = LockNameError;

    fn try_from(name: &str) -> Result<Self, Self::Error> {
        Self::from_name(name)
    }
}
