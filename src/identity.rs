//! Lock holder identity.
//!
//! Every [`StoreLock`](crate::lock::StoreLock) writes a [`HolderToken`] as the store value to prove ownership.
//! A token is composed of:
//!  - the [`NodeId`] of the process, derived once from a local network interface,
//!  - a nanosecond timestamp, and
//!  - a random (version 4) UUID.
//!
//! The UUID makes tokens unique even if two are generated on the same node within the same nanosecond.

use std::{
    sync::OnceLock,
    time::{SystemTime, UNIX_EPOCH},
};

use derive_more::{Deref, Display, From};
use if_addrs::Interface;

/// A stable identifier of the local node.
///
/// The identifier may be empty if no network interface could be found.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default, Display, From, Deref)]
pub struct NodeId(String);

impl NodeId {
    /// Create a node identifier from `id`.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier of this process.
    ///
    /// The identifier is the address of the first non-loopback network interface (or the first interface if all are loopback).
    /// It is computed on first use and is fixed for the lifetime of the process.
    /// If the network interfaces cannot be listed, a warning is logged and the identifier is empty.
    #[must_use]
    pub fn local() -> &'static NodeId {
        static LOCAL: OnceLock<NodeId> = OnceLock::new();
        LOCAL.get_or_init(|| match if_addrs::get_if_addrs() {
            Ok(interfaces) => Self::from_interfaces(&interfaces).unwrap_or_else(|| {
                tracing::warn!("no network interface found, using an empty node id");
                NodeId::default()
            }),
            Err(err) => {
                tracing::warn!(error = %err, "failed to list network interfaces, using an empty node id");
                NodeId::default()
            }
        })
    }

    fn from_interfaces(interfaces: &[Interface]) -> Option<Self> {
        interfaces
            .iter()
            .find(|interface| !interface.is_loopback())
            .or_else(|| interfaces.first())
            .map(|interface| Self(interface.ip().to_string()))
    }

    /// Extracts a string slice of the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A lock holder token.
///
/// Tokens are generated once per lock and are never reused.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Display)]
pub struct HolderToken(String);

impl HolderToken {
    /// Generate a new unique token for a lock on the node `node_id`.
    #[must_use]
    pub fn generate(node_id: &NodeId) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_nanos());
        let entropy = uuid::Uuid::new_v4().simple();
        Self(format!("{node_id}:{nanos}:{entropy}"))
    }

    /// Create a token from an existing value, such as one read from a store with [`holder`](crate::store::LockStoreTraits::holder).
    ///
    /// This allows an operator to release a lock held by a crashed holder. Locks must use [generated](HolderToken::generate) tokens.
    #[must_use]
    pub fn from_raw(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Extracts a string slice of the token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for HolderToken {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<String> for HolderToken {
    fn eq(&self, other: &String) -> bool {
        &self.0 == other
    }
}
