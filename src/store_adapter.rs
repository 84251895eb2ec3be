//! Lock store adapters.
//!
//! Lock store adapters can be layered on [lock stores](crate::store).

pub mod performance_metrics;
pub mod usage_log;
