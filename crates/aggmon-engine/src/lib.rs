//! Aggregate evaluation engine for fleet-wide check results.
//!
//! Given a [`Snapshot`](aggmon_common::types::Snapshot) of per-severity
//! counts (and optionally per-node entries), the engine applies the
//! configured rules — percentage or count thresholds, regex-based outlier
//! detection, staleness — in a fixed order and yields one verdict plus a
//! human-readable message. Network collaborators enter through the
//! [`SilenceLookup`] and [`DetailSource`] traits; the engine itself never
//! performs I/O.

pub mod engine;
pub mod error;
pub mod rules;
pub mod snapshot;

#[cfg(test)]
mod tests;

pub use engine::{Engine, EngineConfig, Verdict};
pub use error::EngineError;

use aggmon_common::error::FetchError;
use aggmon_common::types::{SeverityDetail, Status};

/// Lookup capability deciding whether a node's result is silenced and
/// should be excluded from the aggregate.
///
/// Implementations map a "no silence marker exists" response to
/// `Ok(false)`; any `Err` is treated conservatively by the caller (the
/// entry is kept).
pub trait SilenceLookup {
    fn is_silenced(&self, client: &str) -> Result<bool, FetchError>;
}

/// Capability fetching per-node result detail for one non-OK severity tier.
pub trait DetailSource {
    fn severity_detail(&self, severity: Status) -> Result<Vec<SeverityDetail>, FetchError>;
}
