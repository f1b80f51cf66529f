use crate::{DetailSource, SilenceLookup};
use aggmon_common::error::FetchError;
use aggmon_common::types::{Snapshot, Status};

/// Severity tiers fetched by the output collector, in message order.
///
/// The order is part of the contract: collected outputs are appended to
/// messages in this sequence so repeated invocations against the same
/// aggregate produce identical text.
pub const DETAIL_ORDER: [Status; 3] = [Status::Warning, Status::Critical, Status::Unknown];

/// Remove silenced entries from a snapshot and rebalance its counts.
///
/// Every removed entry decrements its severity bucket and `total` by one,
/// keeping `entries.len() == total`. A lookup that fails keeps the entry:
/// losing a silence marker must never hide a live node from the counts.
/// Snapshots without per-node entries pass through untouched.
pub fn honor_stash(mut snapshot: Snapshot, lookup: &dyn SilenceLookup) -> Snapshot {
    let Some(entries) = snapshot.entries.take() else {
        return snapshot;
    };

    let mut kept = Vec::with_capacity(entries.len());
    for entry in entries {
        match lookup.is_silenced(&entry.client) {
            Ok(true) => {
                let bucket = snapshot.counts.bucket_mut(entry.status);
                *bucket = bucket.saturating_sub(1);
                snapshot.counts.total = snapshot.counts.total.saturating_sub(1);
                tracing::debug!(client = %entry.client, status = %entry.status, "Entry silenced, excluded from counts");
            }
            Ok(false) => kept.push(entry),
            Err(e) => {
                tracing::debug!(client = %entry.client, error = %e, "Silence lookup failed, keeping entry");
                kept.push(entry);
            }
        }
    }

    snapshot.entries = Some(kept);
    snapshot
}

/// Populate a snapshot's `outputs` (and message summary lines) from its
/// non-OK results.
///
/// When per-node entries are already present they are filtered directly;
/// otherwise detail is fetched one severity tier at a time through
/// `source`, skipping tiers whose count is zero. Fetch failures abort the
/// invocation — a partial output list would make messages (and outlier
/// matching) depend on which fetch happened to fail.
pub fn collect_outputs(snapshot: Snapshot, source: &dyn DetailSource) -> Result<Snapshot, FetchError> {
    let mut snapshot = snapshot;
    snapshot.outputs.clear();
    snapshot.summaries.clear();

    if let Some(entries) = &snapshot.entries {
        for entry in entries.iter().filter(|e| e.status != Status::Ok) {
            snapshot.outputs.push(entry.output.clone());
            snapshot
                .summaries
                .push(format!("{}: {}", entry.client, entry.output));
        }
        return Ok(snapshot);
    }

    for severity in DETAIL_ORDER {
        if snapshot.counts.bucket(severity) == 0 {
            continue;
        }
        let details = source.severity_detail(severity)?;
        for detail in details {
            for summary in detail.summary {
                snapshot.outputs.push(summary.output.clone());
                snapshot.summaries.push(format!(
                    "{} clients {} {}: {}",
                    summary.total,
                    severity,
                    summary.clients.join(", "),
                    summary.output
                ));
            }
        }
    }

    Ok(snapshot)
}
