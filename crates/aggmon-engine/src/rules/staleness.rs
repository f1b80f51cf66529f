use aggmon_common::types::{humanize_secs, AggregateCounts, ResultEntry};
use chrono::{DateTime, Utc};

/// Staleness rule over the aggregate's stale counter.
///
/// Staleness is always non-critical: too many stale results means the
/// fleet stopped reporting, not that the checked condition failed, so a
/// breach only ever produces a warning. The percentage threshold takes
/// precedence when both are configured.
#[derive(Debug, Clone)]
pub struct StalenessRule {
    pub warn_percent: Option<u64>,
    pub warn_count: Option<u64>,
    /// Age beyond which a per-node entry is listed in the verbose footer.
    pub stale_after_secs: u64,
    /// Append the per-entry footer to breach messages.
    pub verbose: bool,
}

/// A staleness threshold that was met.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleBreach {
    pub stale: u64,
    pub total: u64,
    pub percent: u64,
}

impl StalenessRule {
    pub fn evaluate(&self, counts: &AggregateCounts) -> Option<StaleBreach> {
        let percent = if counts.total > 0 {
            counts.stale * 100 / counts.total
        } else {
            0
        };

        let breached = match (self.warn_percent, self.warn_count) {
            (Some(threshold), _) => percent >= threshold,
            (None, Some(threshold)) => counts.stale >= threshold,
            (None, None) => false,
        };

        breached.then_some(StaleBreach {
            stale: counts.stale,
            total: counts.total,
            percent,
        })
    }

    /// List entries older than the freshness window, one line each with a
    /// humanized age. Empty when entries are absent or nothing is old.
    pub fn footer(&self, entries: &[ResultEntry], now: DateTime<Utc>) -> String {
        let mut lines = String::new();
        for entry in entries {
            let age = (now - entry.issued).num_seconds();
            if age > self.stale_after_secs as i64 {
                lines.push_str(&format!(
                    "\n  - check result {}/{} is stale ({})",
                    entry.client,
                    entry.check,
                    humanize_secs(age)
                ));
            }
        }
        lines
    }
}
