use aggmon_common::types::{AggregateCounts, Status};

/// Which quantity the thresholds compare against. Exactly one family is
/// active per invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdFamily {
    /// Thresholds are percentages of `total`, truncated to integers.
    Percent,
    /// Thresholds are raw node counts.
    Count,
}

/// Percentage- or count-based threshold rule over aggregate counts.
///
/// With `merge_severities` set, every non-OK node lands in one bucket
/// (`total - ok`) compared against both thresholds; otherwise the warning
/// and critical buckets are compared independently against their own
/// thresholds.
#[derive(Debug, Clone)]
pub struct ThresholdRule {
    pub family: ThresholdFamily,
    pub warning: Option<u64>,
    pub critical: Option<u64>,
    pub merge_severities: bool,
}

/// A threshold that was met, with the quantity and label used to build
/// the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdBreach {
    pub status: Status,
    /// The computed percentage or count that met the threshold.
    pub amount: u64,
    pub family: ThresholdFamily,
    /// `"non-zero"` in merged mode, the severity name otherwise.
    pub label: &'static str,
}

impl ThresholdRule {
    /// Evaluate against the snapshot counts. Critical is checked before
    /// warning and the first met threshold wins.
    ///
    /// Precondition: `counts.total > 0` (the engine rejects zero-total
    /// snapshots before any rule runs).
    pub fn evaluate(&self, counts: &AggregateCounts) -> Option<ThresholdBreach> {
        if let Some(critical) = self.critical {
            let (amount, label) = self.measure(counts, Status::Critical);
            if amount >= critical {
                return Some(ThresholdBreach {
                    status: Status::Critical,
                    amount,
                    family: self.family,
                    label,
                });
            }
        }

        if let Some(warning) = self.warning {
            let (amount, label) = self.measure(counts, Status::Warning);
            if amount >= warning {
                return Some(ThresholdBreach {
                    status: Status::Warning,
                    amount,
                    family: self.family,
                    label,
                });
            }
        }

        None
    }

    fn measure(&self, counts: &AggregateCounts, severity: Status) -> (u64, &'static str) {
        if self.merge_severities {
            let amount = match self.family {
                ThresholdFamily::Count => counts.non_ok(),
                // Defined as 100 minus the OK percentage, not as the floored
                // non-OK percentage; the two differ by one when the ratio is
                // fractional.
                ThresholdFamily::Percent => 100u64.saturating_sub(percent(counts.ok, counts.total)),
            };
            return (amount, "non-zero");
        }

        let label = match severity {
            Status::Critical => "critical",
            _ => "warning",
        };
        let count = counts.bucket(severity);
        match self.family {
            ThresholdFamily::Count => (count, label),
            ThresholdFamily::Percent => (percent(count, counts.total), label),
        }
    }
}

/// Integer percentage of `count` in `total`, rounded down.
fn percent(count: u64, total: u64) -> u64 {
    debug_assert!(total > 0, "zero-total snapshot reached the threshold evaluator");
    count * 100 / total
}
