use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Check status, ordered from best to worst.
///
/// The discriminants double as the process exit codes expected by the
/// monitoring scheduler.
///
/// # Examples
///
/// ```
/// use aggmon_common::types::Status;
///
/// let status: Status = "warning".parse().unwrap();
/// assert_eq!(status, Status::Warning);
/// assert_eq!(status.exit_code(), 1);
/// assert_eq!(status.to_string(), "warning");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl Status {
    pub fn exit_code(self) -> i32 {
        match self {
            Status::Ok => 0,
            Status::Warning => 1,
            Status::Critical => 2,
            Status::Unknown => 3,
        }
    }

    /// Uppercase label used in the final check output line.
    pub fn label(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Warning => "WARNING",
            Status::Critical => "CRITICAL",
            Status::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Ok => write!(f, "ok"),
            Status::Warning => write!(f, "warning"),
            Status::Critical => write!(f, "critical"),
            Status::Unknown => write!(f, "unknown"),
        }
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ok" => Ok(Status::Ok),
            "warning" => Ok(Status::Warning),
            "critical" => Ok(Status::Critical),
            "unknown" => Ok(Status::Unknown),
            _ => Err(format!("unknown status: {s}")),
        }
    }
}

/// Per-severity counters for one fleet-wide aggregate.
///
/// `total` counts reporting nodes and may exceed the sum of the severity
/// buckets when stale results are tracked separately.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AggregateCounts {
    pub ok: u64,
    pub warning: u64,
    pub critical: u64,
    pub unknown: u64,
    #[serde(default)]
    pub stale: u64,
    pub total: u64,
}

impl AggregateCounts {
    /// Nodes in any non-OK state, used by the merged-severity mode.
    pub fn non_ok(&self) -> u64 {
        self.total.saturating_sub(self.ok)
    }

    /// True when no severity bucket reported anything for the age window.
    pub fn has_results(&self) -> bool {
        self.ok > 0 || self.warning > 0 || self.critical > 0 || self.unknown > 0
    }

    pub fn bucket(&self, status: Status) -> u64 {
        match status {
            Status::Ok => self.ok,
            Status::Warning => self.warning,
            Status::Critical => self.critical,
            Status::Unknown => self.unknown,
        }
    }

    pub fn bucket_mut(&mut self, status: Status) -> &mut u64 {
        match status {
            Status::Ok => &mut self.ok,
            Status::Warning => &mut self.warning,
            Status::Critical => &mut self.critical,
            Status::Unknown => &mut self.unknown,
        }
    }
}

/// One node's result inside an aggregate, present only when per-node
/// detail was requested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultEntry {
    pub client: String,
    pub check: String,
    pub status: Status,
    pub output: String,
    pub issued: DateTime<Utc>,
}

/// An immutable fleet-wide rollup for one named check at a point in time.
///
/// Constructed once per invocation from the API fetch; the stash filter and
/// output collector each return a new consistent snapshot rather than
/// partially updating this one.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub counts: AggregateCounts,
    pub entries: Option<Vec<ResultEntry>>,
    /// Raw output strings of non-OK nodes, in collection order.
    pub outputs: Vec<String>,
    /// Human-readable per-severity summary lines for message construction.
    pub summaries: Vec<String>,
}

/// One detail record returned by the per-severity results endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeverityDetail {
    pub client: String,
    #[serde(default)]
    pub summary: Vec<SeveritySummary>,
}

/// A group of clients sharing one output string at a given severity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeveritySummary {
    pub clients: Vec<String>,
    pub total: u64,
    pub output: String,
}

/// Render an elapsed duration in seconds as a coarse human-readable string.
///
/// # Examples
///
/// ```
/// use aggmon_common::types::humanize_secs;
///
/// assert_eq!(humanize_secs(0), "0 seconds");
/// assert_eq!(humanize_secs(90), "1 minutes 30 seconds");
/// assert_eq!(humanize_secs(86_401), "1 days 0 hours 0 minutes 1 seconds");
/// ```
pub fn humanize_secs(secs: i64) -> String {
    let mut remaining = secs;
    let mut parts: Vec<String> = Vec::new();
    for (count, name) in [(60, "seconds"), (60, "minutes"), (24, "hours"), (1000, "days")] {
        if remaining > 0 {
            let n = remaining % count;
            remaining /= count;
            parts.push(format!("{n} {name}"));
        }
    }
    if parts.is_empty() {
        return "0 seconds".to_string();
    }
    parts.reverse();
    parts.join(" ")
}
