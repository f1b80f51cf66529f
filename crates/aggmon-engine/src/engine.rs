use crate::error::EngineError;
use crate::rules::outlier::OutlierRule;
use crate::rules::staleness::StalenessRule;
use crate::rules::threshold::{ThresholdFamily, ThresholdRule};
use aggmon_common::types::{Snapshot, Status};
use chrono::{DateTime, Utc};

const DEFAULT_THRESHOLD_MESSAGE: &str = "Number of non-zero results exceeds threshold";
const DEFAULT_OUTLIER_MESSAGE: &str = "One of these is not like the others!";
const OK_MESSAGE: &str = "Aggregate looks good";

/// Rule configuration for one invocation. At least one rule must be set.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub thresholds: Option<ThresholdRule>,
    /// Single capture-group regex for outlier detection.
    pub pattern: Option<String>,
    pub staleness: Option<StalenessRule>,
    /// Custom base text replacing the default threshold/outlier message.
    pub message: Option<String>,
    /// Append collected output summaries to non-OK messages.
    pub include_outputs: bool,
}

/// The final decision for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub status: Status,
    pub message: String,
}

/// Applies the configured rules to a snapshot in fixed order: thresholds,
/// then outlier detection, then staleness. The first rule to produce a
/// non-OK result ends the evaluation.
#[derive(Debug)]
pub struct Engine {
    thresholds: Option<ThresholdRule>,
    outlier: Option<OutlierRule>,
    staleness: Option<StalenessRule>,
    message: Option<String>,
    include_outputs: bool,
}

impl Engine {
    /// Validate the configuration and compile the outlier pattern.
    ///
    /// Called before any data is fetched so that misconfiguration is
    /// reported without touching the network.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let outlier = config
            .pattern
            .as_deref()
            .map(OutlierRule::new)
            .transpose()?;

        if config.thresholds.is_none() && outlier.is_none() && config.staleness.is_none() {
            return Err(EngineError::NoRulesConfigured);
        }

        Ok(Self {
            thresholds: config.thresholds,
            outlier,
            staleness: config.staleness,
            message: config.message,
            include_outputs: config.include_outputs,
        })
    }

    pub fn evaluate(&self, snapshot: &Snapshot, now: DateTime<Utc>) -> Result<Verdict, EngineError> {
        if snapshot.counts.total == 0 {
            return Err(EngineError::NoData);
        }

        if let Some(rule) = &self.thresholds {
            if let Some(breach) = rule.evaluate(&snapshot.counts) {
                let base = self.message.as_deref().unwrap_or(DEFAULT_THRESHOLD_MESSAGE);
                let unit = match breach.family {
                    ThresholdFamily::Percent => "%",
                    ThresholdFamily::Count => "",
                };
                let mut message =
                    format!("{base} ({}{unit} {})", breach.amount, breach.label);
                self.append_outputs(&mut message, snapshot);
                return Ok(Verdict {
                    status: breach.status,
                    message,
                });
            }
        }

        if let Some(rule) = &self.outlier {
            if let Some(key) = rule.evaluate(&snapshot.outputs) {
                let base = self.message.as_deref().unwrap_or(DEFAULT_OUTLIER_MESSAGE);
                return Ok(Verdict {
                    status: Status::Critical,
                    message: format!("{base} ({key})"),
                });
            }
        }

        if let Some(rule) = &self.staleness {
            if let Some(breach) = rule.evaluate(&snapshot.counts) {
                let mut message = format!(
                    "Found {} stale results out of {} ({}% stale)",
                    breach.stale, breach.total, breach.percent
                );
                self.append_outputs(&mut message, snapshot);
                if rule.verbose {
                    if let Some(entries) = &snapshot.entries {
                        message.push_str(&rule.footer(entries, now));
                    }
                }
                return Ok(Verdict {
                    status: Status::Warning,
                    message,
                });
            }
        }

        Ok(Verdict {
            status: Status::Ok,
            message: OK_MESSAGE.to_string(),
        })
    }

    fn append_outputs(&self, message: &mut String, snapshot: &Snapshot) {
        if !self.include_outputs {
            return;
        }
        for line in &snapshot.summaries {
            message.push('\n');
            message.push_str(line);
        }
    }
}
