/// Errors produced while configuring or running the evaluation engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No rule was enabled at all; the check would always report OK.
    #[error("Misconfiguration: a threshold, count, pattern, or staleness rule must be set")]
    NoRulesConfigured,

    /// Percentage and count threshold families are mutually exclusive.
    #[error("Misconfiguration: percentage and count thresholds cannot be combined")]
    ConflictingThresholds,

    /// The outlier pattern failed to compile.
    #[error("Misconfiguration: invalid outlier pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// The snapshot reported zero total nodes; evaluating thresholds
    /// against it would divide by zero, so it is rejected up front.
    #[error("no data: aggregate reported zero total nodes")]
    NoData,
}

pub type Result<T> = std::result::Result<T, EngineError>;
