pub mod outlier;
pub mod staleness;
pub mod threshold;
