//! Blocking HTTP shim between the evaluation engine and the monitoring
//! API. Everything here is a thin, swappable collaborator: the engine only
//! sees the traits it defines, and every transport failure is folded into
//! the fixed [`FetchError`](aggmon_common::error::FetchError) taxonomy.

pub mod client;
pub mod error;

pub use client::{ApiClient, ApiConfig, CheckScope};
