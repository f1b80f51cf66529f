use crate::error::{map_status, map_transport_error};
use aggmon_common::error::FetchError;
use aggmon_common::types::{AggregateCounts, ResultEntry, SeverityDetail, Snapshot, Status};
use aggmon_engine::{DetailSource, SilenceLookup};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

/// Connection settings for the monitoring API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Applied to every call; exceeding it is treated as a connection
    /// failure.
    pub timeout_secs: u64,
    /// Skip TLS certificate verification.
    pub insecure: bool,
}

/// Blocking client for the aggregate, per-severity detail, and silence
/// endpoints. One instance serves the whole invocation; calls are issued
/// sequentially and never retried.
pub struct ApiClient {
    http: reqwest::blocking::Client,
    config: ApiConfig,
}

/// Wire shape of the aggregate endpoint: counts under `results`, per-node
/// entries under `nodes` when detail was requested.
#[derive(Debug, Deserialize)]
struct AggregateResponse {
    results: AggregateCounts,
    nodes: Option<Vec<ResultEntry>>,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Result<Self, FetchError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.insecure)
            .build()
            .map_err(|e| map_transport_error(&e))?;
        Ok(Self { http, config })
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let url = format!("{}{}", self.config.base_url, path);
        let mut request = self.http.get(&url);
        if let Some(user) = &self.config.user {
            request = request.basic_auth(user, self.config.password.as_deref());
        }

        let response = request.send().map_err(|e| map_transport_error(&e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(map_status(status));
        }

        let body = response.text().map_err(|e| map_transport_error(&e))?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::debug!(error = %e, path, "Failed to decode API response");
            FetchError::InvalidPayload
        })
    }

    /// Fetch the aggregate snapshot for one check, restricted to results
    /// no older than `max_age` seconds. `include_results` requests the
    /// per-node entries needed by the stash filter.
    pub fn fetch_aggregate(
        &self,
        check: &str,
        max_age: u64,
        include_results: bool,
    ) -> Result<Snapshot, FetchError> {
        let mut path = format!("/aggregates/{check}?max_age={max_age}");
        if include_results {
            path.push_str("&results=true");
        }
        let response: AggregateResponse = self.get_json(&path)?;
        tracing::debug!(
            check,
            total = response.results.total,
            entries = response.nodes.as_ref().map_or(0, Vec::len),
            "Fetched aggregate"
        );
        Ok(Snapshot {
            counts: response.results,
            entries: response.nodes,
            ..Default::default()
        })
    }

    pub fn fetch_severity_detail(
        &self,
        check: &str,
        severity: Status,
        max_age: u64,
    ) -> Result<Vec<SeverityDetail>, FetchError> {
        self.get_json(&format!(
            "/aggregates/{check}/results/{severity}?max_age={max_age}"
        ))
    }

    /// True when a silence stash exists for this node and check. A 404
    /// means no stash, not a failure.
    pub fn is_silenced(&self, client: &str, check: &str) -> Result<bool, FetchError> {
        match self.get_json::<serde_json::Value>(&format!("/stashes/silence/{client}/{check}")) {
            Ok(_) => Ok(true),
            Err(FetchError::NotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Bind this client to one check name and age window, yielding the
    /// collaborator capabilities the engine consumes.
    pub fn scoped<'a>(&'a self, check: &'a str, max_age: u64) -> CheckScope<'a> {
        CheckScope {
            client: self,
            check,
            max_age,
        }
    }
}

/// An [`ApiClient`] bound to a single check invocation.
pub struct CheckScope<'a> {
    client: &'a ApiClient,
    check: &'a str,
    max_age: u64,
}

impl SilenceLookup for CheckScope<'_> {
    fn is_silenced(&self, client: &str) -> Result<bool, FetchError> {
        self.client.is_silenced(client, self.check)
    }
}

impl DetailSource for CheckScope<'_> {
    fn severity_detail(&self, severity: Status) -> Result<Vec<SeverityDetail>, FetchError> {
        self.client
            .fetch_severity_detail(self.check, severity, self.max_age)
    }
}
