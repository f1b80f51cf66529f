use aggmon_api::{ApiClient, ApiConfig};
use aggmon_common::types::{Snapshot, Status};
use aggmon_engine::rules::staleness::StalenessRule;
use aggmon_engine::rules::threshold::{ThresholdFamily, ThresholdRule};
use aggmon_engine::snapshot::{collect_outputs, honor_stash};
use aggmon_engine::{Engine, EngineConfig, EngineError};
use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Evaluate a fleet-wide aggregate of check results and exit with the
/// monitoring convention: 0 OK, 1 WARNING, 2 CRITICAL, 3 UNKNOWN.
#[derive(Debug, Parser)]
#[command(name = "aggmon-check", about = "Aggregate check decision engine")]
struct Cli {
    /// Monitoring API URL
    #[arg(short = 'a', long, env = "AGGMON_API", default_value = "http://localhost:4567")]
    api: String,

    /// API basic-auth user
    #[arg(short = 'u', long)]
    user: Option<String>,

    /// API basic-auth password
    #[arg(short = 'p', long)]
    password: Option<String>,

    /// Skip TLS certificate verification
    #[arg(short = 'k', long)]
    insecure: bool,

    /// API connection timeout in seconds, applied per call
    #[arg(short = 't', long, default_value_t = 30)]
    timeout: u64,

    /// Aggregate check name
    #[arg(short = 'c', long)]
    check: String,

    /// Maximum result age in seconds
    #[arg(short = 'A', long, default_value_t = 30)]
    age: u64,

    /// Percent before warning
    #[arg(short = 'W', long, value_name = "PERCENT")]
    warning: Option<u64>,

    /// Percent before critical
    #[arg(short = 'C', long, value_name = "PERCENT")]
    critical: Option<u64>,

    /// Number of warning nodes before warning
    #[arg(long, value_name = "COUNT")]
    warning_count: Option<u64>,

    /// Number of critical nodes before critical
    #[arg(long, value_name = "COUNT")]
    critical_count: Option<u64>,

    /// Merge all non-OK severities into one bucket before comparing
    #[arg(long)]
    ignore_severity: bool,

    /// Capture-group regex to detect outliers across collected outputs
    #[arg(short = 'P', long)]
    pattern: Option<String>,

    /// Percent of stale results before warning (takes precedence over
    /// --stale-count)
    #[arg(long, value_name = "PERCENT")]
    stale_percent: Option<u64>,

    /// Number of stale results before warning
    #[arg(long, value_name = "COUNT")]
    stale_count: Option<u64>,

    /// Age in seconds beyond which a result is listed as stale in verbose
    /// output
    #[arg(long, value_name = "SECONDS", default_value_t = 86_400)]
    stale_after: u64,

    /// List individual stale results in the message
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Exclude silenced nodes from the aggregate
    #[arg(short = 'i', long)]
    honor_stash: bool,

    /// Append collected non-OK outputs to the message
    #[arg(short = 'o', long)]
    collect_output: bool,

    /// Custom base message for threshold and outlier verdicts
    #[arg(short = 'M', long)]
    message: Option<String>,
}

impl Cli {
    fn build_engine(&self) -> Result<Engine, EngineError> {
        let percent_based = self.warning.is_some() || self.critical.is_some();
        let count_based = self.warning_count.is_some() || self.critical_count.is_some();
        if percent_based && count_based {
            return Err(EngineError::ConflictingThresholds);
        }

        let thresholds = if percent_based {
            Some(ThresholdRule {
                family: ThresholdFamily::Percent,
                warning: self.warning,
                critical: self.critical,
                merge_severities: self.ignore_severity,
            })
        } else if count_based {
            Some(ThresholdRule {
                family: ThresholdFamily::Count,
                warning: self.warning_count,
                critical: self.critical_count,
                merge_severities: self.ignore_severity,
            })
        } else {
            None
        };

        let staleness = if self.stale_percent.is_some() || self.stale_count.is_some() {
            Some(StalenessRule {
                warn_percent: self.stale_percent,
                warn_count: self.stale_count,
                stale_after_secs: self.stale_after,
                verbose: self.verbose,
            })
        } else {
            None
        };

        Engine::new(EngineConfig {
            thresholds,
            pattern: self.pattern.clone(),
            staleness,
            message: self.message.clone(),
            include_outputs: self.collect_output,
        })
    }

    fn no_aggregates_message(&self) -> String {
        format!("No aggregates found in last {} seconds", self.age)
    }
}

fn run(cli: &Cli) -> (Status, String) {
    // Misconfiguration is reported before anything is fetched.
    let engine = match cli.build_engine() {
        Ok(engine) => engine,
        Err(e) => return (Status::Unknown, e.to_string()),
    };

    let api = match ApiClient::new(ApiConfig {
        base_url: cli.api.clone(),
        user: cli.user.clone(),
        password: cli.password.clone(),
        timeout_secs: cli.timeout,
        insecure: cli.insecure,
    }) {
        Ok(api) => api,
        Err(e) => return (Status::Warning, e.to_string()),
    };
    let scope = api.scoped(&cli.check, cli.age);

    // Per-node entries are only needed by the stash filter and the
    // verbose staleness footer.
    let want_entries = cli.honor_stash || cli.verbose;
    let snapshot = match api.fetch_aggregate(&cli.check, cli.age, want_entries) {
        Ok(snapshot) => snapshot,
        Err(e) => return (Status::Warning, e.to_string()),
    };

    if snapshot.counts.total == 0
        || (!snapshot.counts.has_results() && snapshot.counts.stale == 0)
    {
        return (Status::Warning, cli.no_aggregates_message());
    }

    let snapshot = if cli.honor_stash {
        honor_stash(snapshot, &scope)
    } else {
        snapshot
    };

    let snapshot: Snapshot = if cli.collect_output || cli.pattern.is_some() {
        match collect_outputs(snapshot, &scope) {
            Ok(snapshot) => snapshot,
            Err(e) => return (Status::Warning, e.to_string()),
        }
    } else {
        snapshot
    };

    match engine.evaluate(&snapshot, Utc::now()) {
        Ok(verdict) => (verdict.status, verdict.message),
        Err(EngineError::NoData) => (Status::Warning, cli.no_aggregates_message()),
        Err(e) => (Status::Unknown, e.to_string()),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("aggmon=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!(check = %cli.check, api = %cli.api, "aggmon-check starting");
    let (status, message) = run(&cli);
    println!("aggmon-check {}: {}", status.label(), message);
    std::process::exit(status.exit_code());
}
