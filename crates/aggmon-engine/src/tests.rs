use crate::engine::{Engine, EngineConfig};
use crate::rules::staleness::StalenessRule;
use crate::rules::threshold::{ThresholdFamily, ThresholdRule};
use crate::snapshot::{collect_outputs, honor_stash};
use crate::{DetailSource, EngineError, SilenceLookup};
use aggmon_common::error::FetchError;
use aggmon_common::types::{
    AggregateCounts, ResultEntry, SeverityDetail, SeveritySummary, Snapshot, Status,
};
use chrono::{Duration, Utc};
use std::collections::HashSet;

fn make_counts(ok: u64, warning: u64, critical: u64, total: u64) -> AggregateCounts {
    AggregateCounts {
        ok,
        warning,
        critical,
        unknown: 0,
        stale: 0,
        total,
    }
}

fn make_entry(client: &str, status: Status, output: &str, secs_ago: i64) -> ResultEntry {
    ResultEntry {
        client: client.to_string(),
        check: "disk".to_string(),
        status,
        output: output.to_string(),
        issued: Utc::now() - Duration::seconds(secs_ago),
    }
}

fn percent_rule(warning: Option<u64>, critical: Option<u64>, merged: bool) -> ThresholdRule {
    ThresholdRule {
        family: ThresholdFamily::Percent,
        warning,
        critical,
        merge_severities: merged,
    }
}

fn snapshot_with(counts: AggregateCounts) -> Snapshot {
    Snapshot {
        counts,
        ..Default::default()
    }
}

struct StashedClients(HashSet<&'static str>);

impl SilenceLookup for StashedClients {
    fn is_silenced(&self, client: &str) -> Result<bool, FetchError> {
        Ok(self.0.contains(client))
    }
}

struct FailingLookup;

impl SilenceLookup for FailingLookup {
    fn is_silenced(&self, _client: &str) -> Result<bool, FetchError> {
        Err(FetchError::RequestFailed)
    }
}

struct NoDetail;

impl DetailSource for NoDetail {
    fn severity_detail(&self, _severity: Status) -> Result<Vec<SeverityDetail>, FetchError> {
        panic!("detail fetch not expected when entries are populated");
    }
}

// -- threshold evaluator --

#[test]
fn merged_percent_crosses_critical() {
    // 90 ok of 100 -> 10% non-zero, meets crit=10 exactly
    let rule = percent_rule(Some(5), Some(10), true);
    let breach = rule.evaluate(&make_counts(90, 5, 5, 100)).unwrap();
    assert_eq!(breach.status, Status::Critical);
    assert_eq!(breach.amount, 10);
    assert_eq!(breach.label, "non-zero");
}

#[test]
fn merged_percent_prefers_critical_over_warning() {
    // Both thresholds satisfied; critical must win every time.
    let rule = percent_rule(Some(1), Some(5), true);
    let breach = rule.evaluate(&make_counts(90, 5, 5, 100)).unwrap();
    assert_eq!(breach.status, Status::Critical);
}

#[test]
fn unmerged_percent_compares_buckets_independently() {
    // pctWarning = 5 >= 4, pctCritical = 5 < 10 -> warning
    let rule = percent_rule(Some(4), Some(10), false);
    let breach = rule.evaluate(&make_counts(90, 5, 5, 100)).unwrap();
    assert_eq!(breach.status, Status::Warning);
    assert_eq!(breach.amount, 5);
    assert_eq!(breach.label, "warning");
}

#[test]
fn warning_uses_warning_threshold_not_critical() {
    // warning bucket 3 is below warn=5; the critical threshold (2) must
    // not leak into the warning comparison.
    let rule = ThresholdRule {
        family: ThresholdFamily::Count,
        warning: Some(5),
        critical: Some(2),
        merge_severities: false,
    };
    assert!(rule.evaluate(&make_counts(96, 3, 1, 100)).is_none());
}

#[test]
fn merged_percent_is_complement_of_ok_percent() {
    // 2 of 3 ok -> floor(2/3*100) = 66 -> 34% non-zero, not floor(1/3*100)=33
    let rule = percent_rule(Some(34), None, true);
    let breach = rule.evaluate(&make_counts(2, 1, 0, 3)).unwrap();
    assert_eq!(breach.amount, 34);
}

#[test]
fn count_mode_merged_uses_total_minus_ok() {
    let rule = ThresholdRule {
        family: ThresholdFamily::Count,
        warning: None,
        critical: Some(10),
        merge_severities: true,
    };
    let breach = rule.evaluate(&make_counts(90, 5, 5, 100)).unwrap();
    assert_eq!(breach.status, Status::Critical);
    assert_eq!(breach.amount, 10);
}

#[test]
fn no_breach_below_thresholds() {
    let rule = percent_rule(Some(50), Some(80), true);
    assert!(rule.evaluate(&make_counts(90, 5, 5, 100)).is_none());
}

// -- stash filter --

#[test]
fn stash_filter_rebalances_counts_and_entries() {
    let snapshot = Snapshot {
        counts: make_counts(2, 1, 1, 4),
        entries: Some(vec![
            make_entry("web-01", Status::Ok, "fine", 10),
            make_entry("web-02", Status::Ok, "fine", 10),
            make_entry("web-03", Status::Warning, "disk 85%", 10),
            make_entry("web-04", Status::Critical, "disk 97%", 10),
        ]),
        ..Default::default()
    };
    let mut stashed = HashSet::new();
    stashed.insert("web-04");

    let filtered = honor_stash(snapshot, &StashedClients(stashed));
    assert_eq!(filtered.counts.critical, 0);
    assert_eq!(filtered.counts.total, 3);
    assert_eq!(filtered.entries.as_ref().unwrap().len(), 3);
}

#[test]
fn stash_filter_is_idempotent_when_nothing_more_is_silenced() {
    let snapshot = Snapshot {
        counts: make_counts(1, 1, 0, 2),
        entries: Some(vec![
            make_entry("web-01", Status::Ok, "fine", 10),
            make_entry("web-02", Status::Warning, "disk 85%", 10),
        ]),
        ..Default::default()
    };

    let once = honor_stash(snapshot, &StashedClients(HashSet::new()));
    let counts_after_once = once.counts;
    let twice = honor_stash(once, &StashedClients(HashSet::new()));
    assert_eq!(twice.counts.total, counts_after_once.total);
    assert_eq!(twice.counts.warning, counts_after_once.warning);
    assert_eq!(twice.entries.as_ref().unwrap().len(), 2);
}

#[test]
fn stash_filter_keeps_entries_on_lookup_failure() {
    let snapshot = Snapshot {
        counts: make_counts(0, 2, 0, 2),
        entries: Some(vec![
            make_entry("web-01", Status::Warning, "disk 85%", 10),
            make_entry("web-02", Status::Warning, "disk 88%", 10),
        ]),
        ..Default::default()
    };

    let filtered = honor_stash(snapshot, &FailingLookup);
    assert_eq!(filtered.counts.total, 2);
    assert_eq!(filtered.entries.as_ref().unwrap().len(), 2);
}

#[test]
fn stash_filter_is_a_noop_without_entries() {
    let snapshot = snapshot_with(make_counts(1, 1, 0, 2));
    let filtered = honor_stash(snapshot, &FailingLookup);
    assert_eq!(filtered.counts.total, 2);
    assert!(filtered.entries.is_none());
}

// -- output collector --

#[test]
fn collector_derives_outputs_from_populated_entries() {
    let snapshot = Snapshot {
        counts: make_counts(1, 1, 1, 3),
        entries: Some(vec![
            make_entry("web-01", Status::Ok, "fine", 10),
            make_entry("web-02", Status::Warning, "disk 85%", 10),
            make_entry("web-03", Status::Critical, "disk 97%", 10),
        ]),
        ..Default::default()
    };

    let collected = collect_outputs(snapshot, &NoDetail).unwrap();
    assert_eq!(collected.outputs, vec!["disk 85%", "disk 97%"]);
    assert_eq!(
        collected.summaries,
        vec!["web-02: disk 85%", "web-03: disk 97%"]
    );
}

struct SeverityFeed;

impl DetailSource for SeverityFeed {
    fn severity_detail(&self, severity: Status) -> Result<Vec<SeverityDetail>, FetchError> {
        let output = match severity {
            Status::Warning => "disk 85%",
            Status::Critical => "disk 97%",
            _ => "?",
        };
        Ok(vec![SeverityDetail {
            client: "api".to_string(),
            summary: vec![SeveritySummary {
                clients: vec!["web-02".to_string()],
                total: 1,
                output: output.to_string(),
            }],
        }])
    }
}

#[test]
fn collector_fetches_severity_tiers_in_message_order() {
    let snapshot = snapshot_with(make_counts(1, 1, 1, 3));
    let collected = collect_outputs(snapshot, &SeverityFeed).unwrap();
    // warning tier first, then critical; unknown bucket is zero and skipped
    assert_eq!(collected.outputs, vec!["disk 85%", "disk 97%"]);
    assert_eq!(
        collected.summaries,
        vec![
            "1 clients warning web-02: disk 85%",
            "1 clients critical web-02: disk 97%"
        ]
    );
}

// -- outlier detector --

#[test]
fn outlier_flags_first_diverging_key() {
    let engine = Engine::new(EngineConfig {
        pattern: Some(r"region=(\w+) v(.+)".to_string()),
        ..Default::default()
    })
    .unwrap();

    let mut snapshot = snapshot_with(make_counts(2, 0, 0, 2));
    snapshot.outputs = vec!["region=us v1.2".to_string(), "region=us v1.3".to_string()];

    let verdict = engine.evaluate(&snapshot, Utc::now()).unwrap();
    assert_eq!(verdict.status, Status::Critical);
    assert!(verdict.message.contains("(us)"));
}

#[test]
fn outlier_silent_when_values_agree_in_any_order() {
    let rule = crate::rules::outlier::OutlierRule::new(r"region=(\w+) v(.+)").unwrap();
    let outputs = [
        "region=us v1.2".to_string(),
        "region=eu v2.0".to_string(),
        "region=us v1.2".to_string(),
    ];

    // All matched values pairwise equal per key: no permutation diverges.
    let permutations = [
        [0usize, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];
    for perm in permutations {
        let ordered: Vec<String> = perm.iter().map(|&i| outputs[i].clone()).collect();
        assert!(rule.evaluate(&ordered).is_none());
    }
}

#[test]
fn outlier_skips_non_matching_outputs() {
    let rule = crate::rules::outlier::OutlierRule::new(r"region=(\w+) v(.+)").unwrap();
    let outputs = vec![
        "totally unrelated".to_string(),
        "region=us v1.2".to_string(),
    ];
    assert!(rule.evaluate(&outputs).is_none());
}

#[test]
fn outlier_reports_first_divergence_only() {
    let rule = crate::rules::outlier::OutlierRule::new(r"region=(\w+) v(.+)").unwrap();
    let outputs = vec![
        "region=us v1.2".to_string(),
        "region=eu v2.0".to_string(),
        "region=us v1.3".to_string(),
        "region=eu v2.1".to_string(),
    ];
    // eu also diverges but us diverges first and wins
    assert_eq!(rule.evaluate(&outputs), Some("us".to_string()));
}

// -- staleness evaluator --

#[test]
fn staleness_is_warning_never_critical() {
    let rule = StalenessRule {
        warn_percent: None,
        warn_count: Some(1),
        stale_after_secs: 3600,
        verbose: false,
    };
    let engine = Engine::new(EngineConfig {
        staleness: Some(rule),
        ..Default::default()
    })
    .unwrap();

    let mut counts = make_counts(1, 0, 0, 10);
    counts.stale = 9; // 90% stale, far beyond any threshold
    let verdict = engine.evaluate(&snapshot_with(counts), Utc::now()).unwrap();
    assert_eq!(verdict.status, Status::Warning);
}

#[test]
fn staleness_percent_takes_precedence_over_count() {
    let rule = StalenessRule {
        warn_percent: Some(50),
        warn_count: Some(1),
        stale_after_secs: 3600,
        verbose: false,
    };
    // 2 stale of 10 = 20%: count threshold alone would fire, percent must not
    let mut counts = make_counts(8, 0, 0, 10);
    counts.stale = 2;
    assert!(rule.evaluate(&counts).is_none());
}

#[test]
fn staleness_verbose_footer_lists_old_entries() {
    let rule = StalenessRule {
        warn_percent: None,
        warn_count: Some(1),
        stale_after_secs: 3600,
        verbose: true,
    };
    let now = Utc::now();
    let entries = vec![
        make_entry("web-01", Status::Ok, "fine", 7200),
        make_entry("web-02", Status::Ok, "fine", 60),
    ];
    let footer = rule.footer(&entries, now);
    assert!(footer.contains("web-01/disk is stale"));
    assert!(!footer.contains("web-02"));
}

// -- verdict combiner --

#[test]
fn threshold_breach_short_circuits_later_rules() {
    let mut counts = make_counts(90, 5, 5, 100);
    counts.stale = 100; // staleness would also fire, but must never run
    let engine = Engine::new(EngineConfig {
        thresholds: Some(percent_rule(Some(5), Some(10), true)),
        staleness: Some(StalenessRule {
            warn_percent: Some(1),
            warn_count: None,
            stale_after_secs: 3600,
            verbose: false,
        }),
        ..Default::default()
    })
    .unwrap();

    let verdict = engine.evaluate(&snapshot_with(counts), Utc::now()).unwrap();
    assert_eq!(verdict.status, Status::Critical);
    assert!(verdict.message.contains("10% non-zero"));
}

#[test]
fn all_rules_pass_yields_ok() {
    let engine = Engine::new(EngineConfig {
        thresholds: Some(percent_rule(Some(50), Some(80), true)),
        ..Default::default()
    })
    .unwrap();
    let verdict = engine
        .evaluate(&snapshot_with(make_counts(99, 1, 0, 100)), Utc::now())
        .unwrap();
    assert_eq!(verdict.status, Status::Ok);
    assert_eq!(verdict.message, "Aggregate looks good");
}

#[test]
fn custom_message_overrides_default_base_text() {
    let engine = Engine::new(EngineConfig {
        thresholds: Some(percent_rule(None, Some(10), true)),
        message: Some("Fleet disk checks degraded".to_string()),
        ..Default::default()
    })
    .unwrap();
    let verdict = engine
        .evaluate(&snapshot_with(make_counts(80, 10, 10, 100)), Utc::now())
        .unwrap();
    assert!(verdict.message.starts_with("Fleet disk checks degraded (20% non-zero)"));
}

#[test]
fn collected_summaries_are_appended_to_breach_messages() {
    let engine = Engine::new(EngineConfig {
        thresholds: Some(percent_rule(None, Some(10), true)),
        include_outputs: true,
        ..Default::default()
    })
    .unwrap();
    let mut snapshot = snapshot_with(make_counts(80, 20, 0, 100));
    snapshot.summaries = vec!["web-02: disk 85%".to_string()];
    let verdict = engine.evaluate(&snapshot, Utc::now()).unwrap();
    assert!(verdict.message.ends_with("\nweb-02: disk 85%"));
}

#[test]
fn zero_total_is_rejected_before_any_rule_runs() {
    let engine = Engine::new(EngineConfig {
        thresholds: Some(percent_rule(Some(5), Some(10), true)),
        ..Default::default()
    })
    .unwrap();
    let err = engine
        .evaluate(&snapshot_with(make_counts(0, 0, 0, 0)), Utc::now())
        .unwrap_err();
    assert!(matches!(err, EngineError::NoData));
}

#[test]
fn engine_rejects_empty_configuration() {
    let err = Engine::new(EngineConfig::default()).unwrap_err();
    assert!(matches!(err, EngineError::NoRulesConfigured));
}

#[test]
fn engine_rejects_invalid_pattern() {
    let err = Engine::new(EngineConfig {
        pattern: Some("(unclosed".to_string()),
        ..Default::default()
    })
    .unwrap_err();
    assert!(matches!(err, EngineError::InvalidPattern(_)));
}
