//! Tests for configuration validation

use std::collections::HashMap;
use std::time::Duration;

use post_scheduler::config::{QueueBackendConfig, SchedulerConfig};
use post_scheduler::core::{Platform, RetryDecision};

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key: &str| vars.get(key).cloned()
}

#[test]
fn test_default_config_is_valid() {
    let cfg = SchedulerConfig::default();
    assert!(cfg.validate().is_ok());
    assert!(cfg.is_development());
    assert_eq!(cfg.poller.settings().interval, Duration::from_secs(30));
    assert_eq!(cfg.dispatch.idle_wait(), Duration::from_millis(100));
}

#[test]
fn test_default_retry_policy() {
    let policy = SchedulerConfig::default().dispatch.retry_policy();
    assert_eq!(policy.decide(1), RetryDecision::Retry(Duration::from_secs(120)));
    assert_eq!(policy.decide(2), RetryDecision::Retry(Duration::from_secs(240)));
    assert_eq!(policy.decide(3), RetryDecision::DeadLetter);
}

#[test]
fn test_invalid_poll_interval() {
    let mut cfg = SchedulerConfig::default();
    cfg.poller.interval_secs = 0;
    assert!(cfg.validate().is_err());
}

#[test]
fn test_claim_ttl_must_cover_window() {
    let mut cfg = SchedulerConfig::default();
    cfg.poller.claim_ttl_secs = 60;
    assert!(cfg.validate().is_err());
}

#[test]
fn test_invalid_dispatchers() {
    let mut cfg = SchedulerConfig::default();
    cfg.dispatch.dispatchers = 0;
    assert!(cfg.validate().is_err());
}

#[test]
fn test_file_backend_requires_path() {
    let mut cfg = SchedulerConfig::default();
    cfg.queue = QueueBackendConfig::File {
        path: String::new(),
        stream: "scheduled_posts".into(),
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_from_json_str() {
    let json = r#"{
        "environment": "production",
        "queue": { "kind": "file", "path": "/tmp/q", "stream": "posts" },
        "dispatch": { "dispatchers": 4 },
        "credentials": { "x": { "client_id": "id", "client_secret": "secret" } }
    }"#;
    let cfg = SchedulerConfig::from_json_str(json).unwrap();
    assert!(!cfg.is_development());
    assert_eq!(cfg.dispatch.dispatchers, 4);
    assert_eq!(cfg.dispatch.max_attempts, 3);
    assert!(matches!(cfg.queue, QueueBackendConfig::File { .. }));
    assert!(cfg.credentials.get(&Platform::X).is_some());
    assert!(cfg.credentials.get(&Platform::Meta).is_none());
}

#[test]
fn test_from_json_str_rejects_invalid() {
    assert!(SchedulerConfig::from_json_str(r#"{ "poller": { "interval_secs": 0 } }"#).is_err());
    assert!(SchedulerConfig::from_json_str("not json").is_err());
}

#[test]
fn test_from_lookup_requires_database_url() {
    assert!(SchedulerConfig::from_lookup(lookup(&[])).is_err());
}

#[test]
fn test_from_lookup_reads_environment() {
    let cfg = SchedulerConfig::from_lookup(lookup(&[
        ("DATABASE_URL", "postgres://localhost/app"),
        ("REDIS_URL", "redis://cache:6379"),
        ("NODE_ENV", "production"),
        ("SCHEDULER_DISPATCHERS", "3"),
        ("META_CLIENT_ID", "meta-id"),
        ("META_CLIENT_SECRET", "meta-secret"),
        ("LINKEDIN_CLIENT_ID", "only-id"),
    ]))
    .unwrap();

    assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/app"));
    assert_eq!(
        cfg.queue,
        QueueBackendConfig::Redis {
            url: "redis://cache:6379".into()
        }
    );
    assert_eq!(cfg.environment, "production");
    assert_eq!(cfg.dispatch.dispatchers, 3);
    assert!(cfg.credentials.get(&Platform::Meta).is_some());
    assert!(cfg.credentials.get(&Platform::LinkedIn).is_none());
}

#[test]
fn test_from_lookup_rejects_unknown_backend() {
    let result = SchedulerConfig::from_lookup(lookup(&[
        ("DATABASE_URL", "postgres://localhost/app"),
        ("SCHEDULER_QUEUE", "kafka"),
    ]));
    assert!(result.is_err());
}

#[test]
fn test_from_lookup_rejects_bad_number() {
    let result = SchedulerConfig::from_lookup(lookup(&[
        ("DATABASE_URL", "postgres://localhost/app"),
        ("SCHEDULER_POLL_INTERVAL_SECS", "soon"),
    ]));
    assert!(result.is_err());
}
