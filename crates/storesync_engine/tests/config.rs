//! Configuration loading from JSON.

use std::time::Duration;
use storesync_engine::{SyncConfig, DEFAULT_BATCH_QUIET_PERIOD};

#[test]
fn config_reads_camel_case_json() {
    let config: SyncConfig = serde_json::from_str(
        r#"{"clientSections": ["ui", "router"], "batchQuietPeriodMs": 40, "collectStats": false}"#,
    )
    .unwrap();
    assert_eq!(config.client_sections, vec!["ui", "router"]);
    assert_eq!(config.batch_quiet_period, Duration::from_millis(40));
    assert!(!config.collect_stats);
}

#[test]
fn missing_fields_take_defaults() {
    let config: SyncConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config, SyncConfig::default());
    assert_eq!(config.batch_quiet_period, DEFAULT_BATCH_QUIET_PERIOD);
}

#[test]
fn config_writes_milliseconds() {
    let config = SyncConfig::new()
        .with_client_section("ui")
        .with_batch_quiet_period(Duration::from_millis(250));
    let json = serde_json::to_value(&config).unwrap();
    assert_eq!(json["batchQuietPeriodMs"], 250);
    assert_eq!(json["clientSections"][0], "ui");

    let back: SyncConfig = serde_json::from_value(json).unwrap();
    assert_eq!(back, config);
}

#[test]
fn quiet_period_must_be_a_number() {
    let result = serde_json::from_str::<SyncConfig>(r#"{"batchQuietPeriodMs": "soon"}"#);
    assert!(result.is_err());
}
