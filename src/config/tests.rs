use super::settings::{PartialSettings, PartialStreamingSettings};
use super::{Settings, load_config_from};
use crate::streaming::DecodeFailurePolicy;
use serial_test::serial;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

fn missing_file(dir: &TempDir) -> String {
    dir.path().join("absent").to_str().unwrap().to_string()
}

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.broker.name, "nats-streaming");
    assert_eq!(settings.broker.addrs, vec!["nats://127.0.0.1:4222"]);
    assert_eq!(settings.streaming.client_id, None);
    assert_eq!(settings.streaming.cluster_id, None);
    assert_eq!(settings.streaming.connect_timeout_ms, 2000);
    assert_eq!(settings.streaming.ack_timeout_ms, 30_000);
    assert_eq!(settings.streaming.decode_failure, DecodeFailurePolicy::Drop);
    assert_eq!(settings.logging.level, "info");
}

#[test]
fn test_merge_keeps_defaults_for_missing_values() {
    let partial = PartialSettings {
        streaming: Some(PartialStreamingSettings {
            client_id: Some("c1".to_string()),
            ack_timeout_ms: Some(5000),
            ..PartialStreamingSettings::default()
        }),
        ..PartialSettings::default()
    };

    let settings = Settings::merge(partial);
    assert_eq!(settings.streaming.client_id.as_deref(), Some("c1"));
    assert_eq!(settings.streaming.ack_timeout_ms, 5000);
    assert_eq!(settings.streaming.discover_prefix, "_STAN.discover");
    assert_eq!(settings.broker, Settings::default().broker);
}

#[test]
fn test_client_options_from_settings() {
    let mut settings = Settings::default();
    settings.broker.addrs = vec!["nats://stan.local:4222".to_string()];
    settings.streaming.ack_timeout_ms = 1500;
    settings.streaming.ping_max_out = 7;

    let opts = settings.client_options();
    assert_eq!(opts.url, "nats://stan.local:4222");
    assert_eq!(opts.ack_timeout, Duration::from_millis(1500));
    assert_eq!(opts.connect_timeout, Duration::from_secs(2));
    assert_eq!(opts.ping_max_out, 7);
}

#[test]
fn test_streaming_config_carries_identifiers() {
    let mut settings = Settings::default();
    settings.streaming.client_id = Some("c1".to_string());
    settings.streaming.cluster_id = Some("test-cluster".to_string());

    let config = settings.streaming_config().unwrap();
    assert_eq!(config.client_id.as_deref(), Some("c1"));
    assert_eq!(config.cluster_id.as_deref(), Some("test-cluster"));
    assert!(config.dead_letters.is_none());
    assert!(config.client_options.is_some());
}

#[test]
fn test_streaming_config_opens_dead_letter_store() {
    let dir = TempDir::new().unwrap();
    let mut settings = Settings::default();
    settings.streaming.decode_failure = DecodeFailurePolicy::DeadLetter;
    settings.streaming.dead_letter.path = dir.path().join("dlq").to_str().unwrap().to_string();

    let config = settings.streaming_config().unwrap();
    assert!(config.dead_letters.is_some());
}

#[test]
#[serial]
fn load_config_from_file_overrides_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let path = tmp.path().join("default.toml");
    let toml = r#"
        [broker]
        addrs = ["10.0.0.1:4222", "10.0.0.2:4222"]

        [streaming]
        client_id = "file-client"
        cluster_id = "file-cluster"
        max_pub_acks_inflight = 32
        decode_failure = "surface"

        [logging]
        level = "debug"
    "#;
    fs::write(&path, toml).expect("write config file");

    let cfg = load_config_from(path.to_str().unwrap()).expect("load_config failed");
    assert_eq!(cfg.broker.addrs, vec!["10.0.0.1:4222", "10.0.0.2:4222"]);
    assert_eq!(cfg.streaming.client_id.as_deref(), Some("file-client"));
    assert_eq!(cfg.streaming.cluster_id.as_deref(), Some("file-cluster"));
    assert_eq!(cfg.streaming.max_pub_acks_inflight, 32);
    assert_eq!(cfg.streaming.decode_failure, DecodeFailurePolicy::Surface);
    assert_eq!(cfg.streaming.ping_interval, 5);
    assert_eq!(cfg.logging.level, "debug");
}

#[test]
#[serial]
fn load_config_without_file_uses_defaults() {
    let tmp = TempDir::new().unwrap();
    let cfg = load_config_from(&missing_file(&tmp)).unwrap();
    assert_eq!(cfg, Settings::default());
}

#[test]
#[serial]
fn load_config_reads_environment() {
    let tmp = TempDir::new().unwrap();
    let path = missing_file(&tmp);

    temp_env::with_vars(
        [
            ("STANBRIDGE__STREAMING__CLIENT_ID", Some("env-client")),
            ("STANBRIDGE__STREAMING__CLUSTER_ID", Some("env-cluster")),
            ("STANBRIDGE__STREAMING__ACK_TIMEOUT_MS", Some("900")),
            ("STANBRIDGE__STREAMING__DECODE_FAILURE", Some("dead-letter")),
            ("STANBRIDGE__BROKER__ADDRS", Some("a:4222,b:4222")),
        ],
        || {
            let cfg = load_config_from(&path).unwrap();
            assert_eq!(cfg.streaming.client_id.as_deref(), Some("env-client"));
            assert_eq!(cfg.streaming.cluster_id.as_deref(), Some("env-cluster"));
            assert_eq!(cfg.streaming.ack_timeout_ms, 900);
            assert_eq!(
                cfg.streaming.decode_failure,
                DecodeFailurePolicy::DeadLetter
            );
            assert_eq!(cfg.broker.addrs, vec!["a:4222", "b:4222"]);
        },
    );
}
