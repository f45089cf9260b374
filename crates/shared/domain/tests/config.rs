use bazaar_domain::config::{ClientConfig, Environment, RealtimeConfig, StorageConfig};
use serde_json::json;
use std::time::Duration;

#[test]
fn config_defaults_are_sane() {
    let cfg = ClientConfig::default();
    assert_eq!(cfg.environment, Environment::Development);
    assert_eq!(cfg.api.url, "http://localhost:8080/api");
    assert_eq!(cfg.logging.level, "info");
    assert!(!cfg.logging.json);

    let realtime = RealtimeConfig::default();
    assert_eq!(realtime.ws_url, "ws://localhost:8080/ws");
    assert_eq!(realtime.max_reconnect_attempts, 5);
    assert_eq!(realtime.reconnect_interval(), Duration::from_secs(3));
    assert_eq!(realtime.max_reconnect_delay(), None);
    assert_eq!(realtime.event_capacity, 128);

    assert_eq!(StorageConfig::default().data_dir, std::path::PathBuf::from(".bazaar"));
}

#[test]
fn client_config_deserializes_partial_sections() {
    let raw = json!({
        "environment": "production",
        "realtime": { "ws_url": "wss://bazaar.rw/ws", "max_reconnect_delay_ms": 10000 },
        "analytics": { "measurement_id": "G-TEST" }
    });

    let cfg: ClientConfig = serde_json::from_value(raw).expect("config deserialize");
    assert!(cfg.environment.is_production());
    assert_eq!(cfg.realtime.ws_url, "wss://bazaar.rw/ws");
    assert_eq!(cfg.realtime.max_reconnect_attempts, 5);
    assert_eq!(cfg.realtime.max_reconnect_delay(), Some(Duration::from_secs(10)));
    assert_eq!(cfg.api.url, "http://localhost:8080/api");
    assert!(cfg.missing_required().is_empty());
}

#[test]
fn missing_required_lists_empty_settings() {
    let mut cfg = ClientConfig::default();
    assert_eq!(cfg.missing_required(), vec!["analytics.measurement_id"]);

    cfg.realtime.ws_url = "  ".into();
    cfg.api.url.clear();
    assert_eq!(
        cfg.missing_required(),
        vec!["api.url", "realtime.ws_url", "analytics.measurement_id"]
    );
}

#[test]
fn clones_are_copy_on_write() {
    let original = ClientConfig::default();
    let mut edited = original.clone();
    edited.realtime.max_reconnect_attempts = 1;

    assert_eq!(original.realtime.max_reconnect_attempts, 5);
    assert_eq!(edited.realtime.max_reconnect_attempts, 1);
}
