use super::*;
use crate::schema::BridgeConfig;

fn validation_message(config: &BridgeConfig) -> String {
    match validate(config) {
        Err(ConfigError::ValidationError(msg)) => msg,
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn default_config_is_valid() {
    assert!(validate(&BridgeConfig::default()).is_ok());
}

#[test]
fn rejects_zero_ping_interval() {
    let mut config = BridgeConfig::default();
    config.timing.ping_interval_ms = 0;
    let msg = validation_message(&config);
    assert!(msg.contains("timing.ping_interval_ms = 0"));
}

#[test]
fn rejects_tiny_popup() {
    let mut config = BridgeConfig::default();
    config.popup.width = 10;
    config.popup.height = 9000;
    let msg = validation_message(&config);
    assert!(msg.contains("popup.width"));
    assert!(msg.contains("popup.height"));
}

#[test]
fn rejects_non_http_wallet_url() {
    let mut config = BridgeConfig::default();
    config.wallet.url = "file:///etc/passwd".into();
    let msg = validation_message(&config);
    assert!(msg.contains("unsupported scheme"));
}

#[test]
fn rejects_garbage_wallet_url() {
    let mut config = BridgeConfig::default();
    config.wallet.url = "not a url".into();
    let msg = validation_message(&config);
    assert!(msg.contains("wallet.url"));
}

#[test]
fn rejects_empty_method_names() {
    let mut config = BridgeConfig::default();
    config.routing.frame_methods.push("  ".into());
    let msg = validation_message(&config);
    assert!(msg.contains("routing.frame_methods"));
}

#[test]
fn rejects_unknown_log_level() {
    let mut config = BridgeConfig::default();
    config.logging.level = "loud".into();
    let msg = validation_message(&config);
    assert!(msg.contains("logging.level"));
}

#[test]
fn collects_all_errors() {
    let mut config = BridgeConfig::default();
    config.timing.ping_interval_ms = 0;
    config.timing.liveness_interval_ms = 0;
    let msg = validation_message(&config);
    assert_eq!(msg.matches("; ").count(), 1);
}

#[test]
fn disabled_frame_is_valid() {
    let mut config = BridgeConfig::default();
    config.wallet.frame_path = String::new();
    assert!(validate(&config).is_ok());
}
