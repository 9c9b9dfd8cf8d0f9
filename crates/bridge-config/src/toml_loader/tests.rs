//! Tests for TOML config loading and creation.

use super::*;
use bridge_common::{ChannelKind, ConfigError};
use std::path::Path;

#[test]
fn load_from_nonexistent_returns_file_not_found() {
    let result = load_from_path(Path::new("/tmp/nonexistent_wallet_bridge_config.toml"));
    assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
}

#[test]
fn load_valid_partial_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bridge.toml");
    std::fs::write(
        &path,
        r#"
[wallet]
url = "https://wallet.example"

[timing]
ping_interval_ms = 250
"#,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.wallet.url, "https://wallet.example");
    assert_eq!(config.timing.ping_interval_ms, 250);
    // Defaults preserved
    assert_eq!(config.wallet.popup_path, "/sign");
    assert_eq!(config.timing.liveness_interval_ms, 100);
    assert_eq!(config.popup.height, 540);
}

#[test]
fn load_invalid_toml_returns_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bridge.toml");
    std::fs::write(&path, "this is not valid toml {{{").unwrap();

    let result = load_from_path(&path);
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[test]
fn routing_section_parses_channel_kind() {
    let config = load_from_str(
        r#"
[routing]
frame_methods = ["aztec_getBalance"]
default_channel = "frame"
"#,
    )
    .unwrap();
    assert_eq!(config.routing.frame_methods, vec!["aztec_getBalance"]);
    assert_eq!(config.routing.default_channel, ChannelKind::Frame);
    assert_eq!(config.routing.final_methods.len(), 3);
}

#[test]
fn unknown_channel_kind_is_parse_error() {
    let result = load_from_str("[routing]\ndefault_channel = \"tab\"\n");
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[test]
fn default_template_parses_to_defaults() {
    let config = load_from_str(default_config_toml()).unwrap();
    assert_eq!(config.wallet.url, "https://app.obsidion.xyz");
    assert_eq!(config.popup.width, 420);
    assert_eq!(config.routing.default_channel, ChannelKind::Popup);
}

#[test]
fn write_default_config_creates_parents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("bridge.toml");
    write_default_config(&path).unwrap();
    assert!(path.exists());

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.logging.level, "info");
}
