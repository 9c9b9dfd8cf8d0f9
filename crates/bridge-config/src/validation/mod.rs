//! Full configuration validation.
//!
//! Checks numeric ranges, wallet URLs, and routing lists, collecting every
//! error into a single `ConfigError`.

mod helpers;

#[cfg(test)]
mod tests;

use bridge_common::ConfigError;

use crate::schema::BridgeConfig;
use helpers::{validate_range, validate_url};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &BridgeConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_url(&mut errors, "wallet.url", &config.wallet.url);
    validate_url(&mut errors, "wallet.popup_path", &config.wallet.popup_url());
    if let Some(frame_url) = config.wallet.frame_url() {
        validate_url(&mut errors, "wallet.frame_path", &frame_url);
    }

    validate_range(&mut errors, "popup.width", config.popup.width.into(), 100, 4000);
    validate_range(&mut errors, "popup.height", config.popup.height.into(), 100, 4000);

    validate_range(
        &mut errors,
        "timing.ping_interval_ms",
        config.timing.ping_interval_ms,
        10,
        10_000,
    );
    validate_range(
        &mut errors,
        "timing.liveness_interval_ms",
        config.timing.liveness_interval_ms,
        10,
        10_000,
    );
    validate_range(
        &mut errors,
        "timing.idle_disconnect_ms",
        config.timing.idle_disconnect_ms,
        0,
        60_000,
    );

    if config.routing.frame_methods.iter().any(|m| m.trim().is_empty()) {
        errors.push("routing.frame_methods contains an empty method name".into());
    }
    if config.routing.final_methods.iter().any(|m| m.trim().is_empty()) {
        errors.push("routing.final_methods contains an empty method name".into());
    }

    if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
        errors.push(format!(
            "logging.level = {:?} is not one of {LOG_LEVELS:?}",
            config.logging.level
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
