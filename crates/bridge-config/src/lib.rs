//! Wallet bridge configuration.
//!
//! TOML-based configuration for the wallet communicator: wallet URLs,
//! popup geometry, handshake and liveness timing, and method routing.
//! All sections use defaults so partial configs work out of the box.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use bridge_config::{load_config, config_to_json};
//!
//! let config = load_config(std::path::Path::new("bridge.toml")).expect("failed to load config");
//! let json = config_to_json(&config);
//! println!("{json}");
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{
    BridgeConfig, LoggingConfig, PopupConfig, RoutingConfig, TimingConfig, WalletConfig,
    CONFIG_SCHEMA_VERSION,
};

use std::path::Path;

use bridge_common::ConfigError;

/// Load and validate a config file.
pub fn load_config(path: &Path) -> Result<BridgeConfig, ConfigError> {
    let config = toml_loader::load_from_path(path)?;
    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &BridgeConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}
