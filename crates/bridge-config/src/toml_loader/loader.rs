use std::path::Path;

use bridge_common::ConfigError;
use tracing::info;

use super::template::default_config_toml;
use crate::schema::BridgeConfig;

/// Load config from a specific TOML file path.
///
/// Missing fields take their serde defaults. Validation is left to the caller.
pub fn load_from_path(path: &Path) -> Result<BridgeConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::ParseError(format!("failed to read {}: {e}", path.display()))
    })?;

    let config = load_from_str(&content)?;
    info!("loaded config from {}", path.display());
    Ok(config)
}

/// Parse config from TOML text.
pub fn load_from_str(content: &str) -> Result<BridgeConfig, ConfigError> {
    toml::from_str(content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))
}

/// Write the documented default config to `path`, creating parent directories.
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ConfigError::ParseError(format!(
                "failed to create config directory {}: {e}",
                parent.display()
            ))
        })?;
    }

    std::fs::write(path, default_config_toml()).map_err(|e| {
        ConfigError::ParseError(format!(
            "failed to write default config to {}: {e}",
            path.display()
        ))
    })?;

    info!("created default config at {}", path.display());
    Ok(())
}
