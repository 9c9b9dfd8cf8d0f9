//! TOML config file loading.

mod loader;
mod template;

#[cfg(test)]
mod tests;

pub use loader::{load_from_path, load_from_str, write_default_config};
pub use template::default_config_toml;
