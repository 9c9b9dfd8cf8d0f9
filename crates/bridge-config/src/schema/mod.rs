//! Configuration schema types for the wallet bridge.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod logging;
mod popup;
mod routing;
mod timing;
mod wallet;

pub use logging::*;
pub use popup::*;
pub use routing::*;
pub use timing::*;
pub use wallet::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration for the wallet bridge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub wallet: WalletConfig,
    pub popup: PopupConfig,
    pub timing: TimingConfig,
    pub routing: RoutingConfig,
    pub logging: LoggingConfig,
}
