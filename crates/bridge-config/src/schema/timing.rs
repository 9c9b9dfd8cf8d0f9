use serde::{Deserialize, Serialize};

/// Handshake, liveness, and idle-disconnect timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Interval between handshake pings while waiting for the wallet to load.
    pub ping_interval_ms: u64,
    /// Interval between checks for a popup closed by the user.
    pub liveness_interval_ms: u64,
    /// Delay before closing an idle popup after a non-final request settles.
    pub idle_disconnect_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            ping_interval_ms: 100,
            liveness_interval_ms: 100,
            idle_disconnect_ms: 1000,
        }
    }
}
