use serde::{Deserialize, Serialize};

/// Geometry of the confirmation popup. It is centered over the caller's window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PopupConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            width: 420,
            height: 540,
        }
    }
}
