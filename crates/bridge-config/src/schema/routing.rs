use bridge_common::ChannelKind;
use serde::{Deserialize, Serialize};

/// Method routing policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Methods that need no user confirmation and go to the hidden frame.
    pub frame_methods: Vec<String>,
    /// Methods after which the popup is closed as soon as nothing is in flight.
    pub final_methods: Vec<String>,
    /// Channel for every method not listed in `frame_methods`.
    pub default_channel: ChannelKind,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            frame_methods: vec!["aztec_accounts".into(), "aztec_call".into()],
            final_methods: vec![
                "aztec_requestAccounts".into(),
                "aztec_sendTransaction".into(),
                "wallet_watchAssets".into(),
            ],
            default_channel: ChannelKind::Popup,
        }
    }
}
