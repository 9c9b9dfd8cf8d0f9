use std::sync::Arc;
use std::time::Duration;

use bridge_common::CommError;
use bridge_config::BridgeConfig;
use url::Url;

use crate::channel::FallbackOpener;
use crate::platform::FrameElement;
use crate::router::MethodRouter;

/// Everything a `Communicator` is built from.
///
/// A channel kind without a URL is not configured; routing a request to it
/// fails with `UnsupportedMethod`.
#[derive(Clone)]
pub struct CommunicatorConfig {
    pub popup_url: Option<Url>,
    pub frame_url: Option<Url>,
    pub window_name: String,
    pub popup_width: u32,
    pub popup_height: u32,
    pub ping_interval: Duration,
    pub liveness_interval: Duration,
    /// Invoked only when the primary popup open is blocked.
    pub fallback_opener: Option<FallbackOpener>,
    /// Borrowed frame element to use instead of creating one.
    pub external_frame: Option<Arc<dyn FrameElement>>,
    pub router: MethodRouter,
}

impl Default for CommunicatorConfig {
    fn default() -> Self {
        Self {
            popup_url: None,
            frame_url: None,
            window_name: "Smart Wallet".into(),
            popup_width: 420,
            popup_height: 540,
            ping_interval: Duration::from_millis(100),
            liveness_interval: Duration::from_millis(100),
            fallback_opener: None,
            external_frame: None,
            router: MethodRouter::default(),
        }
    }
}

impl CommunicatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the file-level config. The frame is configured only when
    /// `wallet.frame_path` is non-empty.
    pub fn from_bridge_config(config: &BridgeConfig) -> Result<Self, CommError> {
        let popup_url = parse_url(&config.wallet.popup_url())?;
        let frame_url = config
            .wallet
            .frame_url()
            .map(|url| parse_url(&url))
            .transpose()?;

        Ok(Self {
            popup_url: Some(popup_url),
            frame_url,
            window_name: config.wallet.window_name.clone(),
            popup_width: config.popup.width,
            popup_height: config.popup.height,
            ping_interval: Duration::from_millis(config.timing.ping_interval_ms),
            liveness_interval: Duration::from_millis(config.timing.liveness_interval_ms),
            fallback_opener: None,
            external_frame: None,
            router: MethodRouter::from_config(&config.routing),
        })
    }

    pub fn with_popup_url(mut self, url: Url) -> Self {
        self.popup_url = Some(url);
        self
    }

    pub fn with_frame_url(mut self, url: Url) -> Self {
        self.frame_url = Some(url);
        self
    }

    pub fn with_fallback_opener(mut self, opener: FallbackOpener) -> Self {
        self.fallback_opener = Some(opener);
        self
    }

    pub fn with_external_frame(mut self, element: Arc<dyn FrameElement>) -> Self {
        self.external_frame = Some(element);
        self
    }

    pub fn with_router(mut self, router: MethodRouter) -> Self {
        self.router = router;
        self
    }

    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    pub fn with_liveness_interval(mut self, interval: Duration) -> Self {
        self.liveness_interval = interval;
        self
    }
}

fn parse_url(raw: &str) -> Result<Url, CommError> {
    Url::parse(raw).map_err(|e| CommError::InvalidUrl(format!("{raw}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_common::ChannelKind;

    #[test]
    fn from_default_bridge_config() {
        let config = CommunicatorConfig::from_bridge_config(&BridgeConfig::default()).unwrap();
        assert_eq!(
            config.popup_url.as_ref().map(Url::as_str),
            Some("https://app.obsidion.xyz/sign")
        );
        assert_eq!(
            config.frame_url.as_ref().map(Url::as_str),
            Some("https://app.obsidion.xyz/frame")
        );
        assert_eq!(config.ping_interval, Duration::from_millis(100));
        assert_eq!(config.popup_width, 420);
        assert_eq!(config.router.route(Some("aztec_call")), ChannelKind::Frame);
    }

    #[test]
    fn disabled_frame_has_no_url() {
        let mut bridge = BridgeConfig::default();
        bridge.wallet.frame_path = String::new();
        let config = CommunicatorConfig::from_bridge_config(&bridge).unwrap();
        assert!(config.frame_url.is_none());
    }

    #[test]
    fn invalid_wallet_url_is_reported() {
        let mut bridge = BridgeConfig::default();
        bridge.wallet.url = "::nope::".into();
        let result = CommunicatorConfig::from_bridge_config(&bridge);
        assert!(matches!(result, Err(CommError::InvalidUrl(_))));
    }
}
