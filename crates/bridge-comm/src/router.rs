//! Method router: decides which channel an RPC method must use.
//!
//! Methods that need no user confirmation go to the hidden frame; everything
//! else goes to the default channel (the popup unless overridden).

use std::collections::HashSet;

use bridge_common::ChannelKind;
use bridge_config::RoutingConfig;

/// Methods that are side-effect free and can be answered silently.
pub const DEFAULT_FRAME_METHODS: &[&str] = &["aztec_accounts", "aztec_call"];

#[derive(Debug, Clone)]
pub struct MethodRouter {
    frame_methods: HashSet<String>,
    default_channel: ChannelKind,
}

impl MethodRouter {
    pub fn new<I, S>(frame_methods: I, default_channel: ChannelKind) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            frame_methods: frame_methods.into_iter().map(Into::into).collect(),
            default_channel,
        }
    }

    pub fn from_config(config: &RoutingConfig) -> Self {
        Self::new(config.frame_methods.iter().cloned(), config.default_channel)
    }

    /// Route a request by the method named in its payload.
    pub fn route(&self, method: Option<&str>) -> ChannelKind {
        match method {
            Some(method) if self.frame_methods.contains(method) => ChannelKind::Frame,
            _ => self.default_channel,
        }
    }

    pub fn add_frame_method(&mut self, method: impl Into<String>) {
        self.frame_methods.insert(method.into());
    }

    pub fn remove_frame_method(&mut self, method: &str) -> bool {
        self.frame_methods.remove(method)
    }

    pub fn set_default_channel(&mut self, kind: ChannelKind) {
        self.default_channel = kind;
    }

    pub fn default_channel(&self) -> ChannelKind {
        self.default_channel
    }

    pub fn is_frame_method(&self, method: &str) -> bool {
        self.frame_methods.contains(method)
    }
}

impl Default for MethodRouter {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_METHODS.iter().copied(), ChannelKind::Popup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_routes_reads_to_frame() {
        let router = MethodRouter::default();
        assert_eq!(router.route(Some("aztec_call")), ChannelKind::Frame);
        assert_eq!(router.route(Some("aztec_accounts")), ChannelKind::Frame);
    }

    #[test]
    fn default_routes_everything_else_to_popup() {
        let router = MethodRouter::default();
        assert_eq!(router.route(Some("aztec_sendTransaction")), ChannelKind::Popup);
        assert_eq!(router.route(Some("aztec_requestAccounts")), ChannelKind::Popup);
        assert_eq!(router.route(Some("")), ChannelKind::Popup);
    }

    #[test]
    fn missing_method_uses_default_channel() {
        let router = MethodRouter::default();
        assert_eq!(router.route(None), ChannelKind::Popup);

        let router = MethodRouter::new(Vec::<String>::new(), ChannelKind::Frame);
        assert_eq!(router.route(None), ChannelKind::Frame);
    }

    #[test]
    fn method_names_are_case_sensitive() {
        let router = MethodRouter::default();
        assert_eq!(router.route(Some("AZTEC_CALL")), ChannelKind::Popup);
    }

    #[test]
    fn overridable_at_construction() {
        let mut router = MethodRouter::new(["read_only_call"], ChannelKind::Popup);
        assert_eq!(router.route(Some("read_only_call")), ChannelKind::Frame);
        assert_eq!(router.route(Some("aztec_call")), ChannelKind::Popup);

        router.add_frame_method("aztec_call");
        assert!(router.is_frame_method("aztec_call"));
        assert!(router.remove_frame_method("read_only_call"));
        assert_eq!(router.route(Some("read_only_call")), ChannelKind::Popup);
    }

    #[test]
    fn from_routing_config() {
        let config = RoutingConfig {
            frame_methods: vec!["aztec_getBalance".into()],
            default_channel: ChannelKind::Frame,
            ..Default::default()
        };
        let router = MethodRouter::from_config(&config);
        assert_eq!(router.route(Some("aztec_getBalance")), ChannelKind::Frame);
        assert_eq!(router.route(Some("aztec_call")), ChannelKind::Frame);
        assert_eq!(router.default_channel(), ChannelKind::Frame);
    }
}
