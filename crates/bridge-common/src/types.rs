use serde::{Deserialize, Serialize};
use std::fmt;

/// One leg of the bridge: a visible popup window or a hidden embedded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Popup,
    Frame,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Popup => write!(f, "popup"),
            Self::Frame => write!(f, "frame"),
        }
    }
}

/// Lifecycle of a single channel.
///
/// `Closed -> Opening -> Handshaking -> Ready -> Closed`. `Ready` is reused
/// across requests until a disconnect returns the channel to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelState {
    Closed,
    Opening,
    Handshaking,
    Ready,
}

/// Which channels a disconnect applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Popup,
    Frame,
    Both,
}

impl Scope {
    pub fn includes(&self, kind: ChannelKind) -> bool {
        match self {
            Self::Both => true,
            Self::Popup => kind == ChannelKind::Popup,
            Self::Frame => kind == ChannelKind::Frame,
        }
    }

    pub fn kinds(&self) -> &'static [ChannelKind] {
        match self {
            Self::Popup => &[ChannelKind::Popup],
            Self::Frame => &[ChannelKind::Frame],
            Self::Both => &[ChannelKind::Popup, ChannelKind::Frame],
        }
    }
}

impl From<ChannelKind> for Scope {
    fn from(kind: ChannelKind) -> Self {
        match kind {
            ChannelKind::Popup => Self::Popup,
            ChannelKind::Frame => Self::Frame,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_kind_display() {
        assert_eq!(ChannelKind::Popup.to_string(), "popup");
        assert_eq!(ChannelKind::Frame.to_string(), "frame");
    }

    #[test]
    fn channel_kind_serializes_lowercase() {
        let json = serde_json::to_string(&ChannelKind::Frame).unwrap();
        assert_eq!(json, "\"frame\"");
        let kind: ChannelKind = serde_json::from_str("\"popup\"").unwrap();
        assert_eq!(kind, ChannelKind::Popup);
    }

    #[test]
    fn scope_includes() {
        assert!(Scope::Both.includes(ChannelKind::Popup));
        assert!(Scope::Both.includes(ChannelKind::Frame));
        assert!(Scope::Popup.includes(ChannelKind::Popup));
        assert!(!Scope::Popup.includes(ChannelKind::Frame));
        assert!(!Scope::Frame.includes(ChannelKind::Popup));
    }

    #[test]
    fn scope_kinds_match_includes() {
        for scope in [Scope::Popup, Scope::Frame, Scope::Both] {
            for kind in scope.kinds() {
                assert!(scope.includes(*kind));
            }
        }
        assert_eq!(Scope::Both.kinds().len(), 2);
    }

    #[test]
    fn scope_from_kind() {
        assert_eq!(Scope::from(ChannelKind::Popup), Scope::Popup);
        assert_eq!(Scope::from(ChannelKind::Frame), Scope::Frame);
    }
}
