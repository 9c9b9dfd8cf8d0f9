use std::path::PathBuf;

use crate::types::ChannelKind;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Failures surfaced to callers of the communicator.
///
/// Every variant is scoped to the asynchronous operation it rejects; a
/// whole-channel failure is delivered as one `RequestRejected` per waiter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommError {
    #[error("failed to open popup: blocked by the browser")]
    PopupBlocked,

    #[error("request rejected")]
    RequestRejected,

    #[error("wallet frame unavailable")]
    FrameUnavailable,

    #[error("no target origin configured for the {0} channel")]
    UnsupportedMethod(ChannelKind),

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("wallet error {code}: {message}")]
    Wallet { code: i64, message: String },

    #[error("no accounts returned by wallet")]
    NoAccounts,

    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Comm(#[from] CommError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
