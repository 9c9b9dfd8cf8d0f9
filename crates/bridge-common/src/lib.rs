pub mod errors;
pub mod events;
pub mod id;
pub mod protocol;
pub mod types;

pub use errors::{BridgeError, CommError, ConfigError};
pub use events::{BridgeEvent, EventBus};
pub use id::{new_correlation_id, new_id};
pub use protocol::{ControlEvent, ControlMessage, Message, Reply, ReplyPayload, RpcError};
pub use types::{ChannelKind, ChannelState, Scope};

pub type Result<T> = std::result::Result<T, BridgeError>;
