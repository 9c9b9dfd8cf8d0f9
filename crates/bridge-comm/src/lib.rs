//! Cross-context RPC communicator for a browser wallet.
//!
//! A page talks to a wallet running in another browser context, either a
//! visible popup window or a hidden embedded frame, using only origin-scoped
//! asynchronous message passing. This crate provides:
//! - A platform boundary (`Platform`, `WindowContext`, `FrameElement`)
//! - A listener registry correlating replies to requests by id and origin
//! - Popup and frame channels with ping handshakes and liveness checks
//! - Method routing between the two channels
//! - The `Communicator` facade and a JSON-RPC `WalletProvider` on top of it
//! - An in-memory platform and simulated wallet for tests and simulation

pub mod channel;
pub mod communicator;
pub mod memory;
pub mod platform;
pub mod provider;
pub mod registry;
pub mod router;

pub use channel::{Channel, FallbackOpener, FrameChannel, PopupChannel, RetryOpener};
pub use communicator::{Communicator, CommunicatorConfig};
pub use memory::{MemoryFrame, MemoryPlatform, MemoryWindow, Opened, SimulatedWallet};
pub use platform::{
    FrameElement, InboundMessage, ListenerId, MessageCallback, Platform, Viewport,
    WindowContext, WindowFeatures,
};
pub use provider::{WalletProvider, DEFAULT_FINAL_METHODS};
pub use registry::{ListenerRegistry, Waiter};
pub use router::MethodRouter;
