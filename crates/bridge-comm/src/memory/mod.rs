//! In-process platform backend.
//!
//! Windows and frames are plain structs, `postMessage` is a queue, and the
//! host's `message` event is `MemoryPlatform::dispatch`. Paired with
//! `SimulatedWallet`, it runs the whole bridge inside one tokio runtime.

mod wallet;
mod window;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, trace};
use url::Url;

use crate::platform::{
    FrameElement, InboundMessage, ListenerId, MessageCallback, Platform, Viewport, WindowContext,
    WindowFeatures,
};

pub use wallet::{Responder, SimulatedWallet};
pub use window::{MemoryFrame, MemoryWindow, PostedMessage};

/// A context that came into existence on the platform.
#[derive(Clone)]
pub enum Opened {
    Window(Arc<MemoryWindow>),
    Frame(Arc<MemoryFrame>),
}

impl Opened {
    pub fn window(&self) -> &Arc<MemoryWindow> {
        match self {
            Self::Window(window) => window,
            Self::Frame(frame) => frame.window(),
        }
    }
}

#[derive(Default)]
struct PlatformState {
    block_popups: bool,
    blocked_opens: usize,
    frames_unavailable: bool,
    open_attempts: usize,
    windows: Vec<Arc<MemoryWindow>>,
    frames: Vec<Arc<MemoryFrame>>,
    next_listener: u64,
    listeners: BTreeMap<ListenerId, MessageCallback>,
}

pub struct MemoryPlatform {
    viewport: Viewport,
    state: Mutex<PlatformState>,
    opened: broadcast::Sender<Opened>,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self::with_viewport(Viewport::default())
    }

    pub fn with_viewport(viewport: Viewport) -> Self {
        let (opened, _) = broadcast::channel(64);
        Self {
            viewport,
            state: Mutex::new(PlatformState::default()),
            opened,
        }
    }

    fn lock(&self) -> MutexGuard<'_, PlatformState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Refuse every popup, like a browser without a user gesture.
    pub fn block_popups(&self, blocked: bool) {
        self.lock().block_popups = blocked;
    }

    /// Refuse only the next `count` popups.
    pub fn block_next_opens(&self, count: usize) {
        self.lock().blocked_opens = count;
    }

    pub fn set_frames_unavailable(&self, unavailable: bool) {
        self.lock().frames_unavailable = unavailable;
    }

    /// Calls to `open_window`, blocked ones included.
    pub fn open_attempts(&self) -> usize {
        self.lock().open_attempts
    }

    pub fn windows(&self) -> Vec<Arc<MemoryWindow>> {
        self.lock().windows.clone()
    }

    pub fn last_window(&self) -> Option<Arc<MemoryWindow>> {
        self.lock().windows.last().cloned()
    }

    pub fn frames(&self) -> Vec<Arc<MemoryFrame>> {
        self.lock().frames.clone()
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    /// Announces every window and frame created from now on.
    pub fn subscribe_opened(&self) -> broadcast::Receiver<Opened> {
        self.opened.subscribe()
    }

    /// A frame the embedding page created itself, for handing to the bridge
    /// as a borrowed element.
    pub fn create_external_frame(&self, url: &Url) -> Arc<MemoryFrame> {
        let frame = Arc::new(MemoryFrame::new(url));
        self.lock().frames.push(Arc::clone(&frame));
        let _ = self.opened.send(Opened::Frame(Arc::clone(&frame)));
        frame
    }

    /// Deliver a `message` event from `origin` to every registered listener.
    ///
    /// Listeners run outside the platform lock so they may add or remove
    /// listeners themselves.
    pub fn dispatch(&self, origin: &str, data: Value) {
        let listeners: Vec<MessageCallback> = self.lock().listeners.values().cloned().collect();
        trace!(origin, listeners = listeners.len(), "dispatch");

        let event = InboundMessage {
            origin: origin.to_string(),
            data,
        };
        for listener in listeners {
            listener(&event);
        }
    }
}

impl Default for MemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for MemoryPlatform {
    fn open_window(
        &self,
        url: &Url,
        name: &str,
        features: &WindowFeatures,
    ) -> Option<Arc<dyn WindowContext>> {
        let window = {
            let mut state = self.lock();
            state.open_attempts += 1;
            if state.block_popups {
                debug!(%url, "popup blocked");
                return None;
            }
            if state.blocked_opens > 0 {
                state.blocked_opens -= 1;
                debug!(%url, "popup blocked");
                return None;
            }
            let window = Arc::new(MemoryWindow::new(url, name, Some(*features)));
            state.windows.push(Arc::clone(&window));
            window
        };

        let _ = self.opened.send(Opened::Window(Arc::clone(&window)));
        Some(window)
    }

    fn create_frame(&self, url: &Url) -> Option<Arc<dyn FrameElement>> {
        let frame = {
            let mut state = self.lock();
            if state.frames_unavailable {
                return None;
            }
            let frame = Arc::new(MemoryFrame::new(url));
            state.frames.push(Arc::clone(&frame));
            frame
        };

        let _ = self.opened.send(Opened::Frame(Arc::clone(&frame)));
        Some(frame)
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn add_message_listener(&self, callback: MessageCallback) -> ListenerId {
        let mut state = self.lock();
        let id = ListenerId(state.next_listener);
        state.next_listener += 1;
        state.listeners.insert(id, callback);
        id
    }

    fn remove_message_listener(&self, id: ListenerId) {
        self.lock().listeners.remove(&id);
    }
}
