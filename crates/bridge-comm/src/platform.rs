//! Boundary between the communicator and the browser.
//!
//! The communicator never touches a window or frame directly; it goes through
//! these traits. A browser host implements them over `window.open`,
//! `postMessage`, and `<iframe>` elements; `MemoryPlatform` implements them
//! in-process for tests and simulation.

use std::sync::Arc;

use serde_json::Value;
use url::Url;

/// A browsing context that messages can be posted into.
pub trait WindowContext: Send + Sync {
    /// Deliver `data` to the context if its origin matches `target_origin`.
    fn post_message(&self, data: &Value, target_origin: &str);
    fn is_closed(&self) -> bool;
    fn focus(&self);
    fn close(&self);
}

/// An embedded frame element living in the host document.
pub trait FrameElement: Send + Sync {
    fn is_attached(&self) -> bool;
    /// The frame's browsing context, if it is reachable.
    fn content_window(&self) -> Option<Arc<dyn WindowContext>>;
    /// Detach the element from the document.
    fn remove(&self);
}

/// A `message` event received by the host window.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub origin: String,
    pub data: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

pub type MessageCallback = Arc<dyn Fn(&InboundMessage) + Send + Sync>;

/// The host page's window.
pub trait Platform: Send + Sync {
    /// Open a top-level window. `None` means the browser blocked it.
    fn open_window(
        &self,
        url: &Url,
        name: &str,
        features: &WindowFeatures,
    ) -> Option<Arc<dyn WindowContext>>;

    /// Create a hidden frame pointed at `url` and attach it to the document.
    fn create_frame(&self, url: &Url) -> Option<Arc<dyn FrameElement>>;

    fn viewport(&self) -> Viewport;

    fn add_message_listener(&self, callback: MessageCallback) -> ListenerId;

    fn remove_message_listener(&self, id: ListenerId);
}

/// Size and screen position of the host window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub inner_width: f64,
    pub inner_height: f64,
    pub screen_x: f64,
    pub screen_y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            inner_width: 1280.0,
            inner_height: 800.0,
            screen_x: 0.0,
            screen_y: 0.0,
        }
    }
}

/// Geometry handed to the window-opening primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowFeatures {
    pub width: u32,
    pub height: u32,
    pub left: f64,
    pub top: f64,
}

impl WindowFeatures {
    /// Center a `width` x `height` window over the host viewport.
    pub fn centered(width: u32, height: u32, viewport: Viewport) -> Self {
        Self {
            width,
            height,
            left: (viewport.inner_width - f64::from(width)) / 2.0 + viewport.screen_x,
            top: (viewport.inner_height - f64::from(height)) / 2.0 + viewport.screen_y,
        }
    }

    /// Render as a `window.open` feature string.
    pub fn to_feature_string(&self) -> String {
        format!(
            "width={}, height={}, left={}, top={}",
            self.width, self.height, self.left, self.top
        )
    }
}

/// Serialized origin of a URL, as carried by `MessageEvent.origin`.
pub fn origin_of(url: &Url) -> String {
    url.origin().ascii_serialization()
}
