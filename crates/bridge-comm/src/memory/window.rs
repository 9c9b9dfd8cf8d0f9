use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use bridge_common::ControlEvent;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::trace;
use url::Url;

use crate::platform::{origin_of, FrameElement, WindowContext, WindowFeatures};

/// A message accepted by a `MemoryWindow`.
#[derive(Debug, Clone, PartialEq)]
pub struct PostedMessage {
    pub data: Value,
    pub target_origin: String,
}

/// An in-process browsing context.
///
/// Accepted messages are recorded and queued on an inbox the simulated wallet
/// drains. Closing the window drops the inbox sender, ending that loop.
pub struct MemoryWindow {
    url: Url,
    origin: String,
    name: String,
    features: Option<WindowFeatures>,
    closed: AtomicBool,
    focus_count: AtomicUsize,
    posted: Mutex<Vec<PostedMessage>>,
    inbox_tx: Mutex<Option<mpsc::UnboundedSender<Value>>>,
    inbox_rx: Mutex<Option<mpsc::UnboundedReceiver<Value>>>,
}

impl MemoryWindow {
    pub(crate) fn new(url: &Url, name: &str, features: Option<WindowFeatures>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            origin: origin_of(url),
            url: url.clone(),
            name: name.to_string(),
            features,
            closed: AtomicBool::new(false),
            focus_count: AtomicUsize::new(0),
            posted: Mutex::new(Vec::new()),
            inbox_tx: Mutex::new(Some(tx)),
            inbox_rx: Mutex::new(Some(rx)),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Geometry the window was opened with. `None` for frame contexts.
    pub fn features(&self) -> Option<WindowFeatures> {
        self.features
    }

    pub fn focus_count(&self) -> usize {
        self.focus_count.load(Ordering::SeqCst)
    }

    pub fn posted(&self) -> Vec<PostedMessage> {
        self.posted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count_events(&self, event: ControlEvent) -> usize {
        self.posted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|m| ControlEvent::of(&m.data) == Some(event))
            .count()
    }

    /// Accepted messages that are not control events.
    pub fn data_messages(&self) -> Vec<Value> {
        self.posted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|m| m.data.get("event").is_none())
            .map(|m| m.data.clone())
            .collect()
    }

    /// Hand the inbox to whoever plays the wallet. Only the first call gets it.
    pub fn take_inbox(&self) -> Option<mpsc::UnboundedReceiver<Value>> {
        self.inbox_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// The user closes the window from outside the page.
    pub fn close_by_user(&self) {
        trace!(url = %self.url, "window closed by user");
        self.mark_closed();
    }

    fn mark_closed(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.inbox_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

impl WindowContext for MemoryWindow {
    fn post_message(&self, data: &Value, target_origin: &str) {
        if self.is_closed() {
            return;
        }
        if target_origin != "*" && target_origin != self.origin {
            trace!(target_origin, origin = %self.origin, "post dropped, origin mismatch");
            return;
        }

        self.posted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(PostedMessage {
                data: data.clone(),
                target_origin: target_origin.to_string(),
            });
        if let Some(tx) = self
            .inbox_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            let _ = tx.send(data.clone());
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn focus(&self) {
        self.focus_count.fetch_add(1, Ordering::SeqCst);
    }

    fn close(&self) {
        self.mark_closed();
    }
}

/// An in-process frame element.
pub struct MemoryFrame {
    window: Arc<MemoryWindow>,
    attached: AtomicBool,
    reachable: AtomicBool,
    remove_calls: AtomicUsize,
}

impl MemoryFrame {
    pub(crate) fn new(url: &Url) -> Self {
        Self {
            window: Arc::new(MemoryWindow::new(url, "", None)),
            attached: AtomicBool::new(true),
            reachable: AtomicBool::new(true),
            remove_calls: AtomicUsize::new(0),
        }
    }

    pub fn window(&self) -> &Arc<MemoryWindow> {
        &self.window
    }

    /// How many times `remove` was called on this element.
    pub fn remove_calls(&self) -> usize {
        self.remove_calls.load(Ordering::SeqCst)
    }

    /// The host page drops the element on its own.
    pub fn detach(&self) {
        self.attached.store(false, Ordering::SeqCst);
        self.window.mark_closed();
    }

    /// Make the content window (un)reachable while leaving the element attached.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }
}

impl FrameElement for MemoryFrame {
    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    fn content_window(&self) -> Option<Arc<dyn WindowContext>> {
        if !self.reachable.load(Ordering::SeqCst) || self.window.is_closed() {
            return None;
        }
        Some(Arc::clone(&self.window) as Arc<dyn WindowContext>)
    }

    fn remove(&self) {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);
        self.attached.store(false, Ordering::SeqCst);
        self.window.mark_closed();
    }
}
