use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bridge_common::{ChannelKind, ChannelState, CommError, ControlEvent};
use tracing::{debug, info};
use url::Url;

use super::{Channel, ChannelLink, Lifecycle};
use crate::platform::{origin_of, FrameElement, WindowContext};

struct FrameState {
    element: Option<Arc<dyn FrameElement>>,
    /// Whether `element` was created here, and so may be removed here.
    owned: bool,
}

/// A hidden embedded wallet context for calls that need no confirmation.
///
/// A caller-supplied element is borrowed: it is used as-is, never recreated,
/// and never removed from the document.
pub struct FrameChannel {
    url: Url,
    external: Option<Arc<dyn FrameElement>>,
    lifecycle: Lifecycle,
    open_lock: tokio::sync::Mutex<()>,
    state: Mutex<FrameState>,
}

impl FrameChannel {
    pub fn new(url: Url, ping_interval: Duration, external: Option<Arc<dyn FrameElement>>) -> Self {
        Self {
            lifecycle: Lifecycle::new(ChannelKind::Frame, origin_of(&url), ping_interval),
            url,
            external,
            open_lock: tokio::sync::Mutex::new(()),
            state: Mutex::new(FrameState {
                element: None,
                owned: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FrameState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reuse the current element if it is attached and reachable, otherwise
    /// create a fresh one.
    fn get_or_create(
        &self,
        link: &ChannelLink,
    ) -> Result<(Arc<dyn FrameElement>, Arc<dyn WindowContext>), CommError> {
        if let Some(external) = &self.external {
            let window = external
                .content_window()
                .ok_or(CommError::FrameUnavailable)?;
            let mut state = self.lock();
            state.element = Some(Arc::clone(external));
            state.owned = false;
            return Ok((Arc::clone(external), window));
        }

        let (current, owned) = {
            let state = self.lock();
            (state.element.clone(), state.owned)
        };
        if let Some(element) = current {
            if element.is_attached() {
                if let Some(window) = element.content_window() {
                    return Ok((element, window));
                }
                if owned {
                    element.remove();
                }
            }
        }

        let element = link
            .platform
            .create_frame(&self.url)
            .ok_or(CommError::FrameUnavailable)?;
        let window = element
            .content_window()
            .ok_or(CommError::FrameUnavailable)?;
        debug!(url = %self.url, "frame created");

        let mut state = self.lock();
        state.element = Some(Arc::clone(&element));
        state.owned = true;
        Ok((element, window))
    }
}

#[async_trait]
impl Channel for FrameChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Frame
    }

    fn target_origin(&self) -> &str {
        self.lifecycle.origin()
    }

    fn state(&self) -> ChannelState {
        self.lifecycle.current()
    }

    async fn ready(&self, link: &ChannelLink) -> Result<Arc<dyn WindowContext>, CommError> {
        let _opening = self.open_lock.lock().await;

        let phase = self.lifecycle.current();
        let reusable = {
            let state = self.lock();
            match (&state.element, phase) {
                (Some(element), ChannelState::Ready) if element.is_attached() => {
                    element.content_window()
                }
                _ => None,
            }
        };
        if let Some(window) = reusable {
            return Ok(window);
        }

        self.lifecycle.set(link, ChannelState::Opening);
        let (_element, window) = match self.get_or_create(link) {
            Ok(found) => found,
            Err(e) => {
                self.lifecycle.set(link, ChannelState::Closed);
                return Err(e);
            }
        };

        self.lifecycle
            .handshake(
                link,
                &window,
                ControlEvent::FrameLoaded,
                ControlEvent::FrameLoadedPing,
                ChannelState::Closed,
            )
            .await?;
        info!(origin = %self.lifecycle.origin(), "frame ready");
        Ok(window)
    }

    fn teardown(&self, link: &ChannelLink) {
        let (element, owned) = {
            let mut state = self.lock();
            let owned = std::mem::replace(&mut state.owned, false);
            (state.element.take(), owned)
        };

        if let Some(element) = element {
            if owned {
                element.remove();
            }
        }
        self.lifecycle.close(link);
    }
}
