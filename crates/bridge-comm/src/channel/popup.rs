use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bridge_common::{ChannelKind, ChannelState, CommError, ControlEvent};
use futures_util::future::BoxFuture;
use tracing::{debug, info, warn};
use url::Url;

use super::{is_event, Channel, ChannelLink, Lifecycle, Ticker};
use crate::platform::{origin_of, WindowContext, WindowFeatures};

/// Re-attempts the window-opening primitive with the channel's URL and geometry.
pub type RetryOpener = Box<dyn Fn() -> Option<Arc<dyn WindowContext>> + Send + Sync>;

/// Called when the browser blocks the popup. It should run the retry opener
/// from a fresh user gesture, such as a "continue" button click.
pub type FallbackOpener =
    Arc<dyn Fn(RetryOpener) -> BoxFuture<'static, Option<Arc<dyn WindowContext>>> + Send + Sync>;

struct PopupState {
    window: Option<Arc<dyn WindowContext>>,
    liveness: Option<Ticker>,
}

/// A visible wallet window for anything that needs user confirmation.
pub struct PopupChannel {
    url: Url,
    window_name: String,
    width: u32,
    height: u32,
    liveness_interval: Duration,
    fallback: Option<FallbackOpener>,
    lifecycle: Lifecycle,
    open_lock: tokio::sync::Mutex<()>,
    state: Mutex<PopupState>,
}

impl PopupChannel {
    pub fn new(
        url: Url,
        window_name: impl Into<String>,
        width: u32,
        height: u32,
        ping_interval: Duration,
        liveness_interval: Duration,
        fallback: Option<FallbackOpener>,
    ) -> Self {
        Self {
            lifecycle: Lifecycle::new(ChannelKind::Popup, origin_of(&url), ping_interval),
            url,
            window_name: window_name.into(),
            width,
            height,
            liveness_interval,
            fallback,
            open_lock: tokio::sync::Mutex::new(()),
            state: Mutex::new(PopupState {
                window: None,
                liveness: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PopupState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn open_window(&self, link: &ChannelLink) -> Result<Arc<dyn WindowContext>, CommError> {
        let features = WindowFeatures::centered(self.width, self.height, link.platform.viewport());
        let opener = {
            let platform = Arc::clone(&link.platform);
            let url = self.url.clone();
            let name = self.window_name.clone();
            move || {
                let window = platform.open_window(&url, &name, &features)?;
                window.focus();
                Some(window)
            }
        };

        if let Some(window) = opener() {
            return Ok(window);
        }

        let Some(fallback) = &self.fallback else {
            return Err(CommError::PopupBlocked);
        };
        warn!(url = %self.url, "popup blocked, trying fallback opener");
        fallback(Box::new(opener))
            .await
            .ok_or(CommError::PopupBlocked)
    }

    /// Watch for the user closing the window.
    fn watch_liveness(&self, link: &ChannelLink, window: Arc<dyn WindowContext>) -> Ticker {
        let on_lost = Arc::clone(&link.on_lost);
        Ticker::spawn(self.liveness_interval, move || {
            if window.is_closed() {
                debug!("popup closed by user");
                on_lost(ChannelKind::Popup);
                return ControlFlow::Break(());
            }
            ControlFlow::Continue(())
        })
    }

    /// Disconnect when the wallet announces it is unloading. Never arriving is fine.
    fn watch_unload(&self, link: &ChannelLink) {
        let unload = link.registry.await_matching(
            self.lifecycle.origin(),
            ChannelKind::Popup,
            is_event(ControlEvent::WalletUnloaded),
        );
        let on_lost = Arc::clone(&link.on_lost);
        tokio::spawn(async move {
            if unload.recv().await.is_ok() {
                debug!("wallet unloaded");
                on_lost(ChannelKind::Popup);
            }
        });
    }
}

#[async_trait]
impl Channel for PopupChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Popup
    }

    fn target_origin(&self) -> &str {
        self.lifecycle.origin()
    }

    fn state(&self) -> ChannelState {
        self.lifecycle.current()
    }

    async fn ready(&self, link: &ChannelLink) -> Result<Arc<dyn WindowContext>, CommError> {
        let _opening = self.open_lock.lock().await;

        let existing = self.lock().window.clone();
        let existing = existing.map(|window| (window, self.lifecycle.current()));

        let window = match existing {
            Some((window, ChannelState::Ready)) if !window.is_closed() => {
                // The user may have unfocused it between requests.
                window.focus();
                return Ok(window);
            }
            // A handshake was abandoned midway; the window is still usable.
            Some((window, _)) if !window.is_closed() => {
                window.focus();
                window
            }
            stale => {
                if stale.is_some() {
                    (link.on_lost)(ChannelKind::Popup);
                }
                self.lifecycle.set(link, ChannelState::Opening);
                let window = match self.open_window(link).await {
                    Ok(window) => window,
                    Err(e) => {
                        self.lifecycle.set(link, ChannelState::Closed);
                        return Err(e);
                    }
                };
                info!(url = %self.url, "popup opened");

                let liveness = self.watch_liveness(link, Arc::clone(&window));
                {
                    let mut state = self.lock();
                    state.window = Some(Arc::clone(&window));
                    state.liveness = Some(liveness);
                }
                self.watch_unload(link);
                window
            }
        };

        self.lifecycle
            .handshake(
                link,
                &window,
                ControlEvent::WalletLoaded,
                ControlEvent::WalletLoadedPing,
                ChannelState::Opening,
            )
            .await?;
        info!(origin = %self.lifecycle.origin(), "popup ready");
        Ok(window)
    }

    fn teardown(&self, link: &ChannelLink) {
        let (window, liveness) = {
            let mut state = self.lock();
            (state.window.take(), state.liveness.take())
        };

        drop(liveness);
        if let Some(window) = window {
            if !window.is_closed() {
                window.close();
            }
        }
        self.lifecycle.close(link);
    }
}
