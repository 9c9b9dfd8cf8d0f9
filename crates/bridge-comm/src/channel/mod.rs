//! Channels: one leg of the bridge each, with its own lifecycle.
//!
//! Both variants share one contract. `ready` opens (or reuses) the remote
//! context and completes the ping handshake; `teardown` releases it. The
//! communicator composes them without knowing which is which.

mod frame;
mod popup;

use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bridge_common::{
    BridgeEvent, ChannelKind, ChannelState, CommError, ControlEvent, ControlMessage, EventBus,
};
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::platform::{Platform, WindowContext};
use crate::registry::ListenerRegistry;

pub use frame::FrameChannel;
pub use popup::{FallbackOpener, PopupChannel, RetryOpener};

/// Invoked when a channel detects that its remote context is gone.
pub(crate) type LostHook = Arc<dyn Fn(ChannelKind) + Send + Sync>;

/// What a channel needs from its owner.
#[derive(Clone)]
pub struct ChannelLink {
    pub(crate) platform: Arc<dyn Platform>,
    pub(crate) registry: ListenerRegistry,
    pub(crate) events: Arc<EventBus>,
    pub(crate) on_lost: LostHook,
}

impl ChannelLink {
    pub(crate) fn publish_state(&self, kind: ChannelKind, state: ChannelState) {
        debug!(%kind, ?state, "channel state");
        self.events
            .publish(BridgeEvent::ChannelStateChanged { kind, state });
    }
}

#[async_trait]
pub trait Channel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    /// Origin every message to and from this channel is scoped to.
    fn target_origin(&self) -> &str;

    fn state(&self) -> ChannelState;

    /// Open or reuse the remote context and make sure it has completed the
    /// handshake. Concurrent callers share a single handshake.
    async fn ready(&self, link: &ChannelLink) -> Result<Arc<dyn WindowContext>, CommError>;

    /// Stop timers and release the remote context. Idempotent.
    fn teardown(&self, link: &ChannelLink);
}

/// A repeating task that stops when dropped.
pub(crate) struct Ticker {
    handle: JoinHandle<()>,
}

impl Ticker {
    pub(crate) fn spawn<F>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        let period = period.max(Duration::from_millis(1));
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tick().is_break() {
                    break;
                }
            }
        });
        Self { handle }
    }

    pub(crate) fn abort_handle(&self) -> AbortHandle {
        self.handle.abort_handle()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Post `event` into `window` every `period` until dropped or the window closes.
pub(crate) fn ping(
    window: Arc<dyn WindowContext>,
    origin: String,
    event: ControlEvent,
    period: Duration,
) -> Ticker {
    let message = ControlMessage::new(event).to_value();
    Ticker::spawn(period, move || {
        if window.is_closed() {
            return ControlFlow::Break(());
        }
        window.post_message(&message, &origin);
        ControlFlow::Continue(())
    })
}

pub(crate) fn is_event(expected: ControlEvent) -> impl Fn(&serde_json::Value) -> bool + Send + Sync {
    move |data| ControlEvent::of(data) == Some(expected)
}

struct Phase {
    current: ChannelState,
    ping: Option<AbortHandle>,
    /// Bumped by every `close`, so a handshake can tell it was torn down.
    epoch: u64,
}

/// Phase tracking and the ping handshake, shared by both channel variants.
pub(crate) struct Lifecycle {
    kind: ChannelKind,
    origin: String,
    ping_interval: Duration,
    phase: Mutex<Phase>,
}

impl Lifecycle {
    pub(crate) fn new(kind: ChannelKind, origin: String, ping_interval: Duration) -> Self {
        Self {
            kind,
            origin,
            ping_interval,
            phase: Mutex::new(Phase {
                current: ChannelState::Closed,
                ping: None,
                epoch: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn origin(&self) -> &str {
        &self.origin
    }

    pub(crate) fn current(&self) -> ChannelState {
        self.lock().current
    }

    pub(crate) fn set(&self, link: &ChannelLink, state: ChannelState) {
        self.lock().current = state;
        link.publish_state(self.kind, state);
    }

    /// Ping `window` with `ping_event` until the wallet answers with `loaded`,
    /// then mark the channel Ready.
    ///
    /// If the returned future is dropped before the wallet answers, the phase
    /// falls back to `on_cancel` and the ping stops.
    pub(crate) async fn handshake(
        &self,
        link: &ChannelLink,
        window: &Arc<dyn WindowContext>,
        loaded: ControlEvent,
        ping_event: ControlEvent,
        on_cancel: ChannelState,
    ) -> Result<(), CommError> {
        let epoch = {
            let mut phase = self.lock();
            phase.current = ChannelState::Handshaking;
            phase.epoch
        };
        link.publish_state(self.kind, ChannelState::Handshaking);
        let mut guard = HandshakeGuard {
            lifecycle: self,
            link,
            epoch,
            on_cancel,
            armed: true,
        };

        let waiter = link
            .registry
            .await_matching(&self.origin, self.kind, is_event(loaded));
        let pinger = ping(
            Arc::clone(window),
            self.origin.clone(),
            ping_event,
            self.ping_interval,
        );
        self.lock().ping = Some(pinger.abort_handle());

        let outcome = waiter.recv().await;
        drop(pinger);
        guard.armed = false;

        let mut phase = self.lock();
        phase.ping = None;
        outcome?;
        if phase.epoch != epoch {
            // Torn down after the wallet answered but before we got here.
            return Err(CommError::RequestRejected);
        }
        phase.current = ChannelState::Ready;
        drop(phase);
        link.publish_state(self.kind, ChannelState::Ready);
        Ok(())
    }

    /// Stop any handshake ping and mark the channel Closed.
    pub(crate) fn close(&self, link: &ChannelLink) {
        let (previous, ping) = {
            let mut phase = self.lock();
            phase.epoch += 1;
            (
                std::mem::replace(&mut phase.current, ChannelState::Closed),
                phase.ping.take(),
            )
        };
        if let Some(ping) = ping {
            ping.abort();
        }
        if previous != ChannelState::Closed {
            link.publish_state(self.kind, ChannelState::Closed);
        }
    }
}

/// Rolls the phase back when a handshake future is dropped mid-flight.
struct HandshakeGuard<'a> {
    lifecycle: &'a Lifecycle,
    link: &'a ChannelLink,
    epoch: u64,
    on_cancel: ChannelState,
    armed: bool,
}

impl Drop for HandshakeGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let rolled_back = {
            let mut phase = self.lifecycle.lock();
            if phase.epoch != self.epoch || phase.current != ChannelState::Handshaking {
                false
            } else {
                phase.current = self.on_cancel;
                if let Some(ping) = phase.ping.take() {
                    ping.abort();
                }
                true
            }
        };
        if rolled_back {
            debug!(kind = %self.lifecycle.kind, "handshake abandoned");
            self.link.publish_state(self.lifecycle.kind, self.on_cancel);
        }
    }
}
