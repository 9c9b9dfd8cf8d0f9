//! The communicator facade.
//!
//! Composes the popup and frame channels with the listener registry and
//! presents every RPC as one ordinary asynchronous call: route, make sure
//! the channel is ready, register the reply waiter, send, await.

mod config;

use std::sync::{Arc, Weak};

use bridge_common::{BridgeEvent, ChannelKind, ChannelState, CommError, EventBus, Message, Scope};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use crate::channel::{Channel, ChannelLink, FrameChannel, LostHook, PopupChannel};
use crate::platform::{Platform, WindowContext};
use crate::registry::{ListenerRegistry, Waiter};
use crate::router::MethodRouter;

pub use config::CommunicatorConfig;

struct Inner {
    link: ChannelLink,
    popup: Option<PopupChannel>,
    frame: Option<FrameChannel>,
    router: MethodRouter,
}

impl Inner {
    fn channel(&self, kind: ChannelKind) -> Result<&dyn Channel, CommError> {
        let channel = match kind {
            ChannelKind::Popup => self.popup.as_ref().map(|c| c as &dyn Channel),
            ChannelKind::Frame => self.frame.as_ref().map(|c| c as &dyn Channel),
        };
        channel.ok_or(CommError::UnsupportedMethod(kind))
    }

    fn disconnect(&self, scope: Scope) {
        for kind in scope.kinds() {
            if let Ok(channel) = self.channel(*kind) {
                channel.teardown(&self.link);
            }
        }
        self.link.registry.reject_and_clear(scope);
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.disconnect(Scope::Both);
    }
}

/// Handle to the bridge. Cheap to clone; all clones share the same channels.
#[derive(Clone)]
pub struct Communicator {
    inner: Arc<Inner>,
}

impl Communicator {
    pub fn new(platform: Arc<dyn Platform>, config: CommunicatorConfig) -> Self {
        let registry = ListenerRegistry::new(Arc::clone(&platform));
        let events = Arc::new(EventBus::default());

        let popup = config.popup_url.map(|url| {
            PopupChannel::new(
                url,
                config.window_name,
                config.popup_width,
                config.popup_height,
                config.ping_interval,
                config.liveness_interval,
                config.fallback_opener,
            )
        });
        let frame = config
            .frame_url
            .map(|url| FrameChannel::new(url, config.ping_interval, config.external_frame));
        let router = config.router;

        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            let weak = weak.clone();
            let on_lost: LostHook = Arc::new(move |kind: ChannelKind| {
                if let Some(inner) = weak.upgrade() {
                    debug!(%kind, "channel lost");
                    inner.disconnect(kind.into());
                }
            });
            Inner {
                link: ChannelLink {
                    platform,
                    registry,
                    events,
                    on_lost,
                },
                popup,
                frame,
                router,
            }
        });

        Self { inner }
    }

    pub fn router(&self) -> &MethodRouter {
        &self.inner.router
    }

    /// Which channel a request is routed to.
    pub fn route(&self, message: &Message) -> ChannelKind {
        self.inner.router.route(message.method())
    }

    /// Origin the given channel is scoped to, if it is configured.
    pub fn target_origin(&self, kind: ChannelKind) -> Option<&str> {
        self.inner.channel(kind).ok().map(|c| c.target_origin())
    }

    pub fn state(&self, kind: ChannelKind) -> ChannelState {
        self.inner
            .channel(kind)
            .map(|c| c.state())
            .unwrap_or(ChannelState::Closed)
    }

    /// Number of pending waiters owned by channels in `scope`.
    pub fn pending(&self, scope: Scope) -> usize {
        self.inner.link.registry.len(scope)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.inner.link.events.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.link.events
    }

    /// Open the channel and complete its handshake without sending anything.
    pub async fn open(&self, kind: ChannelKind) -> Result<(), CommError> {
        let channel = self.inner.channel(kind)?;
        channel.ready(&self.inner.link).await.map(|_| ())
    }

    /// Deliver a message into the channel's context, opening it first if needed.
    pub async fn send(&self, message: &Message, kind: ChannelKind) -> Result<(), CommError> {
        let channel = self.inner.channel(kind)?;
        let target = channel.ready(&self.inner.link).await?;
        post(channel, target.as_ref(), message)
    }

    /// Send a request on the channel its method routes to and wait for the
    /// reply carrying the same correlation id.
    ///
    /// Replies may arrive in any order; each resolves only its own caller.
    pub async fn send_and_await_reply<R>(&self, request: &Message) -> Result<R, CommError>
    where
        R: DeserializeOwned,
    {
        let kind = self.route(request);
        let channel = self.inner.channel(kind)?;
        let target = channel.ready(&self.inner.link).await?;

        // Between `ready`, which may reject stale popup waiters, and the post.
        let waiter = self.inner.link.registry.await_reply(
            channel.target_origin(),
            kind,
            &request.correlation_id,
        )?;
        if target.is_closed() {
            return Err(CommError::RequestRejected);
        }

        post(channel, target.as_ref(), request)?;
        let data = waiter.recv().await?;
        debug!(%kind, correlation_id = %request.correlation_id, "reply received");

        serde_json::from_value(data).map_err(|e| {
            CommError::ProtocolViolation(format!(
                "malformed reply to {}: {e}",
                request.correlation_id
            ))
        })
    }

    /// Wait for the first message from the channel's origin that satisfies
    /// `predicate`. The wait is registered before this returns.
    pub fn await_matching<P>(&self, kind: ChannelKind, predicate: P) -> Result<Waiter, CommError>
    where
        P: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        let channel = self.inner.channel(kind)?;
        Ok(self
            .inner
            .link
            .registry
            .await_matching(channel.target_origin(), kind, predicate))
    }

    /// Tear down the channels in `scope` and reject every waiter they own.
    /// Waiters on other channels are untouched.
    pub fn disconnect(&self, scope: Scope) {
        debug!(?scope, "disconnect");
        self.inner.disconnect(scope);
    }
}

fn post(
    channel: &dyn Channel,
    target: &dyn WindowContext,
    message: &Message,
) -> Result<(), CommError> {
    let data = serde_json::to_value(message)
        .map_err(|e| CommError::ProtocolViolation(format!("unserializable message: {e}")))?;
    target.post_message(&data, channel.target_origin());
    debug!(
        kind = %channel.kind(),
        correlation_id = %message.correlation_id,
        "message posted"
    );
    Ok(())
}
