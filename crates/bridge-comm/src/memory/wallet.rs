use std::sync::{Arc, Weak};
use std::time::Duration;

use bridge_common::{ControlEvent, ControlMessage, Message, Reply, ReplyPayload, RpcError};
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{MemoryPlatform, MemoryWindow, Opened};
use crate::platform::WindowContext;

/// Produces the full reply value for a request.
pub type Responder = Arc<dyn Fn(&Message) -> Value + Send + Sync>;

type Delay = Arc<dyn Fn(&Message) -> Duration + Send + Sync>;

/// A scripted wallet that serves every context opened on a `MemoryPlatform`.
///
/// It answers handshake pings (after ignoring a configurable number of
/// them, to model a slow load) and replies to data messages from the
/// context's own origin.
#[derive(Clone)]
pub struct SimulatedWallet {
    ignored_pings: usize,
    delay: Delay,
    responder: Responder,
}

impl Default for SimulatedWallet {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedWallet {
    /// A wallet that echoes each request's payload back as its result.
    pub fn new() -> Self {
        Self {
            ignored_pings: 0,
            delay: Arc::new(|_: &Message| Duration::ZERO),
            responder: Arc::new(|request: &Message| {
                reply_value(Reply::success(
                    request.correlation_id.clone(),
                    request.payload.clone(),
                ))
            }),
        }
    }

    /// Stay silent for the first `count` pings on each context.
    pub fn ignore_pings(mut self, count: usize) -> Self {
        self.ignored_pings = count;
        self
    }

    pub fn reply_delay(mut self, delay: Duration) -> Self {
        self.delay = Arc::new(move |_: &Message| delay);
        self
    }

    /// Choose the reply delay per request, so replies can overtake each other.
    pub fn reply_delay_with<F>(mut self, delay: F) -> Self
    where
        F: Fn(&Message) -> Duration + Send + Sync + 'static,
    {
        self.delay = Arc::new(delay);
        self
    }

    /// Answer with a `result` or an `error` body.
    pub fn on_request<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Message) -> Result<Value, RpcError> + Send + Sync + 'static,
    {
        self.responder = Arc::new(move |request: &Message| {
            let reply = match handler(request) {
                Ok(result) => Reply::success(request.correlation_id.clone(), result),
                Err(error) => {
                    let mut reply =
                        Reply::failure(request.correlation_id.clone(), error.code, error.message);
                    if let ReplyPayload::Error(body) = &mut reply.payload {
                        body.error.data = error.data;
                    }
                    reply
                }
            };
            reply_value(reply)
        });
        self
    }

    /// Answer with an arbitrary value, well-formed or not.
    pub fn on_raw_request(mut self, responder: Responder) -> Self {
        self.responder = responder;
        self
    }

    /// Start serving. Contexts opened after this call are picked up.
    pub fn attach(self, platform: &Arc<MemoryPlatform>) -> JoinHandle<()> {
        let mut opened = platform.subscribe_opened();
        let platform = Arc::downgrade(platform);

        tokio::spawn(async move {
            loop {
                match opened.recv().await {
                    Ok(context) => {
                        let window = Arc::clone(context.window());
                        let event = match context {
                            Opened::Window(_) => ControlEvent::WalletLoaded,
                            Opened::Frame(_) => ControlEvent::FrameLoaded,
                        };
                        tokio::spawn(self.clone().serve(window, event, platform.clone()));
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "simulated wallet missed opened contexts");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    async fn serve(
        self,
        window: Arc<MemoryWindow>,
        loaded: ControlEvent,
        platform: Weak<MemoryPlatform>,
    ) {
        let Some(mut inbox) = window.take_inbox() else {
            return;
        };
        let origin = window.origin().to_string();
        let mut pings = 0usize;

        while let Some(data) = inbox.recv().await {
            match ControlEvent::of(&data) {
                Some(ControlEvent::WalletLoadedPing | ControlEvent::FrameLoadedPing) => {
                    pings += 1;
                    if pings <= self.ignored_pings {
                        continue;
                    }
                    if let Some(platform) = platform.upgrade() {
                        platform.dispatch(&origin, ControlMessage::new(loaded).to_value());
                    }
                }
                Some(_) => {}
                None => {
                    let Ok(request) = serde_json::from_value::<Message>(data) else {
                        continue;
                    };
                    debug!(
                        correlation_id = %request.correlation_id,
                        method = ?request.method(),
                        "wallet request"
                    );
                    let delay = (self.delay)(&request);
                    let reply = (self.responder)(&request);
                    let window = Arc::clone(&window);
                    let origin = origin.clone();
                    let platform = platform.clone();
                    tokio::spawn(async move {
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                        if window.is_closed() {
                            return;
                        }
                        if let Some(platform) = platform.upgrade() {
                            platform.dispatch(&origin, reply);
                        }
                    });
                }
            }
        }
    }
}

fn reply_value(reply: Reply) -> Value {
    serde_json::to_value(reply).unwrap_or(Value::Null)
}
