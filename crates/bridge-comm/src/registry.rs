//! Origin-scoped listener registry.
//!
//! Every pending wait owns one platform message listener and one entry in
//! the registry. An entry leaves the map exactly once: when a matching
//! message from the expected origin resolves it, when `reject_and_clear`
//! rejects it, or when its `Waiter` is dropped unresolved.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use bridge_common::{ChannelKind, CommError, Message, Scope};
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::platform::{InboundMessage, ListenerId, MessageCallback, Platform};

type Outcome = Result<Value, CommError>;

struct Entry {
    owner: ChannelKind,
    correlation_id: Option<String>,
    listener: ListenerId,
    tx: oneshot::Sender<Outcome>,
}

#[derive(Default)]
struct RegistryState {
    next_id: u64,
    entries: HashMap<u64, Entry>,
}

fn lock(state: &Mutex<RegistryState>) -> MutexGuard<'_, RegistryState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The single source of truth for what is still pending.
#[derive(Clone)]
pub struct ListenerRegistry {
    state: Arc<Mutex<RegistryState>>,
    platform: Arc<dyn Platform>,
}

impl ListenerRegistry {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self {
            state: Arc::new(Mutex::new(RegistryState::default())),
            platform,
        }
    }

    /// Register a one-shot wait for the first message from `origin` that
    /// satisfies `predicate`.
    ///
    /// The entry exists once this returns, so a message sent afterwards
    /// cannot be answered before anyone is listening.
    pub fn await_matching<P>(&self, origin: &str, owner: ChannelKind, predicate: P) -> Waiter
    where
        P: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        let mut state = lock(&self.state);
        self.insert(&mut state, origin, owner, None, predicate)
    }

    /// Register a wait for the reply carrying `correlation_id`.
    ///
    /// Fails if a wait for the same id is already pending, since two
    /// callers could not both receive the single reply.
    pub fn await_reply(
        &self,
        origin: &str,
        owner: ChannelKind,
        correlation_id: &str,
    ) -> Result<Waiter, CommError> {
        let mut state = lock(&self.state);
        let duplicate = state
            .entries
            .values()
            .any(|e| e.correlation_id.as_deref() == Some(correlation_id));
        if duplicate {
            return Err(CommError::ProtocolViolation(format!(
                "correlation id {correlation_id} is already pending"
            )));
        }

        let expected = correlation_id.to_string();
        Ok(self.insert(
            &mut state,
            origin,
            owner,
            Some(correlation_id.to_string()),
            move |data| Message::correlation_id_of(data) == Some(expected.as_str()),
        ))
    }

    fn insert<P>(
        &self,
        state: &mut RegistryState,
        origin: &str,
        owner: ChannelKind,
        correlation_id: Option<String>,
        predicate: P,
    ) -> Waiter
    where
        P: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        let id = state.next_id;
        state.next_id += 1;

        let (tx, rx) = oneshot::channel();
        let callback = listener_callback(
            id,
            origin.to_string(),
            predicate,
            Arc::downgrade(&self.state),
            Arc::downgrade(&self.platform),
        );
        let listener = self.platform.add_message_listener(callback);
        state.entries.insert(
            id,
            Entry {
                owner,
                correlation_id,
                listener,
                tx,
            },
        );
        trace!(waiter = id, %owner, "waiter registered");

        Waiter {
            id,
            owner,
            rx: Some(rx),
            state: Arc::downgrade(&self.state),
            platform: Arc::downgrade(&self.platform),
        }
    }

    /// Reject every waiter owned by a channel in `scope` with
    /// `RequestRejected` and remove their listeners. Safe on an empty scope.
    pub fn reject_and_clear(&self, scope: Scope) {
        let rejected: Vec<Entry> = {
            let mut state = lock(&self.state);
            let ids: Vec<u64> = state
                .entries
                .iter()
                .filter(|(_, e)| scope.includes(e.owner))
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter()
                .filter_map(|id| state.entries.remove(&id))
                .collect()
        };

        if !rejected.is_empty() {
            debug!(?scope, count = rejected.len(), "rejecting pending waiters");
        }
        for entry in rejected {
            self.platform.remove_message_listener(entry.listener);
            let _ = entry.tx.send(Err(CommError::RequestRejected));
        }
    }

    /// Number of pending waiters owned by channels in `scope`.
    pub fn len(&self, scope: Scope) -> usize {
        lock(&self.state)
            .entries
            .values()
            .filter(|e| scope.includes(e.owner))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.state).entries.is_empty()
    }
}

fn listener_callback<P>(
    id: u64,
    origin: String,
    predicate: P,
    state: Weak<Mutex<RegistryState>>,
    platform: Weak<dyn Platform>,
) -> MessageCallback
where
    P: Fn(&Value) -> bool + Send + Sync + 'static,
{
    Arc::new(move |event: &InboundMessage| {
        if event.origin != origin || !predicate(&event.data) {
            return;
        }
        let Some(state) = state.upgrade() else {
            return;
        };
        let entry = lock(&state).entries.remove(&id);
        if let Some(entry) = entry {
            if let Some(platform) = platform.upgrade() {
                platform.remove_message_listener(entry.listener);
            }
            trace!(waiter = id, "waiter resolved");
            let _ = entry.tx.send(Ok(event.data.clone()));
        }
    })
}

/// A pending one-shot wait. Dropping it unresolved deregisters it.
pub struct Waiter {
    id: u64,
    owner: ChannelKind,
    rx: Option<oneshot::Receiver<Outcome>>,
    state: Weak<Mutex<RegistryState>>,
    platform: Weak<dyn Platform>,
}

impl Waiter {
    pub fn owner(&self) -> ChannelKind {
        self.owner
    }

    /// Wait for the matching message, or `RequestRejected` if the owning
    /// channel disconnects first.
    pub async fn recv(mut self) -> Result<Value, CommError> {
        let Some(rx) = self.rx.take() else {
            return Err(CommError::RequestRejected);
        };
        rx.await.unwrap_or(Err(CommError::RequestRejected))
    }
}

impl Drop for Waiter {
    fn drop(&mut self) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let entry = lock(&state).entries.remove(&self.id);
        if let Some(entry) = entry {
            if let Some(platform) = self.platform.upgrade() {
                platform.remove_message_listener(entry.listener);
            }
            trace!(waiter = self.id, "waiter abandoned");
        }
    }
}
