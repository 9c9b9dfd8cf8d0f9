//! JSON-RPC provider over the communicator.
//!
//! Wraps each call in a JSON-RPC 2.0 envelope, decodes the `{result}` /
//! `{error}` reply contract, tracks the connected account, and closes the
//! popup once no confirmation requests remain in flight.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bridge_common::{new_id, BridgeEvent, ChannelKind, CommError, Message, Reply, Scope};
use bridge_config::BridgeConfig;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::communicator::Communicator;

/// Methods after which the popup closes as soon as nothing else is in flight.
pub const DEFAULT_FINAL_METHODS: &[&str] = &[
    "aztec_requestAccounts",
    "aztec_sendTransaction",
    "wallet_watchAssets",
];

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    id: String,
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
}

#[derive(Default)]
struct ProviderState {
    popup_in_flight: AtomicUsize,
    account: Mutex<Option<String>>,
}

#[derive(Clone)]
pub struct WalletProvider {
    communicator: Communicator,
    final_methods: Arc<HashSet<String>>,
    idle_disconnect: Duration,
    state: Arc<ProviderState>,
}

impl WalletProvider {
    pub fn new<I, S>(communicator: Communicator, final_methods: I, idle_disconnect: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            communicator,
            final_methods: Arc::new(final_methods.into_iter().map(Into::into).collect()),
            idle_disconnect,
            state: Arc::new(ProviderState::default()),
        }
    }

    pub fn from_bridge_config(communicator: Communicator, config: &BridgeConfig) -> Self {
        Self::new(
            communicator,
            config.routing.final_methods.iter().cloned(),
            Duration::from_millis(config.timing.idle_disconnect_ms),
        )
    }

    pub fn communicator(&self) -> &Communicator {
        &self.communicator
    }

    /// Popup-routed requests currently awaiting a reply.
    pub fn pending_requests(&self) -> usize {
        self.state.popup_in_flight.load(Ordering::SeqCst)
    }

    pub fn account(&self) -> Option<String> {
        self.state
            .account
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Call `method` on the wallet and return its `result`.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value, CommError> {
        let envelope = RpcRequest {
            id: new_id(),
            jsonrpc: "2.0",
            method,
            params,
        };
        let payload = serde_json::to_value(&envelope)
            .map_err(|e| CommError::ProtocolViolation(format!("unserializable request: {e}")))?;
        let message = Message::new(payload);

        let kind = self.communicator.route(&message);
        let _in_flight = (kind == ChannelKind::Popup).then(|| InFlight::begin(self, method));

        let reply: Reply = self.communicator.send_and_await_reply(&message).await?;
        reply.into_result()
    }

    /// Ask the wallet for its accounts and remember the first one.
    pub async fn connect(&self) -> Result<String, CommError> {
        let result = self
            .request("aztec_requestAccounts", Value::Array(Vec::new()))
            .await?;
        let accounts: Vec<String> = serde_json::from_value(result).map_err(|e| {
            CommError::ProtocolViolation(format!("aztec_requestAccounts result: {e}"))
        })?;
        let address = accounts.into_iter().next().ok_or(CommError::NoAccounts)?;

        self.set_account(Some(address.clone()));
        Ok(address)
    }

    /// Forget the connected account. Channels are left as they are.
    pub fn disconnect(&self) {
        self.set_account(None);
    }

    fn set_account(&self, address: Option<String>) {
        *self
            .state
            .account
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = address.clone();
        self.communicator
            .events()
            .publish(BridgeEvent::AccountChanged { address });
    }

    /// Called when a popup request settles, successfully or not.
    fn release_popup(&self, method: &str) {
        let remaining = self.state.popup_in_flight.fetch_sub(1, Ordering::SeqCst) - 1;

        if self.final_methods.contains(method) {
            if remaining == 0 {
                debug!(method, "final method settled, closing popup");
                self.communicator.disconnect(Scope::Popup);
            }
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let communicator = self.communicator.clone();
        let state = Arc::clone(&self.state);
        let delay = self.idle_disconnect;
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if state.popup_in_flight.load(Ordering::SeqCst) == 0 {
                debug!("popup idle, closing");
                communicator.disconnect(Scope::Popup);
            }
        });
    }
}

/// Counts a popup request as in flight until dropped, whatever the outcome.
struct InFlight<'a> {
    provider: &'a WalletProvider,
    method: String,
}

impl<'a> InFlight<'a> {
    fn begin(provider: &'a WalletProvider, method: &str) -> Self {
        provider.state.popup_in_flight.fetch_add(1, Ordering::SeqCst);
        Self {
            provider,
            method: method.to_string(),
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.provider.release_popup(&self.method);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communicator::CommunicatorConfig;
    use crate::memory::{MemoryPlatform, SimulatedWallet};
    use crate::platform::WindowContext;
    use bridge_common::{ChannelState, RpcError};
    use serde_json::json;
    use url::Url;

    fn setup(wallet: SimulatedWallet) -> (Arc<MemoryPlatform>, WalletProvider) {
        let platform = Arc::new(MemoryPlatform::new());
        wallet.attach(&platform);
        let config = CommunicatorConfig::new()
            .with_popup_url(Url::parse("https://wallet.example/sign").unwrap())
            .with_frame_url(Url::parse("https://wallet.example/frame").unwrap());
        let communicator = Communicator::new(platform.clone(), config);
        let provider = WalletProvider::new(
            communicator,
            DEFAULT_FINAL_METHODS.iter().copied(),
            Duration::from_millis(1000),
        );
        (platform, provider)
    }

    fn accounts(list: Value) -> SimulatedWallet {
        SimulatedWallet::new().on_request(move |m| match m.method() {
            Some("aztec_requestAccounts") => Ok(list.clone()),
            _ => Ok(Value::Null),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn request_returns_result() {
        let wallet = SimulatedWallet::new().on_request(|m| {
            assert_eq!(m.payload["jsonrpc"], "2.0");
            assert!(m.payload["id"].is_string());
            Ok(json!({ "echo": m.payload["params"].clone() }))
        });
        let (_platform, provider) = setup(wallet);

        let result = provider.request("aztec_call", json!([1, 2])).await.unwrap();
        assert_eq!(result, json!({ "echo": [1, 2] }));
    }

    #[tokio::test(start_paused = true)]
    async fn wallet_error_is_surfaced() {
        let wallet = SimulatedWallet::new().on_request(|_| {
            Err(RpcError {
                code: 4001,
                message: "user rejected".into(),
                data: None,
            })
        });
        let (_platform, provider) = setup(wallet);

        let err = provider
            .request("aztec_sendTransaction", json!([]))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CommError::Wallet {
                code: 4001,
                message: "user rejected".into()
            }
        );
        assert_eq!(provider.pending_requests(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn connect_stores_first_account_and_closes_popup() {
        let (platform, provider) = setup(accounts(json!(["0xabc", "0xdef"])));
        let mut events = provider.communicator().subscribe();

        let address = provider.connect().await.unwrap();

        assert_eq!(address, "0xabc");
        assert_eq!(provider.account().as_deref(), Some("0xabc"));
        assert!(platform.last_window().unwrap().is_closed());
        assert_eq!(
            provider.communicator().state(ChannelKind::Popup),
            ChannelState::Closed
        );

        let mut announced = false;
        while let Ok(event) = events.try_recv() {
            announced |= event
                == BridgeEvent::AccountChanged {
                    address: Some("0xabc".into()),
                };
        }
        assert!(announced);
    }

    #[tokio::test(start_paused = true)]
    async fn connect_without_accounts_fails() {
        let (_platform, provider) = setup(accounts(json!([])));
        assert_eq!(provider.connect().await.unwrap_err(), CommError::NoAccounts);
        assert_eq!(provider.account(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_forgets_account() {
        let (_platform, provider) = setup(accounts(json!(["0xabc"])));
        provider.connect().await.unwrap();

        provider.disconnect();
        assert_eq!(provider.account(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn final_method_waits_for_other_popup_requests() {
        let wallet = SimulatedWallet::new().reply_delay_with(|m| match m.method() {
            Some("aztec_sendTransaction") => Duration::from_millis(10),
            _ => Duration::from_millis(500),
        });
        let (_platform, provider) = setup(wallet);

        let slow = {
            let provider = provider.clone();
            tokio::spawn(async move { provider.request("aztec_signMessage", json!([])).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(provider.pending_requests(), 1);

        provider
            .request("aztec_sendTransaction", json!([]))
            .await
            .unwrap();
        assert_eq!(
            provider.communicator().state(ChannelKind::Popup),
            ChannelState::Ready
        );

        assert!(slow.await.unwrap().is_ok());
        assert_eq!(provider.pending_requests(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_popup_closes_after_delay() {
        let (_platform, provider) = setup(SimulatedWallet::new());

        provider
            .request("aztec_signMessage", json!([]))
            .await
            .unwrap();
        assert_eq!(
            provider.communicator().state(ChannelKind::Popup),
            ChannelState::Ready
        );

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(
            provider.communicator().state(ChannelKind::Popup),
            ChannelState::Closed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn frame_requests_are_not_counted() {
        let wallet = SimulatedWallet::new().reply_delay(Duration::from_millis(100));
        let (_platform, provider) = setup(wallet);

        let task = {
            let provider = provider.clone();
            tokio::spawn(async move { provider.request("aztec_call", json!([])).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(provider.pending_requests(), 0);
        assert!(task.await.unwrap().is_ok());
        assert_eq!(
            provider.communicator().state(ChannelKind::Frame),
            ChannelState::Ready
        );
    }

    #[test]
    fn request_envelope_shape() {
        let envelope = RpcRequest {
            id: "1".into(),
            jsonrpc: "2.0",
            method: "aztec_call",
            params: serde_json::json!([{ "to": "0x1" }]),
        };
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["method"], "aztec_call");
        assert_eq!(value["params"][0]["to"], "0x1");
    }

    #[test]
    fn default_final_methods() {
        assert!(DEFAULT_FINAL_METHODS.contains(&"aztec_sendTransaction"));
        assert!(!DEFAULT_FINAL_METHODS.contains(&"aztec_call"));
    }
}
