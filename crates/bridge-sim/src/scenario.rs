//! Scripted runs of the bridge against the simulated wallet.

use std::sync::Arc;
use std::time::Duration;

use bridge_comm::{
    Communicator, CommunicatorConfig, MemoryPlatform, SimulatedWallet, WalletProvider,
};
use bridge_common::{BridgeError, BridgeEvent, CommError, ControlEvent};
use bridge_config::BridgeConfig;
use clap::ValueEnum;
use futures_util::future::join_all;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::wallet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Connect through the popup, then read through the frame.
    Connect,
    /// The wallet ignores the first handshake pings.
    SlowLoad,
    /// The user closes the popup while a request is pending.
    UserClose,
    /// Many requests in flight whose replies arrive out of order.
    Concurrent,
    All,
}

impl Scenario {
    fn expand(self) -> Vec<Scenario> {
        match self {
            Self::All => vec![
                Self::Connect,
                Self::SlowLoad,
                Self::UserClose,
                Self::Concurrent,
            ],
            one => vec![one],
        }
    }
}

#[derive(Debug, Clone)]
pub struct Options {
    pub ignored_pings: usize,
    pub reply_delay: Duration,
    pub requests: usize,
}

struct Harness {
    platform: Arc<MemoryPlatform>,
    provider: WalletProvider,
    wallet: JoinHandle<()>,
    events: JoinHandle<()>,
}

impl Harness {
    fn new(config: &BridgeConfig, wallet: SimulatedWallet) -> Result<Self, BridgeError> {
        let platform = Arc::new(MemoryPlatform::new());
        let wallet = wallet.attach(&platform);

        let communicator = Communicator::new(
            platform.clone(),
            CommunicatorConfig::from_bridge_config(config)?,
        );
        let events = log_events(&communicator);
        let provider = WalletProvider::from_bridge_config(communicator, config);

        Ok(Self {
            platform,
            provider,
            wallet,
            events,
        })
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.wallet.abort();
        self.events.abort();
    }
}

fn log_events(communicator: &Communicator) -> JoinHandle<()> {
    let mut events = communicator.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(BridgeEvent::ChannelStateChanged { kind, state }) => {
                    info!(%kind, ?state, "channel state");
                }
                Ok(BridgeEvent::AccountChanged { address }) => {
                    info!(?address, "account changed");
                }
                Ok(BridgeEvent::Unknown) => {}
                Err(RecvError::Lagged(missed)) => warn!(missed, "event log lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn base_wallet(options: &Options) -> SimulatedWallet {
    SimulatedWallet::new()
        .on_request(wallet::handle)
        .reply_delay(options.reply_delay)
}

pub async fn run(
    scenario: Scenario,
    config: &BridgeConfig,
    options: &Options,
) -> Result<(), BridgeError> {
    for scenario in scenario.expand() {
        info!(?scenario, "scenario start");
        match scenario {
            Scenario::Connect => connect(config, options).await?,
            Scenario::SlowLoad => slow_load(config, options).await?,
            Scenario::UserClose => user_close(config, options).await?,
            Scenario::Concurrent => concurrent(config, options).await?,
            Scenario::All => {}
        }
        info!(?scenario, "scenario done");
    }
    Ok(())
}

async fn connect(config: &BridgeConfig, options: &Options) -> Result<(), BridgeError> {
    let harness = Harness::new(config, base_wallet(options))?;

    let address = harness.provider.connect().await?;
    info!(%address, "connected");

    let accounts = harness
        .provider
        .request("aztec_accounts", json!([]))
        .await?;
    info!(%accounts, "read through frame");

    info!(
        popups = harness.platform.windows().len(),
        frames = harness.platform.frames().len(),
        "contexts opened"
    );
    Ok(())
}

async fn slow_load(config: &BridgeConfig, options: &Options) -> Result<(), BridgeError> {
    let wallet = base_wallet(options).ignore_pings(options.ignored_pings);
    let harness = Harness::new(config, wallet)?;

    let started = Instant::now();
    harness.provider.connect().await?;
    let pings = harness
        .platform
        .last_window()
        .map(|w| w.count_events(ControlEvent::WalletLoadedPing))
        .unwrap_or(0);

    info!(
        pings,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "slow wallet answered"
    );
    Ok(())
}

async fn user_close(config: &BridgeConfig, options: &Options) -> Result<(), BridgeError> {
    let hold = options.reply_delay.max(Duration::from_millis(50)) * 20;
    let harness = Harness::new(config, base_wallet(options).reply_delay(hold))?;

    let pending = {
        let provider = harness.provider.clone();
        tokio::spawn(async move { provider.request("aztec_sendTransaction", json!([])).await })
    };
    tokio::time::sleep(hold / 4).await;

    let Some(window) = harness.platform.last_window() else {
        return Err(BridgeError::Other("popup never opened".into()));
    };
    window.close_by_user();
    info!("popup closed by user");

    match pending.await {
        Ok(Err(CommError::RequestRejected)) => info!("pending request rejected"),
        Ok(other) => {
            return Err(BridgeError::Other(format!(
                "expected a rejected request, got {other:?}"
            )))
        }
        Err(e) => return Err(BridgeError::Other(format!("request task failed: {e}"))),
    }

    Ok(())
}

async fn concurrent(config: &BridgeConfig, options: &Options) -> Result<(), BridgeError> {
    let count = options.requests.max(1);
    let step = options.reply_delay.max(Duration::from_millis(1));
    // Earlier requests answer later, so replies arrive in reverse order.
    let wallet = SimulatedWallet::new()
        .on_request(wallet::handle)
        .reply_delay_with(move |request| {
            let index = request.payload["params"][0].as_u64().unwrap_or(0);
            step * (count as u32).saturating_sub(index as u32)
        });
    let harness = Harness::new(config, wallet)?;

    let started = Instant::now();
    let calls = (0..count).map(|index| {
        let provider = harness.provider.clone();
        let method = if index % 2 == 0 {
            "aztec_call"
        } else {
            "aztec_sendTransaction"
        };
        async move {
            let outcome = provider.request(method, json!([index])).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;
            info!(index, method, elapsed_ms, ok = outcome.is_ok(), "request settled");
            outcome
        }
    });

    let outcomes = join_all(calls).await;
    let failed = outcomes.iter().filter(|o| o.is_err()).count();
    if failed > 0 {
        return Err(BridgeError::Other(format!("{failed} of {count} requests failed")));
    }
    info!(count, "all requests resolved");
    Ok(())
}
