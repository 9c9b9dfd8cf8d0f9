//! bridge-sim: drive the wallet bridge against a simulated wallet.
//!
//! Runs the communicator on the in-memory platform so the handshake,
//! routing, liveness, and correlation behavior can be watched in the log
//! without a browser.

mod scenario;
mod wallet;

use std::path::PathBuf;
use std::time::Duration;

use bridge_common::BridgeError;
use bridge_config::{config_to_json, load_config, toml_loader, BridgeConfig};
use clap::Parser;

use crate::scenario::{Options, Scenario};

#[derive(Parser)]
#[command(name = "bridge-sim", about = "Simulate the wallet bridge end to end")]
struct Args {
    /// Config file (TOML). Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Which scenario to run.
    #[arg(short, long, value_enum, default_value_t = Scenario::All)]
    scenario: Scenario,

    /// Handshake pings the wallet ignores in the slow-load scenario.
    #[arg(long, default_value_t = 3)]
    ignored_pings: usize,

    /// Base wallet reply delay in milliseconds.
    #[arg(long, default_value_t = 20)]
    reply_delay_ms: u64,

    /// Requests in flight for the concurrent scenario.
    #[arg(long, default_value_t = 6)]
    requests: usize,

    /// Print the effective config as JSON and exit.
    #[arg(long)]
    dump_config: bool,

    /// Write a default config file to this path and exit.
    #[arg(long)]
    write_default: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), BridgeError> {
    let args = Args::parse();

    if let Some(path) = &args.write_default {
        toml_loader::write_default_config(path)?;
        println!("wrote {}", path.display());
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => BridgeConfig::default(),
    };

    let level = &config.logging.level;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("bridge_sim={level},bridge_comm={level}").into()),
        )
        .init();

    if args.dump_config {
        println!("{}", config_to_json(&config));
        return Ok(());
    }

    tracing::info!(wallet = %config.wallet.url, "bridge-sim starting");

    let options = Options {
        ignored_pings: args.ignored_pings,
        reply_delay: Duration::from_millis(args.reply_delay_ms),
        requests: args.requests,
    };
    scenario::run(args.scenario, &config, &options).await
}
