//! Scripted answers for the simulated wallet.

use bridge_common::{Message, RpcError};
use serde_json::{json, Value};

pub const DEMO_ACCOUNT: &str = "0x1b7a0e5c55cc6b4a2f1a8f0f4cf9d7c0a3e2b1d0";

/// JSON-RPC "method not found".
const METHOD_NOT_FOUND: i64 = -32601;

/// Answer a JSON-RPC request the way a cooperative wallet would.
pub fn handle(request: &Message) -> Result<Value, RpcError> {
    match request.method() {
        Some("aztec_requestAccounts" | "aztec_accounts") => Ok(json!([DEMO_ACCOUNT])),
        Some("aztec_call") => Ok(json!({ "returnValues": [] })),
        Some("aztec_sendTransaction") => Ok(json!(format!(
            "0x{}",
            request.correlation_id.replace('-', "")
        ))),
        Some("wallet_watchAssets") => Ok(Value::Bool(true)),
        method => Err(RpcError {
            code: METHOD_NOT_FOUND,
            message: format!("method not found: {}", method.unwrap_or("<none>")),
            data: None,
        }),
    }
}
