//! Wire shapes exchanged with the wallet context.
//!
//! Data messages carry a `correlationId` and an opaque `payload`. Control
//! messages carry only an `event` name and are used for the handshake and
//! lifecycle signaling; they never carry caller data.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::CommError;
use crate::id::new_correlation_id;

/// A data message, used for outbound requests and inbound replies alike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub correlation_id: String,
    pub payload: Value,
}

impl Message {
    /// Create a message with a fresh correlation id.
    pub fn new(payload: Value) -> Self {
        Self {
            correlation_id: new_correlation_id(),
            payload,
        }
    }

    pub fn with_id(correlation_id: impl Into<String>, payload: Value) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            payload,
        }
    }

    /// The RPC method named in the payload, if any.
    pub fn method(&self) -> Option<&str> {
        self.payload.get("method").and_then(Value::as_str)
    }

    /// Read the correlation id of a raw inbound message.
    pub fn correlation_id_of(data: &Value) -> Option<&str> {
        data.get("correlationId").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlEvent {
    WalletLoaded,
    WalletUnloaded,
    FrameLoaded,
    WalletLoadedPing,
    FrameLoadedPing,
}

impl ControlEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WalletLoaded => "WalletLoaded",
            Self::WalletUnloaded => "WalletUnloaded",
            Self::FrameLoaded => "FrameLoaded",
            Self::WalletLoadedPing => "WalletLoadedPing",
            Self::FrameLoadedPing => "FrameLoadedPing",
        }
    }

    /// Read the control event of a raw inbound message.
    ///
    /// Unknown event names yield `None`; they are background noise.
    pub fn of(data: &Value) -> Option<Self> {
        let name = data.get("event")?.as_str()?;
        serde_json::from_value(Value::String(name.to_string())).ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlMessage {
    pub event: ControlEvent,
}

impl ControlMessage {
    pub fn new(event: ControlEvent) -> Self {
        Self { event }
    }

    pub fn to_value(self) -> Value {
        serde_json::json!({ "event": self.event.as_str() })
    }
}

/// Error object reported by the wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResultBody {
    pub result: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ErrorBody {
    pub error: RpcError,
}

/// Reply payload: exactly one of `result` or `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplyPayload {
    Result(ResultBody),
    Error(ErrorBody),
}

/// A reply from the wallet, correlated to its request by `correlation_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub correlation_id: String,
    pub payload: ReplyPayload,
}

impl Reply {
    pub fn success(correlation_id: impl Into<String>, result: Value) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            payload: ReplyPayload::Result(ResultBody { result }),
        }
    }

    pub fn failure(correlation_id: impl Into<String>, code: i64, message: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            payload: ReplyPayload::Error(ErrorBody {
                error: RpcError {
                    code,
                    message: message.into(),
                    data: None,
                },
            }),
        }
    }

    pub fn into_result(self) -> Result<Value, CommError> {
        match self.payload {
            ReplyPayload::Result(body) => Ok(body.result),
            ReplyPayload::Error(body) => Err(CommError::Wallet {
                code: body.error.code,
                message: body.error.message,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_uses_camel_case_on_the_wire() {
        let msg = Message::with_id("r1", json!({ "method": "aztec_call" }));
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["correlationId"], "r1");
        assert_eq!(value["payload"]["method"], "aztec_call");
    }

    #[test]
    fn message_method() {
        let msg = Message::new(json!({ "method": "aztec_accounts", "params": [] }));
        assert_eq!(msg.method(), Some("aztec_accounts"));

        let msg = Message::new(json!({ "params": [] }));
        assert_eq!(msg.method(), None);

        let msg = Message::new(json!({ "method": 7 }));
        assert_eq!(msg.method(), None);
    }

    #[test]
    fn correlation_id_of_raw_value() {
        let data = json!({ "correlationId": "abc", "payload": {} });
        assert_eq!(Message::correlation_id_of(&data), Some("abc"));
        assert_eq!(Message::correlation_id_of(&json!({ "event": "WalletLoaded" })), None);
    }

    #[test]
    fn control_event_of_raw_value() {
        assert_eq!(
            ControlEvent::of(&json!({ "event": "WalletLoaded" })),
            Some(ControlEvent::WalletLoaded)
        );
        assert_eq!(
            ControlEvent::of(&json!({ "event": "FrameLoadedPing" })),
            Some(ControlEvent::FrameLoadedPing)
        );
        assert_eq!(ControlEvent::of(&json!({ "event": "SetReownUri" })), None);
        assert_eq!(ControlEvent::of(&json!({ "correlationId": "x" })), None);
        assert_eq!(ControlEvent::of(&json!("WalletLoaded")), None);
    }

    #[test]
    fn control_message_value() {
        let value = ControlMessage::new(ControlEvent::WalletLoadedPing).to_value();
        assert_eq!(value, json!({ "event": "WalletLoadedPing" }));
    }

    #[test]
    fn reply_success_decodes() {
        let reply: Reply =
            serde_json::from_value(json!({ "correlationId": "r1", "payload": { "result": [1, 2] } }))
                .unwrap();
        assert_eq!(reply.correlation_id, "r1");
        assert_eq!(reply.into_result().unwrap(), json!([1, 2]));
    }

    #[test]
    fn reply_null_result_is_success() {
        let reply: Reply =
            serde_json::from_value(json!({ "correlationId": "r1", "payload": { "result": null } }))
                .unwrap();
        assert_eq!(reply.into_result().unwrap(), Value::Null);
    }

    #[test]
    fn reply_error_maps_to_wallet_error() {
        let reply: Reply = serde_json::from_value(json!({
            "correlationId": "r2",
            "payload": { "error": { "code": 4001, "message": "User rejected" } }
        }))
        .unwrap();
        assert_eq!(
            reply.into_result().unwrap_err(),
            CommError::Wallet {
                code: 4001,
                message: "User rejected".into()
            }
        );
    }

    #[test]
    fn reply_with_both_or_neither_is_rejected() {
        let both = json!({
            "correlationId": "r3",
            "payload": { "result": 1, "error": { "code": 1, "message": "x" } }
        });
        assert!(serde_json::from_value::<Reply>(both).is_err());

        let neither = json!({ "correlationId": "r3", "payload": { "value": 1 } });
        assert!(serde_json::from_value::<Reply>(neither).is_err());
    }

    #[test]
    fn reply_constructors_serialize_to_contract() {
        let ok = serde_json::to_value(Reply::success("a", json!("0x1"))).unwrap();
        assert_eq!(ok, json!({ "correlationId": "a", "payload": { "result": "0x1" } }));

        let err = serde_json::to_value(Reply::failure("b", -32601, "nope")).unwrap();
        assert_eq!(
            err,
            json!({ "correlationId": "b", "payload": { "error": { "code": -32601, "message": "nope" } } })
        );
    }
}
