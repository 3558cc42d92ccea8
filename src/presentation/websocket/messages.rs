//! WebSocket Message Types
//!
//! Gateway frames are JSON objects `{op, d, s?, t?}`.

use serde::{Deserialize, Serialize};

use crate::application::dto::response::{ChatRequestResponse, UserResponse};

/// Gateway opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    /// Event dispatch
    Dispatch = 0,
    /// Heartbeat
    Heartbeat = 1,
    /// Identify
    Identify = 2,
    /// Typing in a chat
    Typing = 3,
    /// Invalid session
    InvalidSession = 9,
    /// Hello
    Hello = 10,
    /// Heartbeat ACK
    HeartbeatAck = 11,
    /// Client confirms a MESSAGE_CREATE arrived
    DeliveryAck = 12,
}

impl OpCode {
    pub fn from_u8(op: u8) -> Option<Self> {
        match op {
            0 => Some(Self::Dispatch),
            1 => Some(Self::Heartbeat),
            2 => Some(Self::Identify),
            3 => Some(Self::Typing),
            9 => Some(Self::InvalidSession),
            10 => Some(Self::Hello),
            11 => Some(Self::HeartbeatAck),
            12 => Some(Self::DeliveryAck),
            _ => None,
        }
    }
}

/// Incoming gateway message
#[derive(Debug, Deserialize)]
pub struct GatewayReceive {
    pub op: u8,
    pub d: Option<serde_json::Value>,
    pub s: Option<u64>,
    pub t: Option<String>,
}

impl GatewayReceive {
    /// Decode `d` into an opcode-specific payload.
    pub fn payload<T: serde::de::DeserializeOwned>(&self) -> Option<T> {
        self.d
            .as_ref()
            .and_then(|d| serde_json::from_value(d.clone()).ok())
    }
}

/// Outgoing gateway message
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GatewaySend {
    pub op: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

impl GatewaySend {
    pub fn hello(heartbeat_interval: u64) -> Self {
        Self {
            op: OpCode::Hello as u8,
            d: serde_json::to_value(HelloPayload { heartbeat_interval }).ok(),
            s: None,
            t: None,
        }
    }

    pub fn heartbeat_ack() -> Self {
        Self {
            op: OpCode::HeartbeatAck as u8,
            d: None,
            s: None,
            t: None,
        }
    }

    pub fn invalid_session() -> Self {
        Self {
            op: OpCode::InvalidSession as u8,
            d: Some(serde_json::Value::Bool(false)),
            s: None,
            t: None,
        }
    }

    pub fn dispatch(sequence: u64, event_name: &str, data: serde_json::Value) -> Self {
        Self {
            op: OpCode::Dispatch as u8,
            d: Some(data),
            s: Some(sequence),
            t: Some(event_name.to_string()),
        }
    }
}

/// Hello payload (op 10)
#[derive(Debug, Serialize)]
pub struct HelloPayload {
    pub heartbeat_interval: u64,
}

/// Ready payload (dispatch READY)
#[derive(Debug, Serialize)]
pub struct ReadyPayload {
    pub user: UserResponse,
    pub session_id: String,
    /// Incoming chat requests still waiting for an answer
    pub pending_requests: Vec<ChatRequestResponse>,
}

/// Identify payload (op 2)
#[derive(Debug, Deserialize)]
pub struct IdentifyPayload {
    pub token: String,
}

/// Snowflake sent by a client, either as a JSON string or a number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    Text(String),
    Number(i64),
}

impl WireId {
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Self::Text(s) => s.parse().ok(),
            Self::Number(n) => Some(*n),
        }
    }
}

/// Typing payload (op 3)
#[derive(Debug, Deserialize)]
pub struct TypingPayload {
    pub request_id: WireId,
}

/// Delivery ack payload (op 12)
#[derive(Debug, Deserialize)]
pub struct DeliveryAckPayload {
    pub message_id: WireId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_opcode_roundtrip() {
        for op in [0u8, 1, 2, 3, 9, 10, 11, 12] {
            assert_eq!(OpCode::from_u8(op).map(|o| o as u8), Some(op));
        }
        assert_eq!(OpCode::from_u8(4), None);
    }

    #[test]
    fn test_hello_frame() {
        let frame = serde_json::to_value(GatewaySend::hello(45000)).unwrap();
        assert_eq!(frame, json!({"op": 10, "d": {"heartbeat_interval": 45000}}));
    }

    #[test]
    fn test_dispatch_frame() {
        let frame = GatewaySend::dispatch(3, "WALLET_UPDATE", json!({"balance": 5}));
        let value = serde_json::to_value(frame).unwrap();
        assert_eq!(value["s"], 3);
        assert_eq!(value["t"], "WALLET_UPDATE");
    }

    #[test]
    fn test_delivery_ack_accepts_string_or_number() {
        let text: GatewayReceive =
            serde_json::from_str(r#"{"op":12,"d":{"message_id":"42"}}"#).unwrap();
        let number: GatewayReceive =
            serde_json::from_str(r#"{"op":12,"d":{"message_id":42}}"#).unwrap();

        for frame in [text, number] {
            let ack: DeliveryAckPayload = frame.payload().unwrap();
            assert_eq!(ack.message_id.to_i64(), Some(42));
        }
    }
}
