//! Gateway frame format

use super::{
    CloseCode, HelloPayload, IdentifyPayload, OpCode, SessionEvent, SubscriptionPayload,
};
use chat_core::Topic;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Every frame in either direction has this shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayMessage {
    /// Operation code
    pub op: OpCode,

    /// Event type (only for op=0 Dispatch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,

    /// Per-connection sequence number (only for op=0 Dispatch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,

    /// Event data payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<Value>,
}

impl GatewayMessage {
    fn bare(op: OpCode, d: Option<Value>) -> Self {
        Self {
            op,
            t: None,
            s: None,
            d,
        }
    }

    // === Server Messages ===

    /// Create a Dispatch message (op=0)
    #[must_use]
    pub fn dispatch(event_type: impl Into<String>, sequence: u64, data: Value) -> Self {
        Self {
            op: OpCode::Dispatch,
            t: Some(event_type.into()),
            s: Some(sequence),
            d: Some(data),
        }
    }

    /// Create a Hello message (op=10)
    #[must_use]
    pub fn hello(payload: HelloPayload) -> Self {
        Self::bare(OpCode::Hello, serde_json::to_value(payload).ok())
    }

    /// Create a Heartbeat ACK message (op=11)
    #[must_use]
    pub fn heartbeat_ack() -> Self {
        Self::bare(OpCode::HeartbeatAck, None)
    }

    // === Client Messages ===

    /// Create a Heartbeat (op=1) carrying the last sequence the client saw
    #[must_use]
    pub fn heartbeat(last_sequence: Option<u64>) -> Self {
        Self::bare(OpCode::Heartbeat, last_sequence.map(Value::from))
    }

    /// Create an Identify message (op=2)
    #[must_use]
    pub fn identify(token: impl Into<String>) -> Self {
        let payload = IdentifyPayload {
            token: token.into(),
        };
        Self::bare(OpCode::Identify, serde_json::to_value(payload).ok())
    }

    /// Create a Subscribe message (op=3)
    #[must_use]
    pub fn subscribe(topics: &[Topic]) -> Self {
        Self::bare(
            OpCode::Subscribe,
            serde_json::to_value(SubscriptionPayload::new(topics)).ok(),
        )
    }

    /// Create an Unsubscribe message (op=4)
    #[must_use]
    pub fn unsubscribe(topics: &[Topic]) -> Self {
        Self::bare(
            OpCode::Unsubscribe,
            serde_json::to_value(SubscriptionPayload::new(topics)).ok(),
        )
    }

    // === Parsing ===

    /// Try to parse as an Identify payload (op=2)
    pub fn as_identify(&self) -> Option<IdentifyPayload> {
        if self.op != OpCode::Identify {
            return None;
        }
        self.d.as_ref().and_then(|d| serde_json::from_value(d.clone()).ok())
    }

    /// Try to parse as a Subscribe or Unsubscribe payload (op=3, op=4)
    pub fn as_subscription(&self) -> Option<SubscriptionPayload> {
        if !matches!(self.op, OpCode::Subscribe | OpCode::Unsubscribe) {
            return None;
        }
        self.d.as_ref().and_then(|d| serde_json::from_value(d.clone()).ok())
    }

    /// Try to parse as a Hello payload (op=10)
    pub fn as_hello(&self) -> Option<HelloPayload> {
        if self.op != OpCode::Hello {
            return None;
        }
        self.d.as_ref().and_then(|d| serde_json::from_value(d.clone()).ok())
    }

    /// The session event of a dispatch, if it is one
    pub fn session_event(&self) -> Option<SessionEvent> {
        if self.op != OpCode::Dispatch {
            return None;
        }
        self.t.as_deref().and_then(SessionEvent::from_name)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Code and reason for a close frame
    #[must_use]
    pub fn close_frame(code: CloseCode) -> (u16, String) {
        (code.as_u16(), code.description().to_string())
    }
}

impl std::fmt::Display for GatewayMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(t) = &self.t {
            write!(f, "GatewayMessage(op={}, t={}", self.op, t)?;
            if let Some(s) = self.s {
                write!(f, ", s={s}")?;
            }
            write!(f, ")")
        } else {
            write!(f, "GatewayMessage(op={})", self.op)
        }
    }
}
