use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifies what a message is about.
///
/// Kinds are small integers shared by convention between client and server
/// (login request/response, registration request/response, and so on), with
/// request and response kinds paired 1:1. The enumeration is an external
/// contract, so it is deliberately not baked into this crate.
pub type MessageKind = u32;

/// An outgoing message: `{"type": <kind>, "data": {...}}`.
///
/// Built by a caller immediately before sending and fully consumed by the
/// codec; nothing retains it afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub data: Value,
}

/// An incoming message:
/// `{"type": <kind>, "success": <bool>, "message": <string>, "data": {...}}`.
///
/// Every field is optional on the wire and decodes to its default when
/// absent; `data` defaults to an empty object rather than `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(rename = "type", default)]
    pub kind: MessageKind,

    #[serde(default)]
    pub success: bool,

    #[serde(default)]
    pub message: String,

    #[serde(default = "empty_object")]
    pub data: Value,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}
