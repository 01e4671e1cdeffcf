//! obs-websocket Wire Protocol
//!
//! Single responsibility: encode requests and classify inbound messages in the
//! obs-websocket v4 JSON format.
//!
//! # Wire Format
//!
//! Every message is one flat JSON object.
//!
//! ## Request
//! ```text
//! {
//!     "request-type": <string>,   // Operation name
//!     "message-id": <string>,     // Decimal request ID for correlation
//!     ...parameters
//! }
//! ```
//!
//! ## Reply
//! ```text
//! {
//!     "message-id": <string>,     // Matches request ID
//!     "status": "ok" | "error",
//!     "error": <string>,          // Only when status is "error"
//!     ...result fields
//! }
//! ```
//!
//! ## Notification
//! ```text
//! {
//!     "update-type": <string>,    // Event tag, e.g. "SwitchScenes"
//!     ...payload fields
//! }
//! ```

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ObsError;

pub const REQUEST_TYPE_FIELD: &str = "request-type";
pub const MESSAGE_ID_FIELD: &str = "message-id";
pub const UPDATE_TYPE_FIELD: &str = "update-type";
pub const STATUS_FIELD: &str = "status";
pub const ERROR_FIELD: &str = "error";

/// Outcome reported by a reply's `status` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyStatus {
    Ok,
    /// `status: "error"` with the server's error text (empty if absent)
    Error(String),
    /// Any other status value, or none at all
    Unrecognized(String),
}

/// A reply correlated to an earlier request.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub message_id: String,
    pub status: ReplyStatus,
    /// The full decoded message
    pub payload: Value,
}

/// An unsolicited server-pushed event.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub update_type: String,
    /// The full decoded message
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Reply(Reply),
    Notification(Notification),
}

/// Encode a request into wire format.
///
/// The operation name and ID are written under the reserved keys, replacing
/// any caller-supplied values for them.
pub fn encode_request(
    message_id: &str,
    request_type: &str,
    mut params: Map<String, Value>,
) -> Result<String, ObsError> {
    params.insert(
        REQUEST_TYPE_FIELD.to_string(),
        Value::String(request_type.to_string()),
    );
    params.insert(
        MESSAGE_ID_FIELD.to_string(),
        Value::String(message_id.to_string()),
    );
    Ok(serde_json::to_string(&Value::Object(params))?)
}

/// Serialize typed request parameters into the flat map `encode_request` takes.
pub fn to_params<P: Serialize + ?Sized>(params: &P) -> Result<Map<String, Value>, ObsError> {
    match serde_json::to_value(params)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(ObsError::Protocol(format!(
            "Request parameters must be an object, got {}",
            other
        ))),
    }
}

/// Classify one inbound text message.
///
/// Returns `None` for anything that is not a JSON object carrying either a
/// message ID or an update type. A message ID takes precedence: a message
/// carrying both fields is a reply.
pub fn decode_inbound(text: &str) -> Option<Inbound> {
    let value: Value = serde_json::from_str(text).ok()?;
    let map = value.as_object()?;

    if let Some(message_id) = map.get(MESSAGE_ID_FIELD).and_then(field_text) {
        let status = match map.get(STATUS_FIELD) {
            Some(Value::String(s)) if s == "ok" => ReplyStatus::Ok,
            Some(Value::String(s)) if s == "error" => ReplyStatus::Error(
                map.get(ERROR_FIELD)
                    .and_then(field_text)
                    .unwrap_or_default(),
            ),
            Some(Value::String(s)) => ReplyStatus::Unrecognized(s.clone()),
            Some(other) => ReplyStatus::Unrecognized(other.to_string()),
            None => ReplyStatus::Unrecognized(String::new()),
        };
        return Some(Inbound::Reply(Reply {
            message_id,
            status,
            payload: value,
        }));
    }

    let update_type = map.get(UPDATE_TYPE_FIELD).map(|v| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })?;

    Some(Inbound::Notification(Notification {
        update_type,
        payload: value,
    }))
}

/// Turn a field into text, treating null and the empty string as absent.
fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
