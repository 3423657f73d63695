//! Wire model for the control port.
//!
//! Three message shapes travel over a port: requests carrying a
//! correlation id, a verb, and positional arguments; responses carrying
//! the originating id and either a value or an error string; and
//! notifications carrying an event name with optional data. The JSON
//! encoding is untagged; the shape is recovered from which required
//! fields are present, so either speaker can be implemented against the
//! serialized form alone.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event name announcing that the sending side has bound its handlers.
pub const PORT_READY_EVENT: &str = "port-ready";

/// Event name announcing that the sending side closed its end.
pub const PORT_CLOSE_EVENT: &str = "port-close";

/// Event name for title changes pushed by the player side.
pub const TITLE_CHANGE_EVENT: &str = "titlechange";

/// A single control-port message.
///
/// Variant order matters for deserialization: a request is the only shape
/// with `method`, a response the only remaining shape with `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    Request {
        id: String,
        method: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<Value>,
    },
    Response {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Notify {
        event: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
}

impl Message {
    #[must_use]
    pub fn request(id: impl Into<String>, method: impl Into<String>, args: Vec<Value>) -> Self {
        Self::Request {
            id: id.into(),
            method: method.into(),
            args,
        }
    }

    /// Successful response, optionally carrying a value.
    #[must_use]
    pub fn ok(id: impl Into<String>, value: Option<Value>) -> Self {
        Self::Response {
            id: id.into(),
            value,
            error: None,
        }
    }

    /// Error response; the peer surfaces `error` to the caller.
    #[must_use]
    pub fn err(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self::Response {
            id: id.into(),
            value: None,
            error: Some(error.into()),
        }
    }

    #[must_use]
    pub fn notify(event: impl Into<String>, data: Option<Value>) -> Self {
        Self::Notify {
            event: event.into(),
            data,
        }
    }
}

/// A message plus any binary payloads travelling with it.
///
/// Payloads stay out of the JSON body; the transport moves them as raw
/// buffers so screenshot frames and fetched bodies are never base64'd.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub message: Message,
    pub payloads: Vec<Bytes>,
}

impl Envelope {
    #[must_use]
    pub fn plain(message: Message) -> Self {
        Self {
            message,
            payloads: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_payloads(message: Message, payloads: Vec<Bytes>) -> Self {
        Self { message, payloads }
    }
}

impl From<Message> for Envelope {
    fn from(message: Message) -> Self {
        Self::plain(message)
    }
}

/// Result of a handled request: an optional value and any payloads to
/// return alongside it. The same shape comes back to callers of
/// [`MessagePort::call`](super::MessagePort::call).
#[derive(Debug, Clone, Default)]
pub struct Reply {
    pub value: Option<Value>,
    pub payloads: Vec<Bytes>,
}

impl Reply {
    /// Reply with no body, for setters and actions.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn value(value: Value) -> Self {
        Self {
            value: Some(value),
            payloads: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_payloads(value: Value, payloads: Vec<Bytes>) -> Self {
        Self {
            value: Some(value),
            payloads,
        }
    }
}
