//! Wire messages.
//!
//! Frames carry a `type` tag:
//!
//! ```text
//! client ──► {"type": "event", "payload": {"target_id": "...", ...}}
//! client ──► {"type": "ping"}
//! server ──► {"type": "patch", "payload": <response>}
//! server ──► {"type": "pong"}
//! server ──► {"type": "error", "message": "..."}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::runtime::Response;

/// A message from the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    /// An event; `payload` is validated by the runtime.
    Event { payload: Value },
    Ping,
}

/// A message to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    /// The runtime's answer to an event, or the initial render.
    Patch { payload: Response },
    Pong,
    /// The frame could not be processed at all.
    Error { message: String },
}
