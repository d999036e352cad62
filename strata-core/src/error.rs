//! Error Types
//!
//! Every fallible operation in the crate returns [`Result`]. Failures that
//! belong to a single event (a missing handler, a handler that fails, a
//! component that cannot render) are turned into response payloads by the
//! runtime; they never tear down a session.

use thiserror::Error;

use crate::runtime::SessionId;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the virtual DOM engine and its runtime.
#[derive(Debug, Error)]
pub enum Error {
    /// A hook or event was given an identifier that is not a non-empty string.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An event referenced a handler id that is not registered.
    #[error("handler not found: {0}")]
    HandlerNotFound(String),

    /// A registered handler failed (returned an error or panicked).
    #[error("handler {id} failed: {message}")]
    HandlerExecution { id: String, message: String },

    /// The root component failed to produce a tree.
    #[error("render failed: {0}")]
    Render(String),

    /// A component read a lazily loaded value that is not ready yet.
    #[error("still loading: {0}")]
    Pending(String),

    /// A hook was called outside of any session scope.
    #[error("no active session: hooks must run inside a render or event handler")]
    NoActiveSession,

    /// The session id is not connected.
    #[error("unknown session: {0}")]
    SessionNotFound(SessionId),

    /// A slot holds a value that does not decode into the requested type.
    #[error("slot {slot} holds an incompatible value: {source}")]
    SlotType {
        slot: String,
        #[source]
        source: serde_json::Error,
    },

    /// A patch does not address a node of the tree it is applied to.
    #[error("patch cannot be applied: {0}")]
    Patch(String),

    /// The configuration is malformed or inconsistent.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("json codec error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("msgpack encode error: {0}")]
    MsgpackEncode(#[from] rmp_serde::encode::Error),

    #[error("msgpack decode error: {0}")]
    MsgpackDecode(#[from] rmp_serde::decode::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("websocket error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Self::Render(message)
    }
}

impl From<&str> for Error {
    fn from(message: &str) -> Self {
        Self::Render(message.to_string())
    }
}

impl Error {
    /// Shorthand for [`Error::InvalidArgument`].
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}
