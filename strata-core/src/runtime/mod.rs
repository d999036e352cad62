//! Runtime
//!
//! Drives the render/diff loop for connected sessions.
//!
//! # How It Works
//!
//! ```text
//! event ──► HandlerRegistry::resolve_for ──► handler (in HookScope)
//!                                             │ writes slots
//!                                             ▼
//!                       root component ──► VNode ──► diff(previous, next)
//!                                                          │
//!                                                          ▼
//!                                   full_replace │ noop │ patches
//! ```
//!
//! A [`RuntimeManager`] owns one session's rendered tree. The
//! [`SessionManager`] owns every connected session and the stores they share.

mod component;
mod event;
mod manager;
mod registry;
mod session;

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use component::{Component, ErrorBoundary, IntoRendered, Lazy, SharedComponent, Suspense};
pub use event::Event;
pub use manager::{Directive, Response, RootSlot, RuntimeManager};
pub use registry::{Callback, HandlerError, HandlerId, HandlerRegistry};
pub use session::SessionManager;

/// Identifies one client connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// A fresh random id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
