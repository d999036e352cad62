//! Hooks
//!
//! Per-session component state, keyed by `(component_id, key)`.
//!
//! # How It Works
//!
//! ```text
//! RuntimeManager ── enter ──► HookScope (thread-local stack)
//!                                │
//!        use_state / use_reducer / use_effect_with_deps / use_handler
//!                                │
//!                                ▼
//!                 HookStore ── partition per SessionId ──► slots
//! ```
//!
//! 1. The runtime opens a [`HookScope`] for the session before rendering or
//!    running a handler.
//! 2. Hooks look up the active scope and read or write that session's
//!    partition of the [`HookStore`].
//! 3. Setters and dispatchers capture their session, so they keep writing to
//!    the right partition when a handler calls them later.
//!
//! Two sessions never observe each other's slots, even with identical
//! component ids and keys.

mod context;
mod effect;
mod handler;
mod ident;
mod reducer;
mod state;
mod store;

pub use context::{HookScope, PendingEffect};
pub use effect::{use_effect, use_effect_with_deps};
pub use handler::{use_fallible_handler, use_handler};
pub use ident::Identifier;
pub use reducer::{use_reducer, Dispatch};
pub use state::{use_context, use_lazy_state, use_state, StateSetter};
pub use store::{Deps, HookStore, ReducerFn, SlotKey};
