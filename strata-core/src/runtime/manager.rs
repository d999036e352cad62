//! Runtime Manager
//!
//! Runs render cycles for one session.
//!
//! # How It Works
//!
//! The manager is a small state machine:
//!
//! ```text
//! Idle ──render──► Rendered(current) ──render──► Rendered(current') ...
//! ```
//!
//! Every render pass:
//!
//! 1. Bumps the session's generation and opens a [`HookScope`] for it.
//! 2. Invokes the root component. Errors and panics are both caught.
//! 3. On success, runs the `use_effect` callbacks queued during the pass and
//!    evicts this session's handlers older than the retention window.
//!
//! An event resolves its handler, runs it inside a scope, re-renders and
//! diffs the new tree against `current` to build the response.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::component::{Component, SharedComponent};
use super::event::Event;
use super::registry::{Callback, HandlerRegistry};
use super::{panic_message, SessionId};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::hooks::{HookScope, HookStore};
use crate::vdom::{diff_trees, Patch, VNode};

/// A root component slot shared by every session that has no override.
pub type RootSlot = Arc<RwLock<Option<SharedComponent>>>;

/// What the client must do to reach the server's current tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Directive {
    /// Replace the mounted content with `html`.
    FullReplace { html: String },
    /// Nothing changed.
    Noop,
    /// Replay `patches` in order.
    Patches { patches: Vec<Patch> },
}

/// Result of handling one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    /// The event failed. `recovery` is present when the handler failed but
    /// the re-render succeeded, so the client can still catch up.
    Error {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        recovery: Option<Directive>,
    },
    Directive(Directive),
}

impl Response {
    pub fn error(err: impl std::fmt::Display) -> Self {
        Self::Error {
            error: err.to_string(),
            recovery: None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// The directive carried by this response, if any.
    pub fn directive(&self) -> Option<&Directive> {
        match self {
            Self::Directive(directive) => Some(directive),
            Self::Error { recovery, .. } => recovery.as_ref(),
        }
    }
}

impl From<Directive> for Response {
    fn from(directive: Directive) -> Self {
        Self::Directive(directive)
    }
}

enum RenderState {
    Idle,
    Rendered(VNode),
}

/// Render/diff loop of one session.
pub struct RuntimeManager {
    session: SessionId,
    store: Arc<HookStore>,
    registry: Arc<HandlerRegistry>,
    /// Per-session override of the shared root.
    root: Option<SharedComponent>,
    shared_root: RootSlot,
    state: RenderState,
    generation: u64,
    handler_generations: u64,
}

impl RuntimeManager {
    pub fn new(session: SessionId, store: Arc<HookStore>, registry: Arc<HandlerRegistry>) -> Self {
        Self {
            session,
            store,
            registry,
            root: None,
            shared_root: RootSlot::default(),
            state: RenderState::Idle,
            generation: 0,
            handler_generations: Config::default().handler_generations,
        }
    }

    /// Fall back to `slot` when no per-session root is set.
    pub fn with_root_slot(mut self, slot: RootSlot) -> Self {
        self.shared_root = slot;
        self
    }

    /// Number of render generations whose handlers stay resolvable.
    pub fn with_handler_generations(mut self, keep: u64) -> Self {
        self.handler_generations = keep.max(1);
        self
    }

    pub fn set_root<C: Component + 'static>(&mut self, root: C) {
        self.root = Some(Arc::new(root));
    }

    pub fn set_shared_root(&mut self, root: SharedComponent) {
        self.root = Some(root);
    }

    pub fn clear_root(&mut self) {
        self.root = None;
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    /// The tree from the last successful render.
    pub fn current(&self) -> Option<&VNode> {
        match &self.state {
            RenderState::Idle => None,
            RenderState::Rendered(tree) => Some(tree),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Open a hook scope for this session at the current generation.
    pub fn scope(&self) -> HookScope {
        HookScope::enter(
            self.session.clone(),
            Arc::clone(&self.store),
            Arc::clone(&self.registry),
            self.generation,
        )
    }

    fn root(&self) -> Option<SharedComponent> {
        self.root
            .clone()
            .or_else(|| self.shared_root.read().clone())
    }

    /// Render the root and return its HTML.
    ///
    /// Returns an empty string when no root is assigned or the root fails;
    /// `current` is only replaced on success.
    pub fn render(&mut self) -> String {
        match self.render_pass() {
            Ok(Some(tree)) => {
                let html = tree.render_html();
                self.state = RenderState::Rendered(tree);
                html
            }
            Ok(None) => {
                tracing::debug!(session = %self.session, "no root component assigned");
                String::new()
            }
            Err(err) => {
                tracing::error!(session = %self.session, error = %err, "render failed");
                String::new()
            }
        }
    }

    /// Handle a raw event payload, as received from the transport.
    pub fn handle_payload(&mut self, payload: Value) -> Response {
        match Event::from_payload(payload) {
            Ok(event) => self.handle_event(&event),
            Err(err) => {
                tracing::warn!(session = %self.session, error = %err, "rejected event payload");
                Response::error(err)
            }
        }
    }

    /// Run the handler named by `event.target_id`, re-render and respond
    /// with the change.
    pub fn handle_event(&mut self, event: &Event) -> Response {
        if event.target_id.is_empty() {
            return Response::error(Error::invalid_argument("target_id must not be empty"));
        }

        let Some(handler) = self.registry.resolve_for(&self.session, &event.target_id) else {
            tracing::warn!(
                session = %self.session,
                handler = %event.target_id,
                "event for unknown handler"
            );
            return Response::error(Error::HandlerNotFound(event.target_id.clone()));
        };

        let failure = self.invoke(&handler, event).err();
        if let Some(err) = &failure {
            tracing::error!(session = %self.session, error = %err, "handler failed");
        }

        let tree = match self.render_pass() {
            Ok(Some(tree)) => tree,
            Ok(None) => {
                return Response::error(
                    failure.unwrap_or_else(|| Error::Render("no root component assigned".into())),
                )
            }
            Err(err) => {
                tracing::error!(session = %self.session, error = %err, "re-render failed");
                return Response::error(failure.unwrap_or(err));
            }
        };

        let directive = self.commit(tree);
        match failure {
            Some(err) => Response::Error {
                error: err.to_string(),
                recovery: Some(directive),
            },
            None => Response::Directive(directive),
        }
    }

    fn invoke(&self, handler: &Callback, event: &Event) -> Result<()> {
        let scope = self.scope();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(event)));

        let message = match outcome {
            Ok(Ok(())) => {
                scope.run_effects();
                return Ok(());
            }
            Ok(Err(err)) => err.to_string(),
            Err(payload) => panic_message(payload.as_ref()),
        };
        Err(Error::HandlerExecution {
            id: event.target_id.clone(),
            message,
        })
    }

    /// One render pass. `Ok(None)` when there is no root.
    fn render_pass(&mut self) -> Result<Option<VNode>> {
        let Some(root) = self.root() else {
            return Ok(None);
        };

        self.generation += 1;
        let scope = self.scope();
        let tree = match panic::catch_unwind(AssertUnwindSafe(|| root.render())) {
            Ok(result) => result?,
            Err(payload) => return Err(Error::Render(panic_message(payload.as_ref()))),
        };

        let effects = scope.run_effects();
        drop(scope);

        let evicted = self
            .registry
            .evict_stale(&self.session, self.generation, self.handler_generations);
        tracing::trace!(
            session = %self.session,
            generation = self.generation,
            nodes = tree.node_count(),
            effects,
            evicted,
            "render pass complete"
        );
        Ok(Some(tree))
    }

    /// Make `tree` current and describe the change from the previous one.
    fn commit(&mut self, tree: VNode) -> Directive {
        let directive = match &self.state {
            RenderState::Idle => Directive::FullReplace {
                html: tree.render_html(),
            },
            RenderState::Rendered(previous) => {
                let patches = diff_trees(previous, &tree);
                if patches.is_empty() {
                    Directive::Noop
                } else {
                    Directive::Patches { patches }
                }
            }
        };
        self.state = RenderState::Rendered(tree);
        directive
    }
}

impl std::fmt::Debug for RuntimeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeManager")
            .field("session", &self.session)
            .field("generation", &self.generation)
            .field("rendered", &self.current().is_some())
            .finish()
    }
}
