//! Hook Scope
//!
//! The hook scope tracks which session the running code belongs to. Hooks
//! read it to find the session's slot partition, so component functions do
//! not have to thread a session parameter through every call.
//!
//! # Implementation
//!
//! We use a thread-local stack of scope entries. The runtime pushes an entry
//! before invoking a component or an event handler and the returned guard
//! pops it when dropped, including while unwinding from a panic. Event
//! processing is synchronous, so a scope never lives across an `.await`.
//!
//! The stack supports nesting: a collaborator may open a scope for one
//! session while another is active, and the inner one wins until it drops.

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use super::store::HookStore;
use crate::error::{Error, Result};
use crate::runtime::{panic_message, HandlerRegistry, SessionId};

/// An effect queued by `use_effect`, run once the current pass finishes.
pub type PendingEffect = Box<dyn FnOnce()>;

thread_local! {
    static SCOPE_STACK: RefCell<Vec<ScopeEntry>> = RefCell::new(Vec::new());
}

/// An entry in the scope stack.
struct ScopeEntry {
    session: SessionId,
    store: Arc<HookStore>,
    registry: Arc<HandlerRegistry>,
    /// Render generation handlers registered in this scope are tagged with.
    generation: u64,
    /// Effects queued during this scope.
    effects: Vec<PendingEffect>,
}

/// What a hook needs from the active scope, cloned out so no borrow of the
/// stack is held while user code runs.
#[derive(Clone)]
pub(crate) struct ActiveScope {
    pub session: SessionId,
    pub store: Arc<HookStore>,
    pub registry: Arc<HandlerRegistry>,
    pub generation: u64,
}

/// Guard that pops the scope when dropped.
pub struct HookScope {
    session: SessionId,
}

impl HookScope {
    /// Make `session` the current session until the guard drops.
    pub fn enter(
        session: SessionId,
        store: Arc<HookStore>,
        registry: Arc<HandlerRegistry>,
        generation: u64,
    ) -> Self {
        SCOPE_STACK.with(|stack| {
            stack.borrow_mut().push(ScopeEntry {
                session: session.clone(),
                store,
                registry,
                generation,
                effects: Vec::new(),
            });
        });

        Self { session }
    }

    /// Check if there is an active scope.
    pub fn is_active() -> bool {
        SCOPE_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// The session of the innermost scope, if any.
    pub fn current_session() -> Option<SessionId> {
        SCOPE_STACK.with(|stack| stack.borrow().last().map(|entry| entry.session.clone()))
    }

    /// The session this guard belongs to.
    pub fn session(&self) -> &SessionId {
        &self.session
    }

    pub(crate) fn active() -> Result<ActiveScope> {
        SCOPE_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .map(|entry| ActiveScope {
                    session: entry.session.clone(),
                    store: Arc::clone(&entry.store),
                    registry: Arc::clone(&entry.registry),
                    generation: entry.generation,
                })
                .ok_or(Error::NoActiveSession)
        })
    }

    pub(crate) fn queue_effect(effect: PendingEffect) -> Result<()> {
        SCOPE_STACK.with(|stack| match stack.borrow_mut().last_mut() {
            Some(entry) => {
                entry.effects.push(effect);
                Ok(())
            }
            None => Err(Error::NoActiveSession),
        })
    }

    /// Remove and return the effects queued in this scope.
    pub fn take_effects(&self) -> Vec<PendingEffect> {
        SCOPE_STACK.with(|stack| {
            stack
                .borrow_mut()
                .last_mut()
                .map(|entry| std::mem::take(&mut entry.effects))
                .unwrap_or_default()
        })
    }

    /// Run the queued effects in order. A panicking effect is logged and
    /// skipped. Returns how many effects ran.
    pub fn run_effects(&self) -> usize {
        let effects = self.take_effects();
        let count = effects.len();
        for effect in effects {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(effect)) {
                tracing::error!(
                    session = %self.session,
                    panic = %panic_message(payload.as_ref()),
                    "effect panicked"
                );
            }
        }
        count
    }
}

impl Drop for HookScope {
    fn drop(&mut self) {
        SCOPE_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            // Scopes must be dropped in reverse order of entry.
            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry.session, self.session,
                    "HookScope mismatch: expected {}, got {}",
                    self.session, entry.session
                );
                if !entry.effects.is_empty() {
                    tracing::debug!(
                        session = %entry.session,
                        dropped = entry.effects.len(),
                        "scope closed with effects that never ran"
                    );
                }
            }
        });
    }
}

impl std::fmt::Debug for HookScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookScope")
            .field("session", &self.session)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn enter(session: &str) -> HookScope {
        HookScope::enter(
            SessionId::from(session),
            Arc::new(HookStore::new()),
            Arc::new(HandlerRegistry::new()),
            0,
        )
    }

    #[test]
    fn scope_tracks_session() {
        assert!(!HookScope::is_active());
        assert!(HookScope::current_session().is_none());

        {
            let _scope = enter("a");
            assert!(HookScope::is_active());
            assert_eq!(HookScope::current_session(), Some(SessionId::from("a")));
        }

        assert!(!HookScope::is_active());
        assert!(matches!(HookScope::active(), Err(Error::NoActiveSession)));
    }

    #[test]
    fn nested_scopes() {
        let _outer = enter("outer");
        {
            let _inner = enter("inner");
            assert_eq!(HookScope::current_session(), Some(SessionId::from("inner")));
        }
        assert_eq!(HookScope::current_session(), Some(SessionId::from("outer")));
    }

    #[test]
    fn scope_is_released_on_panic() {
        let result = panic::catch_unwind(|| {
            let _scope = enter("panics");
            panic!("handler failed");
        });
        assert!(result.is_err());
        assert!(!HookScope::is_active());
    }

    #[test]
    fn effects_run_in_order_and_survive_panics() {
        let scope = enter("effects");
        let log = Rc::new(Cell::new(0));

        let first = Rc::clone(&log);
        HookScope::queue_effect(Box::new(move || first.set(first.get() * 10 + 1))).unwrap();
        HookScope::queue_effect(Box::new(|| panic!("bad effect"))).unwrap();
        let third = Rc::clone(&log);
        HookScope::queue_effect(Box::new(move || third.set(third.get() * 10 + 3))).unwrap();

        assert_eq!(scope.run_effects(), 3);
        assert_eq!(log.get(), 13);
        assert_eq!(scope.run_effects(), 0);
    }

    #[test]
    fn queue_without_scope_fails() {
        let err = HookScope::queue_effect(Box::new(|| {})).unwrap_err();
        assert!(matches!(err, Error::NoActiveSession));
    }
}
