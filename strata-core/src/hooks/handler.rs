//! Handler hooks.
//!
//! Registers an event callback in the current session's handler registry.
//! The returned id is what a component puts on a node with
//! [`VNode::on`](crate::vdom::VNode::on). Registrations are tagged with the
//! render generation that created them so the runtime can drop handlers that
//! later renders no longer reference.

use super::context::HookScope;
use crate::error::Result;
use crate::runtime::{Event, HandlerError, HandlerId};

/// Register an infallible handler for the current session.
pub fn use_handler<F>(handler: F) -> Result<HandlerId>
where
    F: Fn(&Event) + Send + Sync + 'static,
{
    let scope = HookScope::active()?;
    scope
        .registry
        .register_for(&scope.session, scope.generation, handler)
}

/// Register a handler that may fail. A failure is reported to the client
/// together with a fresh render.
pub fn use_fallible_handler<F>(handler: F) -> Result<HandlerId>
where
    F: Fn(&Event) -> std::result::Result<(), HandlerError> + Send + Sync + 'static,
{
    let scope = HookScope::active()?;
    scope
        .registry
        .register_fallible_for(&scope.session, scope.generation, handler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::hooks::HookStore;
    use crate::runtime::{HandlerRegistry, SessionId};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn registers_into_scope_registry() {
        let registry = Arc::new(HandlerRegistry::new());
        let _scope = HookScope::enter(
            SessionId::from("s"),
            Arc::new(HookStore::new()),
            Arc::clone(&registry),
            3,
        );

        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let id = use_handler(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        let callback = registry.resolve(id.as_str()).unwrap();
        callback(&Event::new("x")).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn fallible_handler_reports_errors() {
        let registry = Arc::new(HandlerRegistry::new());
        let _scope = HookScope::enter(
            SessionId::from("s"),
            Arc::new(HookStore::new()),
            Arc::clone(&registry),
            0,
        );

        let id = use_fallible_handler(|_| Err("Intentional handler failure".into())).unwrap();
        let err = registry.resolve(id.as_str()).unwrap()(&Event::new("x")).unwrap_err();
        assert_eq!(err.to_string(), "Intentional handler failure");
    }

    #[test]
    fn released_session_cannot_register() {
        let session = SessionId::from("gone");
        let registry = Arc::new(HandlerRegistry::managed());
        registry.open_session(&session);
        registry.release_session(&session);
        let _scope = HookScope::enter(session, Arc::new(HookStore::new()), Arc::clone(&registry), 0);

        assert!(matches!(use_handler(|_| {}), Err(Error::SessionNotFound(_))));
        assert!(registry.is_empty());
    }

    #[test]
    fn requires_a_session() {
        assert!(matches!(use_handler(|_| {}), Err(Error::NoActiveSession)));
    }
}
