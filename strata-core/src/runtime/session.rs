//! Session Manager
//!
//! Owns every connected session together with the stores they share. The
//! transport calls [`SessionManager::connect`] when a client arrives and
//! [`SessionManager::disconnect`] when it leaves; everything in between goes
//! through the session id.
//!
//! Each session's [`RuntimeManager`] sits behind its own mutex, so events of
//! one session are processed one at a time while different sessions proceed
//! in parallel.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use super::component::{Component, SharedComponent};
use super::event::Event;
use super::manager::{Response, RootSlot, RuntimeManager};
use super::registry::HandlerRegistry;
use super::SessionId;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::hooks::{HookScope, HookStore};
use crate::vdom::VNode;

struct Session {
    runtime: Mutex<RuntimeManager>,
    last_active: Mutex<Instant>,
}

impl Session {
    fn touch(&self) {
        *self.last_active.lock() = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_active.lock().elapsed()
    }
}

/// Registry of live sessions.
pub struct SessionManager {
    config: Config,
    store: Arc<HookStore>,
    registry: Arc<HandlerRegistry>,
    root: RootSlot,
    sessions: DashMap<SessionId, Arc<Session>>,
}

impl SessionManager {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store: Arc::new(HookStore::managed()),
            registry: Arc::new(HandlerRegistry::managed()),
            root: Arc::new(RwLock::new(None)),
            sessions: DashMap::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<HookStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// Set the root used by every session without an override, including
    /// sessions that are already connected.
    pub fn set_root<C: Component + 'static>(&self, root: C) {
        *self.root.write() = Some(Arc::new(root));
    }

    pub fn set_shared_root(&self, root: SharedComponent) {
        *self.root.write() = Some(root);
    }

    pub fn clear_root(&self) {
        *self.root.write() = None;
    }

    /// Give one session its own root.
    pub fn set_session_root<C: Component + 'static>(&self, id: &SessionId, root: C) -> Result<()> {
        self.session(id)?.runtime.lock().set_root(root);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Create a session and return its id.
    pub fn connect(&self) -> SessionId {
        let id = SessionId::generate();
        self.store.create_session(&id);
        self.registry.open_session(&id);

        let runtime = RuntimeManager::new(id.clone(), Arc::clone(&self.store), Arc::clone(&self.registry))
            .with_root_slot(Arc::clone(&self.root))
            .with_handler_generations(self.config.handler_generations);
        self.sessions.insert(
            id.clone(),
            Arc::new(Session {
                runtime: Mutex::new(runtime),
                last_active: Mutex::new(Instant::now()),
            }),
        );

        tracing::info!(session = %id, sessions = self.sessions.len(), "session connected");
        id
    }

    /// Destroy a session: its runtime, hook slots and handlers.
    ///
    /// Returns `false` if the session was not connected.
    pub fn disconnect(&self, id: &SessionId) -> bool {
        let removed = self.sessions.remove(id).is_some();
        let slots = self.store.slot_count(id);
        self.store.destroy_session(id);
        let handlers = self.registry.release_session(id);

        if removed {
            tracing::info!(session = %id, slots, handlers, "session disconnected");
        }
        removed
    }

    pub fn is_connected(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn session(&self, id: &SessionId) -> Result<Arc<Session>> {
        let session = self
            .sessions
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::SessionNotFound(id.clone()))?;
        session.touch();
        Ok(session)
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Render the session's root and return its HTML.
    pub fn render(&self, id: &SessionId) -> Result<String> {
        Ok(self.session(id)?.runtime.lock().render())
    }

    /// A copy of the tree the session last rendered.
    pub fn current_tree(&self, id: &SessionId) -> Result<Option<VNode>> {
        Ok(self.session(id)?.runtime.lock().current().cloned())
    }

    pub fn handle_event(&self, id: &SessionId, event: &Event) -> Result<Response> {
        Ok(self.session(id)?.runtime.lock().handle_event(event))
    }

    pub fn handle_payload(&self, id: &SessionId, payload: Value) -> Result<Response> {
        Ok(self.session(id)?.runtime.lock().handle_payload(payload))
    }

    /// Open a hook scope for `id` outside of a render, e.g. to seed state
    /// before the first render.
    ///
    /// Hooks called through a scope that outlives the session fail with
    /// `SessionNotFound`.
    pub fn scope(&self, id: &SessionId) -> Result<HookScope> {
        Ok(self.session(id)?.runtime.lock().scope())
    }

    // ------------------------------------------------------------------
    // Expiry
    // ------------------------------------------------------------------

    /// Disconnect sessions idle for longer than the configured TTL.
    pub fn evict_idle(&self) -> usize {
        match self.config.session_ttl() {
            Some(ttl) => self.evict_idle_after(ttl),
            None => 0,
        }
    }

    /// Disconnect sessions idle for at least `ttl`.
    pub fn evict_idle_after(&self, ttl: Duration) -> usize {
        let expired: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().idle_for() >= ttl)
            .map(|entry| entry.key().clone())
            .collect();

        let evicted = expired.iter().filter(|id| self.disconnect(id)).count();
        if evicted > 0 {
            tracing::info!(evicted, "expired idle sessions");
        }
        evicted
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("sessions", &self.sessions.len())
            .field("handlers", &self.registry.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::use_state;

    #[test]
    fn connect_and_disconnect() {
        let manager = SessionManager::new(Config::default());
        let id = manager.connect();
        assert!(manager.is_connected(&id));
        assert!(manager.store().contains_session(&id));

        assert!(manager.disconnect(&id));
        assert!(!manager.disconnect(&id));
        assert!(!manager.store().contains_session(&id));
        assert!(matches!(manager.render(&id), Err(Error::SessionNotFound(_))));
    }

    #[test]
    fn disconnect_releases_state() {
        let manager = SessionManager::new(Config::default());
        manager.set_root(|| -> Result<VNode> {
            let (n, _) = use_state("c", "n", 1)?;
            let id = crate::hooks::use_handler(|_| {})?;
            Ok(VNode::element("p").on("click", &id).child(VNode::text(n.to_string())))
        });

        let id = manager.connect();
        assert!(manager.render(&id).unwrap().ends_with(">1</p>"));
        assert_eq!(manager.store().slot_count(&id), 1);
        assert_eq!(manager.registry().len(), 1);

        manager.disconnect(&id);
        assert_eq!(manager.store().slot_count(&id), 0);
        assert!(manager.registry().is_empty());
    }

    #[test]
    fn session_root_overrides_default() {
        let manager = SessionManager::new(Config::default());
        manager.set_root(|| VNode::element("main"));
        let a = manager.connect();
        let b = manager.connect();
        manager.set_session_root(&b, || VNode::element("aside")).unwrap();

        assert_eq!(manager.render(&a).unwrap(), "<main></main>");
        assert_eq!(manager.render(&b).unwrap(), "<aside></aside>");
    }

    #[test]
    fn scope_seeds_state() {
        let manager = SessionManager::new(Config::default());
        manager.set_root(|| -> Result<VNode> {
            let (name, _) = use_state("greeting", "name", String::from("world"))?;
            Ok(VNode::element("h1").child(VNode::text(format!("hello {}", name))))
        });
        let id = manager.connect();
        {
            let _scope = manager.scope(&id).unwrap();
            let (_, set) = use_state("greeting", "name", String::new()).unwrap();
            set.set("strata".to_string()).unwrap();
        }
        assert_eq!(manager.render(&id).unwrap(), "<h1>hello strata</h1>");
    }

    #[test]
    fn scope_outliving_disconnect_cannot_write() {
        let manager = SessionManager::new(Config::default());
        let id = manager.connect();
        let scope = manager.scope(&id).unwrap();
        manager.disconnect(&id);

        assert!(matches!(use_state("c", "n", 0), Err(Error::SessionNotFound(_))));
        assert!(matches!(
            crate::hooks::use_handler(|_| {}),
            Err(Error::SessionNotFound(_))
        ));
        drop(scope);

        assert!(!manager.store().contains_session(&id));
        assert!(manager.registry().is_empty());
    }

    #[test]
    fn idle_sessions_expire() {
        let manager = SessionManager::new(Config::default());
        let id = manager.connect();
        assert_eq!(manager.evict_idle_after(Duration::from_secs(3600)), 0);
        assert_eq!(manager.evict_idle_after(Duration::ZERO), 1);
        assert!(!manager.is_connected(&id));
    }
}
