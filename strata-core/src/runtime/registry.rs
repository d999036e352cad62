//! Handler Registry
//!
//! Maps opaque handler ids to callbacks. Ids are random UUIDs, so they are
//! unique across the process lifetime and cannot be guessed by a client.
//!
//! Entries registered through hooks carry the owning session and the render
//! generation that created them. The runtime uses both to keep the registry
//! from growing without bound: stale generations are evicted after each
//! render and all of a session's entries go when it disconnects. A
//! per-session index keeps both proportional to the session's own handlers.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use super::event::Event;
use super::SessionId;
use crate::error::Error;

/// Error type handlers may return.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// A registered event callback.
pub type Callback = Arc<dyn Fn(&Event) -> Result<(), HandlerError> + Send + Sync>;

/// Opaque handler identifier, as placed in `data-on-*` attributes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlerId(String);

impl HandlerId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for HandlerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for HandlerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

struct Entry {
    callback: Callback,
    owner: Option<SessionId>,
}

/// Concurrent map from handler id to callback.
#[derive(Default)]
pub struct HandlerRegistry {
    entries: DashMap<HandlerId, Entry>,
    /// Ids each session registered, with the generation that created them.
    owned: DashMap<SessionId, Vec<(u64, HandlerId)>>,
    /// Only sessions opened with [`open_session`](Self::open_session) may
    /// register.
    managed: bool,
}

impl HandlerRegistry {
    /// A registry that accepts owned handlers for any session id.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry that accepts owned handlers only between
    /// [`open_session`](Self::open_session) and
    /// [`release_session`](Self::release_session).
    pub fn managed() -> Self {
        Self {
            managed: true,
            ..Self::default()
        }
    }

    /// Allow `session` to register handlers.
    pub fn open_session(&self, session: &SessionId) {
        self.owned.entry(session.clone()).or_default();
    }

    /// Register a callback with no owner. It stays until removed.
    pub fn register<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.insert(infallible(handler), None)
    }

    /// Register a callback that may fail, with no owner.
    pub fn register_fallible<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&Event) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.insert(Arc::new(handler), None)
    }

    /// Register a callback owned by `session`, created during render
    /// `generation`.
    ///
    /// Fails with [`Error::SessionNotFound`] on a managed registry once the
    /// session has been released.
    pub fn register_for<F>(
        &self,
        session: &SessionId,
        generation: u64,
        handler: F,
    ) -> crate::Result<HandlerId>
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.insert_owned(session, generation, infallible(handler))
    }

    pub fn register_fallible_for<F>(
        &self,
        session: &SessionId,
        generation: u64,
        handler: F,
    ) -> crate::Result<HandlerId>
    where
        F: Fn(&Event) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.insert_owned(session, generation, Arc::new(handler))
    }

    fn insert(&self, callback: Callback, owner: Option<SessionId>) -> HandlerId {
        let id = HandlerId::generate();
        self.entries.insert(id.clone(), Entry { callback, owner });
        id
    }

    fn insert_owned(
        &self,
        session: &SessionId,
        generation: u64,
        callback: Callback,
    ) -> crate::Result<HandlerId> {
        // The index guard is held across the insert so a concurrent
        // release_session sees the new id.
        let mut owned = match self.owned.get_mut(session) {
            Some(owned) => owned,
            None if self.managed => return Err(Error::SessionNotFound(session.clone())),
            None => self.owned.entry(session.clone()).or_default(),
        };
        let id = self.insert(callback, Some(session.clone()));
        owned.push((generation, id.clone()));
        Ok(id)
    }

    /// Look up a callback regardless of its owner. The callback is cloned
    /// out so it can run without holding a shard lock.
    pub fn resolve(&self, id: &str) -> Option<Callback> {
        self.entries
            .get(&HandlerId::from(id))
            .map(|entry| Arc::clone(&entry.callback))
    }

    /// Look up a callback on behalf of `session`. Handlers owned by another
    /// session are reported as missing; unowned handlers resolve for all.
    pub fn resolve_for(&self, session: &SessionId, id: &str) -> Option<Callback> {
        self.entries
            .get(&HandlerId::from(id))
            .filter(|entry| entry.owner.as_ref().map_or(true, |owner| owner == session))
            .map(|entry| Arc::clone(&entry.callback))
    }

    pub fn remove(&self, id: &HandlerId) -> bool {
        let Some((_, entry)) = self.entries.remove(id) else {
            return false;
        };
        if let Some(owner) = entry.owner {
            if let Some(mut owned) = self.owned.get_mut(&owner) {
                owned.retain(|(_, owned_id)| owned_id != id);
            }
        }
        true
    }

    /// Drop every handler. Open sessions stay open.
    pub fn clear(&self) {
        self.owned.iter_mut().for_each(|mut owned| owned.clear());
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of handlers `session` currently owns.
    pub fn session_len(&self, session: &SessionId) -> usize {
        self.owned.get(session).map(|owned| owned.len()).unwrap_or(0)
    }

    /// Drop `session`'s handlers created more than `keep` generations
    /// before `current`. Returns how many were removed.
    ///
    /// With `keep = 2`, handlers from the current and the previous render
    /// survive, so an event racing a re-render still resolves.
    pub fn evict_stale(&self, session: &SessionId, current: u64, keep: u64) -> usize {
        let Some(mut owned) = self.owned.get_mut(session) else {
            return 0;
        };
        let mut removed = 0;
        owned.retain(|(generation, id)| {
            if generation + keep > current {
                return true;
            }
            if self.entries.remove(id).is_some() {
                removed += 1;
            }
            false
        });
        removed
    }

    /// Drop every handler owned by `session`. On a managed registry the
    /// session can no longer register afterwards.
    pub fn release_session(&self, session: &SessionId) -> usize {
        let Some((_, owned)) = self.owned.remove(session) else {
            return 0;
        };
        owned
            .iter()
            .filter(|(_, id)| self.entries.remove(id).is_some())
            .count()
    }
}

fn infallible<F>(handler: F) -> Callback
where
    F: Fn(&Event) + Send + Sync + 'static,
{
    Arc::new(move |event: &Event| -> Result<(), HandlerError> {
        handler(event);
        Ok(())
    })
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.entries.len())
            .finish()
    }
}
