//! Hook Store
//!
//! The hook store holds every hook slot of every session. Slots are keyed by
//! `(session, component_id, key)`; effect dependency lists are keyed by
//! `(session, effect_id)`.
//!
//! # Partitioning
//!
//! Storage is a `DashMap` from session id to that session's partition, so
//! sessions only contend when they hash to the same shard, and one session's
//! slots can never be reached through another session's id. Dropping a
//! partition releases everything the session stored.
//!
//! A store built with [`HookStore::new`] creates partitions on first write.
//! One built with [`HookStore::managed`] only writes to partitions opened by
//! [`create_session`](HookStore::create_session); once a partition is
//! destroyed, writes for that session fail with `SessionNotFound` instead of
//! bringing it back.
//!
//! # Locking
//!
//! No user code (lazy initializers, reducers) runs while a shard lock is
//! held. Values are copied out, the user code runs, and the result is written
//! back. Within a session, events are processed one at a time, so the gap
//! between read and write is never observed by another writer.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::mapref::one::RefMut;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::runtime::SessionId;

/// Ordered dependency list of an effect.
pub type Deps = SmallVec<[Value; 4]>;

/// A type-erased reducer: `(state, action) -> state`.
pub type ReducerFn = Arc<dyn Fn(Value, Value) -> Result<Value> + Send + Sync>;

/// Identifies a slot within a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotKey {
    component_id: String,
    key: String,
}

impl SlotKey {
    /// Build a slot key. Both parts must be non-empty strings; see
    /// [`Identifier`](super::Identifier).
    pub fn new(component_id: impl super::Identifier, key: impl super::Identifier) -> Result<Self> {
        Ok(Self {
            component_id: component_id.into_identifier("component_id")?,
            key: key.into_identifier("key")?,
        })
    }

    pub fn component_id(&self) -> &str {
        &self.component_id
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/{:?}", self.component_id, self.key)
    }
}

/// One stored value.
struct Slot {
    value: Value,
    /// Present for reducer slots; replaced by every `use_reducer` call.
    reducer: Option<ReducerFn>,
    /// The last action dispatched to a reducer slot.
    last_action: Option<Value>,
}

impl Slot {
    fn new(value: Value) -> Self {
        Self {
            value,
            reducer: None,
            last_action: None,
        }
    }
}

/// All hook state belonging to one session.
#[derive(Default)]
struct Partition {
    slots: HashMap<SlotKey, Slot>,
    effects: HashMap<String, Deps>,
}

/// Per-session hook slot storage.
#[derive(Default)]
pub struct HookStore {
    partitions: DashMap<SessionId, Partition>,
    managed: bool,
}

fn decode<T: DeserializeOwned>(slot: &SlotKey, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|source| Error::SlotType {
        slot: slot.to_string(),
        source,
    })
}

impl HookStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose partitions exist only between
    /// [`create_session`](Self::create_session) and
    /// [`destroy_session`](Self::destroy_session).
    pub fn managed() -> Self {
        Self {
            managed: true,
            ..Self::default()
        }
    }

    /// Write access to `session`'s partition, creating it unless the store
    /// is managed.
    fn partition_mut(&self, session: &SessionId) -> Result<RefMut<'_, SessionId, Partition>> {
        if let Some(partition) = self.partitions.get_mut(session) {
            return Ok(partition);
        }
        if self.managed {
            return Err(Error::SessionNotFound(session.clone()));
        }
        Ok(self.partitions.entry(session.clone()).or_default())
    }

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    /// Create an empty partition for `session`. Existing partitions are kept.
    pub fn create_session(&self, session: &SessionId) {
        self.partitions.entry(session.clone()).or_default();
    }

    /// Release every slot and effect record of `session`.
    ///
    /// Returns `false` if the session had no partition.
    pub fn destroy_session(&self, session: &SessionId) -> bool {
        self.partitions.remove(session).is_some()
    }

    pub fn contains_session(&self, session: &SessionId) -> bool {
        self.partitions.contains_key(session)
    }

    pub fn session_count(&self) -> usize {
        self.partitions.len()
    }

    /// Number of slots stored for `session`.
    pub fn slot_count(&self, session: &SessionId) -> usize {
        self.partitions
            .get(session)
            .map(|p| p.slots.len())
            .unwrap_or(0)
    }

    // ------------------------------------------------------------------
    // Raw slot access
    // ------------------------------------------------------------------

    /// Read a slot without creating it.
    pub fn get(&self, session: &SessionId, slot: &SlotKey) -> Option<Value> {
        self.partitions
            .get(session)
            .and_then(|p| p.slots.get(slot).map(|s| s.value.clone()))
    }

    /// Read a slot, creating it from `init` on first access.
    ///
    /// `init` runs only when the slot does not exist yet, so slots come
    /// into being on first read. A missing partition is created unless the
    /// store is managed, in which case this fails with `SessionNotFound`.
    pub fn get_or_init<F>(&self, session: &SessionId, slot: &SlotKey, init: F) -> Result<Value>
    where
        F: FnOnce() -> Result<Value>,
    {
        if let Some(value) = self.get(session, slot) {
            return Ok(value);
        }

        let initial = init()?;
        let mut partition = self.partition_mut(session)?;
        let stored = partition
            .slots
            .entry(slot.clone())
            .or_insert_with(|| Slot::new(initial));
        Ok(stored.value.clone())
    }

    /// Overwrite a slot. The session must still exist.
    pub fn set(&self, session: &SessionId, slot: &SlotKey, value: Value) -> Result<()> {
        let mut partition = self
            .partitions
            .get_mut(session)
            .ok_or_else(|| Error::SessionNotFound(session.clone()))?;

        match partition.slots.get_mut(slot) {
            Some(existing) => existing.value = value,
            None => {
                partition.slots.insert(slot.clone(), Slot::new(value));
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reducers
    // ------------------------------------------------------------------

    /// Read a reducer slot, creating it on first access, and install
    /// `reducer` as the slot's reducer.
    pub fn get_or_init_reducer<F>(
        &self,
        session: &SessionId,
        slot: &SlotKey,
        reducer: ReducerFn,
        init: F,
    ) -> Result<Value>
    where
        F: FnOnce() -> Result<Value>,
    {
        let value = self.get_or_init(session, slot, init)?;
        if let Some(mut partition) = self.partitions.get_mut(session) {
            if let Some(stored) = partition.slots.get_mut(slot) {
                stored.reducer = Some(reducer);
            }
        }
        Ok(value)
    }

    /// Apply the slot's reducer to `action` and commit the result.
    ///
    /// The new state is stored before this returns.
    pub fn dispatch(&self, session: &SessionId, slot: &SlotKey, action: Value) -> Result<Value> {
        let (reducer, state) = {
            let partition = self
                .partitions
                .get(session)
                .ok_or_else(|| Error::SessionNotFound(session.clone()))?;
            let stored = partition
                .slots
                .get(slot)
                .ok_or_else(|| Error::invalid_argument(format!("slot {} does not exist", slot)))?;
            let reducer = stored.reducer.clone().ok_or_else(|| {
                Error::invalid_argument(format!("slot {} has no reducer", slot))
            })?;
            (reducer, stored.value.clone())
        };

        let next = reducer(state, action.clone())?;

        let mut partition = self
            .partitions
            .get_mut(session)
            .ok_or_else(|| Error::SessionNotFound(session.clone()))?;
        let stored = partition
            .slots
            .get_mut(slot)
            .ok_or_else(|| Error::invalid_argument(format!("slot {} does not exist", slot)))?;
        stored.value = next.clone();
        stored.last_action = Some(action);
        Ok(next)
    }

    /// The last action dispatched to a reducer slot.
    pub fn last_action(&self, session: &SessionId, slot: &SlotKey) -> Option<Value> {
        self.partitions
            .get(session)
            .and_then(|p| p.slots.get(slot).and_then(|s| s.last_action.clone()))
    }

    // ------------------------------------------------------------------
    // Effects
    // ------------------------------------------------------------------

    /// Whether `deps` differs from the list last stored for `effect_id`.
    ///
    /// An effect that never ran always counts as changed.
    pub fn deps_changed(&self, session: &SessionId, effect_id: &str, deps: &[Value]) -> bool {
        self.partitions
            .get(session)
            .and_then(|p| p.effects.get(effect_id).map(|stored| stored.as_slice() != deps))
            .unwrap_or(true)
    }

    /// Record the dependency list of an effect that just ran.
    pub fn commit_deps(&self, session: &SessionId, effect_id: &str, deps: Deps) -> Result<()> {
        self.partition_mut(session)?
            .effects
            .insert(effect_id.to_string(), deps);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Typed access
    // ------------------------------------------------------------------

    /// Typed form of [`get_or_init`](Self::get_or_init) with an eager
    /// initial value.
    pub fn state<T>(&self, session: &SessionId, slot: &SlotKey, initial: T) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
    {
        let value = self.get_or_init(session, slot, || Ok(serde_json::to_value(initial)?))?;
        decode(slot, value)
    }

    /// Typed form of [`get_or_init`](Self::get_or_init); `init` runs only
    /// when the slot is created.
    pub fn lazy_state<T, F>(&self, session: &SessionId, slot: &SlotKey, init: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        let value = self.get_or_init(session, slot, || Ok(serde_json::to_value(init())?))?;
        decode(slot, value)
    }

    /// Typed write.
    pub fn set_state<T: Serialize>(&self, session: &SessionId, slot: &SlotKey, value: &T) -> Result<()> {
        self.set(session, slot, serde_json::to_value(value)?)
    }

    /// Typed read without creation.
    pub fn context<T: DeserializeOwned>(&self, session: &SessionId, slot: &SlotKey) -> Result<Option<T>> {
        self.get(session, slot)
            .map(|value| decode(slot, value))
            .transpose()
    }
}

impl fmt::Debug for HookStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookStore")
            .field("sessions", &self.partitions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn slot(c: &str, k: &str) -> SlotKey {
        SlotKey::new(c, k).unwrap()
    }

    #[test]
    fn state_initializes_once() {
        let store = HookStore::new();
        let session = SessionId::from("s");
        let key = slot("counter", "count");

        assert_eq!(store.state(&session, &key, 0).unwrap(), 0);
        store.set_state(&session, &key, &5).unwrap();
        assert_eq!(store.state(&session, &key, 0).unwrap(), 5);
    }

    #[test]
    fn sessions_are_isolated() {
        let store = HookStore::new();
        let a = SessionId::from("a");
        let b = SessionId::from("b");
        let key = slot("c", "k");

        store.state(&a, &key, 0).unwrap();
        store.set_state(&a, &key, &10).unwrap();

        assert_eq!(store.state(&b, &key, 0).unwrap(), 0);
        assert_eq!(store.state(&a, &key, 0).unwrap(), 10);
    }

    #[test]
    fn lazy_init_runs_once() {
        let store = HookStore::new();
        let session = SessionId::from("s");
        let key = slot("app", "config");
        let mut calls = 0;

        let first: String = store
            .lazy_state(&session, &key, || {
                calls += 1;
                "initial".to_string()
            })
            .unwrap();
        let second: String = store
            .lazy_state(&session, &key, || {
                calls += 1;
                "other".to_string()
            })
            .unwrap();

        assert_eq!(first, "initial");
        assert_eq!(second, "initial");
        assert_eq!(calls, 1);
    }

    #[test]
    fn context_does_not_create_slots() {
        let store = HookStore::new();
        let session = SessionId::from("s");
        let missing: Option<i32> = store.context(&session, &slot("p", "missing")).unwrap();
        assert_eq!(missing, None);
        assert!(!store.contains_session(&session));
    }

    #[test]
    fn type_mismatch_is_reported() {
        let store = HookStore::new();
        let session = SessionId::from("s");
        let key = slot("c", "k");
        store.state(&session, &key, "text".to_string()).unwrap();

        let err = store.state::<i64>(&session, &key, 0).unwrap_err();
        assert!(matches!(err, Error::SlotType { .. }));
    }

    #[test]
    fn dispatch_applies_reducer() {
        let store = HookStore::new();
        let session = SessionId::from("s");
        let key = slot("todo", "count");
        let reducer: ReducerFn = Arc::new(|state: Value, action: Value| -> Result<Value> {
            let n = state.as_i64().unwrap_or(0);
            Ok(match action["type"].as_str() {
                Some("INC") => json!(n + 1),
                Some("DEC") => json!(n - 1),
                _ => state,
            })
        });

        let initial = store
            .get_or_init_reducer(&session, &key, reducer, || Ok(json!(0)))
            .unwrap();
        assert_eq!(initial, json!(0));

        assert_eq!(store.dispatch(&session, &key, json!({"type": "INC"})).unwrap(), json!(1));
        assert_eq!(store.get(&session, &key), Some(json!(1)));
        assert_eq!(store.last_action(&session, &key), Some(json!({"type": "INC"})));
    }

    #[test]
    fn dispatch_without_reducer_fails() {
        let store = HookStore::new();
        let session = SessionId::from("s");
        let key = slot("c", "plain");
        store.state(&session, &key, 1).unwrap();

        let err = store.dispatch(&session, &key, json!(null)).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn deps_tracking() {
        let store = HookStore::new();
        let session = SessionId::from("s");
        let deps: Deps = smallvec::smallvec![json!(1), json!("a")];

        assert!(store.deps_changed(&session, "e", &deps));
        store.commit_deps(&session, "e", deps.clone()).unwrap();
        assert!(!store.deps_changed(&session, "e", &deps));
        assert!(store.deps_changed(&session, "e", &[json!(1), json!("b")]));
        assert!(store.deps_changed(&session, "e", &[json!(1)]));
    }

    #[test]
    fn destroy_releases_partition() {
        let store = HookStore::new();
        let session = SessionId::from("s");
        store.state(&session, &slot("c", "k"), 1).unwrap();
        assert_eq!(store.slot_count(&session), 1);

        assert!(store.destroy_session(&session));
        assert!(!store.contains_session(&session));
        assert_eq!(store.slot_count(&session), 0);

        let err = store.set(&session, &slot("c", "k"), json!(2)).unwrap_err();
        assert!(matches!(err, Error::SessionNotFound(_)));
    }

    #[test]
    fn managed_store_rejects_writes_after_destroy() {
        let store = HookStore::managed();
        let session = SessionId::from("s");
        let key = slot("c", "k");

        let err = store.state(&session, &key, 0).unwrap_err();
        assert!(matches!(err, Error::SessionNotFound(_)));

        store.create_session(&session);
        store.state(&session, &key, 0).unwrap();
        store.destroy_session(&session);

        let err = store.state(&session, &key, 1).unwrap_err();
        assert!(matches!(err, Error::SessionNotFound(_)));
        let err = store.commit_deps(&session, "e", Deps::new()).unwrap_err();
        assert!(matches!(err, Error::SessionNotFound(_)));
        assert!(!store.contains_session(&session));
        assert_eq!(store.slot_count(&session), 0);
    }
}
