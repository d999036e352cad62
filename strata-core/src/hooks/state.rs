//! State hooks: `use_state`, `use_lazy_state` and `use_context`.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::context::HookScope;
use super::ident::Identifier;
use super::store::{HookStore, SlotKey};
use crate::error::Result;
use crate::runtime::SessionId;

/// Writes one slot of one session.
///
/// Setters stay bound to the session they were created in, so a handler
/// that captured a setter during render writes to the right partition no
/// matter which scope is active when it runs. Writes are immediate.
pub struct StateSetter<T> {
    store: Arc<HookStore>,
    session: SessionId,
    slot: SlotKey,
    _marker: PhantomData<fn(T) -> T>,
}

impl<T> StateSetter<T>
where
    T: Serialize + DeserializeOwned,
{
    pub(crate) fn new(store: Arc<HookStore>, session: SessionId, slot: SlotKey) -> Self {
        Self {
            store,
            session,
            slot,
            _marker: PhantomData,
        }
    }

    /// Overwrite the slot.
    pub fn set(&self, value: T) -> Result<()> {
        self.store.set_state(&self.session, &self.slot, &value)
    }

    /// Current value of the slot.
    pub fn get(&self) -> Result<Option<T>> {
        self.store.context(&self.session, &self.slot)
    }

    /// Replace the slot with `f(current)`. Does nothing if the slot is gone.
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(T) -> T,
    {
        match self.get()? {
            Some(current) => self.set(f(current)),
            None => Ok(()),
        }
    }

    pub fn slot(&self) -> &SlotKey {
        &self.slot
    }
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            session: self.session.clone(),
            slot: self.slot.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for StateSetter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateSetter")
            .field("session", &self.session)
            .field("slot", &self.slot)
            .finish()
    }
}

/// Read the slot `(component_id, key)` of the current session, storing
/// `initial` on first use.
///
/// # Example
///
/// ```rust,ignore
/// let (count, set_count) = use_state("counter", "count", 0)?;
/// let increment = use_handler(move |_| {
///     let _ = set_count.set(count + 1);
/// })?;
/// ```
pub fn use_state<T>(
    component_id: impl Identifier,
    key: impl Identifier,
    initial: T,
) -> Result<(T, StateSetter<T>)>
where
    T: Serialize + DeserializeOwned,
{
    let slot = SlotKey::new(component_id, key)?;
    let scope = HookScope::active()?;
    let value = scope.store.state(&scope.session, &slot, initial)?;
    Ok((value, StateSetter::new(scope.store, scope.session, slot)))
}

/// Like [`use_state`], but `init` only runs when the slot is created. A
/// later call never overrides a stored value, whatever `init` would return.
pub fn use_lazy_state<T, F>(component_id: impl Identifier, key: impl Identifier, init: F) -> Result<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> T,
{
    let slot = SlotKey::new(component_id, key)?;
    let scope = HookScope::active()?;
    scope.store.lazy_state(&scope.session, &slot, init)
}

/// Read another component's slot in the current session.
///
/// Returns `None` when the slot does not exist; never creates it.
pub fn use_context<T>(provider_component_id: impl Identifier, key: impl Identifier) -> Result<Option<T>>
where
    T: DeserializeOwned,
{
    let slot = SlotKey::new(provider_component_id, key)?;
    let scope = HookScope::active()?;
    scope.store.context(&scope.session, &slot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::runtime::HandlerRegistry;
    use serde_json::json;

    fn enter(session: &str, store: &Arc<HookStore>) -> HookScope {
        HookScope::enter(
            SessionId::from(session),
            Arc::clone(store),
            Arc::new(HandlerRegistry::new()),
            0,
        )
    }

    #[test]
    fn setter_is_visible_to_next_read() {
        let store = Arc::new(HookStore::new());
        let _scope = enter("s", &store);

        let (value, set) = use_state("counter", "count", 0).unwrap();
        assert_eq!(value, 0);
        set.set(3).unwrap();

        let (value, _) = use_state("counter", "count", 0).unwrap();
        assert_eq!(value, 3);
        assert_eq!(set.get().unwrap(), Some(3));
    }

    #[test]
    fn update_uses_current_value() {
        let store = Arc::new(HookStore::new());
        let _scope = enter("s", &store);

        let (_, set) = use_state("c", "n", 1).unwrap();
        set.update(|n| n * 7).unwrap();
        assert_eq!(use_state("c", "n", 0).unwrap().0, 7);
    }

    #[test]
    fn lazy_state_keeps_mutated_value() {
        let store = Arc::new(HookStore::new());
        let _scope = enter("s", &store);

        let first: String = use_lazy_state("lazy_comp", "lazy_val", || "initial".to_string()).unwrap();
        assert_eq!(first, "initial");

        let (_, set) = use_state("lazy_comp", "lazy_val", "initial".to_string()).unwrap();
        set.set("updated".to_string()).unwrap();

        let second: String =
            use_lazy_state("lazy_comp", "lazy_val", || "different_initial".to_string()).unwrap();
        assert_eq!(second, "updated");
    }

    #[test]
    fn context_reads_provider_slot() {
        let store = Arc::new(HookStore::new());
        let _scope = enter("s", &store);

        let (_, set) = use_state("provider_comp", "shared_data", "initial".to_string()).unwrap();
        set.set("updated_value".to_string()).unwrap();

        let value: Option<String> = use_context("provider_comp", "shared_data").unwrap();
        assert_eq!(value.as_deref(), Some("updated_value"));

        let missing: Option<String> = use_context("provider_comp", "non_existent").unwrap();
        assert_eq!(missing, None);
    }

    #[test]
    fn non_string_identifiers_are_rejected() {
        let store = Arc::new(HookStore::new());
        let _scope = enter("s", &store);

        let err = use_state(&json!(123), "key", 0).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        let err = use_state("comp", &json!(456), 0).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn hooks_require_a_session() {
        let err = use_state("c", "k", 0).unwrap_err();
        assert!(matches!(err, Error::NoActiveSession));
    }

    #[test]
    fn setter_stays_bound_to_its_session() {
        let store = Arc::new(HookStore::new());
        let set_a = {
            let _a = enter("a", &store);
            use_state("c", "k", 0).unwrap().1
        };

        let _b = enter("b", &store);
        set_a.set(10).unwrap();
        assert_eq!(use_state("c", "k", 0).unwrap().0, 0);

        let _a = enter("a", &store);
        assert_eq!(use_state("c", "k", 0).unwrap().0, 10);
    }
}
