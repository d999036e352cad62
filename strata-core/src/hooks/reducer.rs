//! Reducer hook.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::context::HookScope;
use super::ident::Identifier;
use super::store::{HookStore, ReducerFn, SlotKey};
use crate::error::{Error, Result};
use crate::runtime::SessionId;

/// Sends actions to a reducer slot.
pub struct Dispatch<S, A> {
    store: Arc<HookStore>,
    session: SessionId,
    slot: SlotKey,
    _marker: PhantomData<fn(A) -> S>,
}

impl<S, A> Dispatch<S, A>
where
    S: DeserializeOwned,
    A: Serialize,
{
    /// Apply the reducer to `action` and commit the new state before
    /// returning it.
    pub fn dispatch(&self, action: A) -> Result<S> {
        let action = serde_json::to_value(action)?;
        let next = self.store.dispatch(&self.session, &self.slot, action)?;
        serde_json::from_value(next).map_err(|source| Error::SlotType {
            slot: self.slot.to_string(),
            source,
        })
    }
}

impl<S, A> Clone for Dispatch<S, A> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            session: self.session.clone(),
            slot: self.slot.clone(),
            _marker: PhantomData,
        }
    }
}

impl<S, A> fmt::Debug for Dispatch<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch")
            .field("session", &self.session)
            .field("slot", &self.slot)
            .finish()
    }
}

fn erase<S, A, R>(reducer: R) -> ReducerFn
where
    S: Serialize + DeserializeOwned + 'static,
    A: DeserializeOwned + 'static,
    R: Fn(S, A) -> S + Send + Sync + 'static,
{
    Arc::new(move |state: Value, action: Value| -> Result<Value> {
        let state: S = serde_json::from_value(state)?;
        let action: A = serde_json::from_value(action)?;
        Ok(serde_json::to_value(reducer(state, action))?)
    })
}

/// State managed by a reducer.
///
/// `initial` is stored on first use. Every call installs `reducer` as the
/// slot's reducer, so dispatches always use the closure from the latest
/// render.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Serialize, Deserialize)]
/// enum Action { Inc, Dec }
///
/// let (count, dispatch) = use_reducer("counter", "count", |n: i64, a: Action| match a {
///     Action::Inc => n + 1,
///     Action::Dec => n - 1,
/// }, 0)?;
/// dispatch.dispatch(Action::Inc)?;
/// ```
pub fn use_reducer<S, A, R>(
    component_id: impl Identifier,
    key: impl Identifier,
    reducer: R,
    initial: S,
) -> Result<(S, Dispatch<S, A>)>
where
    S: Serialize + DeserializeOwned + 'static,
    A: Serialize + DeserializeOwned + 'static,
    R: Fn(S, A) -> S + Send + Sync + 'static,
{
    let slot = SlotKey::new(component_id, key)?;
    let scope = HookScope::active()?;

    let value = scope.store.get_or_init_reducer(
        &scope.session,
        &slot,
        erase(reducer),
        || Ok(serde_json::to_value(initial)?),
    )?;
    let state = serde_json::from_value(value).map_err(|source| Error::SlotType {
        slot: slot.to_string(),
        source,
    })?;

    Ok((
        state,
        Dispatch {
            store: scope.store,
            session: scope.session,
            slot,
            _marker: PhantomData,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::HandlerRegistry;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(tag = "type", rename_all = "UPPERCASE")]
    enum Action {
        Inc,
        Dec,
    }

    fn reducer(state: i64, action: Action) -> i64 {
        match action {
            Action::Inc => state + 1,
            Action::Dec => state - 1,
        }
    }

    #[test]
    fn dispatch_commits_before_returning() {
        let store = Arc::new(HookStore::new());
        let _scope = HookScope::enter(
            SessionId::from("session_reducer"),
            Arc::clone(&store),
            Arc::new(HandlerRegistry::new()),
            0,
        );

        let (state, dispatch) = use_reducer("test_reducer_comp", "count", reducer, 0).unwrap();
        assert_eq!(state, 0);

        assert_eq!(dispatch.dispatch(Action::Inc).unwrap(), 1);
        let (state, _) = use_reducer("test_reducer_comp", "count", reducer, 0).unwrap();
        assert_eq!(state, 1);

        dispatch.dispatch(Action::Dec).unwrap();
        let (state, _) = use_reducer("test_reducer_comp", "count", reducer, 0).unwrap();
        assert_eq!(state, 0);
    }

    #[test]
    fn latest_reducer_wins() {
        let store = Arc::new(HookStore::new());
        let _scope = HookScope::enter(
            SessionId::from("s"),
            Arc::clone(&store),
            Arc::new(HandlerRegistry::new()),
            0,
        );

        let (_, dispatch) = use_reducer("c", "k", |n: i64, _: Action| n + 1, 0).unwrap();
        let _ = use_reducer("c", "k", |n: i64, _: Action| n + 100, 0).unwrap();

        assert_eq!(dispatch.dispatch(Action::Inc).unwrap(), 100);
    }
}
