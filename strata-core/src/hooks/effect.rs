//! Effect hooks.
//!
//! - [`use_effect`] queues a callback that runs once the current render pass
//!   has produced its tree. There is no dependency tracking; it runs on every
//!   pass.
//! - [`use_effect_with_deps`] runs its callback right away, but only when the
//!   dependency list differs from the one stored the last time the effect
//!   with the same id ran in this session.

use serde_json::Value;

use super::context::HookScope;
use super::ident::Identifier;
use super::store::Deps;
use crate::error::Result;

/// Queue `effect` to run after the current render pass.
pub fn use_effect<F>(effect: F) -> Result<()>
where
    F: FnOnce() + 'static,
{
    HookScope::queue_effect(Box::new(effect))
}

/// Run `effect` if `deps` changed since this effect id last ran.
///
/// Dependencies compare elementwise by value, in order. The first call for an
/// effect id always runs. The new list is stored only when the effect runs.
/// Returns whether it ran.
///
/// # Example
///
/// ```rust,ignore
/// use serde_json::json;
///
/// use_effect_with_deps("title-sync", move || sync_title(count), [json!(count)])?;
/// ```
pub fn use_effect_with_deps<F, I>(effect_id: impl Identifier, effect: F, deps: I) -> Result<bool>
where
    F: FnOnce(),
    I: IntoIterator<Item = Value>,
{
    let effect_id = effect_id.into_identifier("effect_id")?;
    let scope = HookScope::active()?;
    let deps: Deps = deps.into_iter().collect();

    if !scope.store.deps_changed(&scope.session, &effect_id, &deps) {
        return Ok(false);
    }

    tracing::trace!(session = %scope.session, effect = %effect_id, "running effect");
    effect();
    scope.store.commit_deps(&scope.session, &effect_id, deps)?;
    Ok(true)
}
