//! Components.
//!
//! A component is anything that can produce a [`VNode`] with no arguments.
//! Plain closures qualify: `|| VNode::element("p")` and closures returning
//! `Result<VNode, E>` for any `E: Into<Error>` (crate errors and strings)
//! both implement [`Component`].
//!
//! Two wrappers change how a child's failure is shown: [`ErrorBoundary`]
//! replaces a failing child, and [`Suspense`] replaces a child that is still
//! waiting on a [`Lazy`] value.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};
use std::thread;

use super::panic_message;
use crate::error::{Error, Result};
use crate::vdom::VNode;

/// A renderable unit. Hooks called inside `render` resolve to the session
/// the runtime is rendering for.
pub trait Component: Send + Sync {
    fn render(&self) -> Result<VNode>;
}

/// A component shared between sessions.
pub type SharedComponent = Arc<dyn Component>;

/// Conversion from a component function's return value.
pub trait IntoRendered {
    fn into_rendered(self) -> Result<VNode>;
}

impl IntoRendered for VNode {
    fn into_rendered(self) -> Result<VNode> {
        Ok(self)
    }
}

/// Crate errors pass through unchanged; string errors become
/// [`Error::Render`].
impl<E: Into<Error>> IntoRendered for std::result::Result<VNode, E> {
    fn into_rendered(self) -> Result<VNode> {
        self.map_err(Into::into)
    }
}

impl<F, R> Component for F
where
    F: Fn() -> R + Send + Sync,
    R: IntoRendered,
{
    fn render(&self) -> Result<VNode> {
        self().into_rendered()
    }
}

/// Renders `fallback` in place of a child that fails, either by returning
/// an error or by panicking.
pub struct ErrorBoundary<C, F> {
    inner: C,
    fallback: F,
}

impl<C, F> ErrorBoundary<C, F>
where
    C: Component,
    F: Fn(&Error) -> VNode + Send + Sync,
{
    pub fn new(inner: C, fallback: F) -> Self {
        Self { inner, fallback }
    }
}

impl<C, F> Component for ErrorBoundary<C, F>
where
    C: Component,
    F: Fn(&Error) -> VNode + Send + Sync,
{
    fn render(&self) -> Result<VNode> {
        let error = match panic::catch_unwind(AssertUnwindSafe(|| self.inner.render())) {
            Ok(Ok(tree)) => return Ok(tree),
            Ok(Err(err)) => err,
            Err(payload) => Error::Render(panic_message(payload.as_ref())),
        };
        tracing::warn!(error = %error, "component failed, rendering fallback");
        Ok((self.fallback)(&error))
    }
}

/// A value produced off the render path, such as the result of a slow
/// query.
///
/// Reading it before it is ready fails with [`Error::Pending`], which a
/// [`Suspense`] above the reader turns into its fallback. Clones share the
/// same value.
pub struct Lazy<T> {
    name: Arc<str>,
    cell: Arc<OnceLock<std::result::Result<T, String>>>,
}

impl<T> Clone for Lazy<T> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T: Send + Sync + 'static> Lazy<T> {
    /// A value that stays pending until [`complete`](Self::complete) or
    /// [`fail`](Self::fail) is called.
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name.into()),
            cell: Arc::new(OnceLock::new()),
        }
    }

    /// Run `load` on a background thread. A panic in `load` counts as a
    /// failed load.
    pub fn spawn<F, E>(name: impl Into<String>, load: F) -> Self
    where
        F: FnOnce() -> std::result::Result<T, E> + Send + 'static,
        E: fmt::Display,
    {
        let lazy = Self::pending(name);
        let cell = Arc::clone(&lazy.cell);
        let name = Arc::clone(&lazy.name);
        thread::spawn(move || {
            let outcome = match panic::catch_unwind(AssertUnwindSafe(load)) {
                Ok(result) => result.map_err(|e| e.to_string()),
                Err(payload) => Err(panic_message(payload.as_ref())),
            };
            if let Err(message) = &outcome {
                tracing::warn!(resource = %name, error = %message, "lazy load failed");
            }
            let _ = cell.set(outcome);
        });
        lazy
    }

    /// Store the loaded value. Returns `false` if the value was already
    /// settled.
    pub fn complete(&self, value: T) -> bool {
        self.cell.set(Ok(value)).is_ok()
    }

    /// Settle the value as failed. Returns `false` if it was already settled.
    pub fn fail(&self, message: impl Into<String>) -> bool {
        self.cell.set(Err(message.into())).is_ok()
    }

    pub fn is_ready(&self) -> bool {
        self.cell.get().is_some()
    }

    /// The loaded value, [`Error::Pending`] while loading, or
    /// [`Error::Render`] if the load failed.
    pub fn get(&self) -> Result<&T> {
        match self.cell.get() {
            None => Err(Error::Pending(self.name.to_string())),
            Some(Ok(value)) => Ok(value),
            Some(Err(message)) => Err(Error::Render(format!(
                "{} failed to load: {}",
                self.name, message
            ))),
        }
    }
}

/// Renders `fallback` while its child reports [`Error::Pending`].
///
/// Other errors pass through, so a `Suspense` is usually placed inside an
/// [`ErrorBoundary`]. Sessions are only re-rendered by events, so the
/// loaded content reaches the client with the next render after the value
/// settles.
pub struct Suspense<C, F> {
    inner: C,
    fallback: F,
}

impl<C, F> Suspense<C, F>
where
    C: Component,
    F: Fn() -> VNode + Send + Sync,
{
    pub fn new(inner: C, fallback: F) -> Self {
        Self { inner, fallback }
    }
}

impl<C, F> Component for Suspense<C, F>
where
    C: Component,
    F: Fn() -> VNode + Send + Sync,
{
    fn render(&self) -> Result<VNode> {
        match self.inner.render() {
            Err(Error::Pending(resource)) => {
                tracing::debug!(resource = %resource, "suspended, rendering fallback");
                Ok((self.fallback)())
            }
            other => other,
        }
    }
}
