//! Strata Core
//!
//! This crate provides the core runtime for the Strata server-rendered UI
//! engine. Components run on the server; the browser only receives HTML and
//! patch scripts. It implements:
//!
//! - Virtual DOM nodes, HTML rendering and the diff engine
//! - Per-session hook storage (`use_state`, `use_reducer`, effects, context)
//! - Event handler registry and the render/diff runtime
//! - WebSocket transport layer
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `vdom`: Node model, HTML serialization, patches and diffing
//! - `hooks`: Session-scoped hook slots and the hook functions
//! - `runtime`: Handler registry, render cycle and session lifecycle
//! - `transport`: WebSocket server and protocol implementation
//! - `config`: Runtime settings
//!
//! # Example
//!
//! ```rust,ignore
//! use strata_core::hooks::{use_handler, use_state};
//! use strata_core::runtime::SessionManager;
//! use strata_core::vdom::VNode;
//! use strata_core::Config;
//!
//! let manager = SessionManager::new(Config::default());
//! manager.set_root(|| -> strata_core::Result<VNode> {
//!     let (count, set_count) = use_state("counter", "count", 0)?;
//!     let increment = use_handler(move |_| {
//!         let _ = set_count.set(count + 1);
//!     })?;
//!     Ok(VNode::element("button")
//!         .on("click", &increment)
//!         .child(VNode::text(format!("Clicked {} times", count))))
//! });
//!
//! let session = manager.connect();
//! let html = manager.render(&session)?;
//! // <button data-on-click="...">Clicked 0 times</button>
//! ```

pub mod config;
pub mod error;
pub mod hooks;
pub mod runtime;
pub mod transport;
pub mod vdom;

pub use config::Config;
pub use error::{Error, Result};
