//! Virtual DOM
//!
//! This module implements the tree representation components render into,
//! its HTML serialization, and the diff engine that turns two consecutive
//! trees into a patch script for the client.
//!
//! # Concepts
//!
//! ## Nodes
//!
//! A [`VNode`] is an element (tag, attributes, children) or a text node.
//! Trees are rebuilt from scratch on every render and are never mutated
//! afterwards; the runtime keeps the previous tree only until the next diff.
//!
//! ## Patches
//!
//! A [`Patch`] is one mutation of the client-held tree. [`diff`] emits them
//! in an order that, replayed front to back, turns the old tree into the new
//! one. [`apply_patches`] performs that replay.

mod node;
mod html;
mod patch;
mod diff;
mod apply;

pub use node::{PropValue, Props, VNode, EVENT_ATTR_PREFIX, TEXT_TAG};
pub use html::escape_html;
pub use patch::{NodePath, Patch};
pub use diff::{diff, diff_trees};
pub use apply::apply_patches;
