//! Patch Operations
//!
//! A patch is one mutation instruction sent to the client. Patches address
//! nodes by path: the child indices leading from the mount container to the
//! node. The root node is child `0` of the mount container, so its path is
//! `[0]`, and child patches for the root carry `path: [0]`.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::node::{PropValue, VNode};

/// Child indices from the mount container. Most trees are shallow.
pub type NodePath = SmallVec<[usize; 8]>;

/// A single mutation of a client-held tree.
///
/// Serialized as `{"op": "<snake_case variant>", ...fields}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Patch {
    /// Set an attribute that did not exist on the node at `path`.
    AddProp {
        path: NodePath,
        key: String,
        value: PropValue,
    },

    /// Remove an attribute from the node at `path`.
    RemoveProp { path: NodePath, key: String },

    /// Change an attribute's value on the node at `path`.
    UpdateProp {
        path: NodePath,
        key: String,
        value: PropValue,
    },

    /// Insert `node` as child `index` of the node at `path`.
    AddChild {
        path: NodePath,
        index: usize,
        node: VNode,
    },

    /// Remove child `index` of the node at `path`.
    RemoveChild { path: NodePath, index: usize },

    /// Replace child `index` of the node at `path` with `node`.
    ReplaceChild {
        path: NodePath,
        index: usize,
        node: VNode,
    },
}

impl Patch {
    /// Wire name of the operation.
    pub fn op(&self) -> &'static str {
        match self {
            Patch::AddProp { .. } => "add_prop",
            Patch::RemoveProp { .. } => "remove_prop",
            Patch::UpdateProp { .. } => "update_prop",
            Patch::AddChild { .. } => "add_child",
            Patch::RemoveChild { .. } => "remove_child",
            Patch::ReplaceChild { .. } => "replace_child",
        }
    }

    pub fn path(&self) -> &[usize] {
        match self {
            Patch::AddProp { path, .. }
            | Patch::RemoveProp { path, .. }
            | Patch::UpdateProp { path, .. }
            | Patch::AddChild { path, .. }
            | Patch::RemoveChild { path, .. }
            | Patch::ReplaceChild { path, .. } => path.as_slice(),
        }
    }

    /// Whether the patch changes tree shape rather than attributes.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Patch::AddChild { .. } | Patch::RemoveChild { .. } | Patch::ReplaceChild { .. }
        )
    }
}
