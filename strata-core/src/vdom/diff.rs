//! Diff Engine
//!
//! Compares two trees and produces the ordered patch list that turns the old
//! tree into the new one.
//!
//! # Algorithm
//!
//! A single depth-first pass comparing nodes at the same position:
//!
//! 1. Only the new node exists: `AddChild`.
//! 2. Only the old node exists: `RemoveChild`.
//! 3. The nodes differ in tag, kind, text content or key: `ReplaceChild`,
//!    and the subtree is not visited further.
//! 4. Otherwise the props are compared (`AddProp`, `RemoveProp`,
//!    `UpdateProp`), then the children pairwise by index.
//!
//! There is no keyed reordering: keys only decide between patching in place
//! and replacing.
//!
//! # Ordering
//!
//! For each node, prop patches come before child patches and children are
//! visited left to right. Surplus new children are appended in ascending
//! order; surplus old children are removed from the highest index down, so
//! replaying the list in order never shifts an index that a later patch
//! still refers to.

use super::node::VNode;
use super::patch::{NodePath, Patch};

/// Diff two optional roots.
///
/// The roots are treated as child `0` of the mount container, so a missing
/// old root yields an `AddChild` at path `[]`.
pub fn diff(old: Option<&VNode>, new: Option<&VNode>) -> Vec<Patch> {
    let mut patches = Vec::new();
    let mut path = NodePath::new();
    diff_node(old, new, &mut path, 0, &mut patches);
    patches
}

/// Diff two trees.
pub fn diff_trees(old: &VNode, new: &VNode) -> Vec<Patch> {
    diff(Some(old), Some(new))
}

fn diff_node(
    old: Option<&VNode>,
    new: Option<&VNode>,
    parent: &mut NodePath,
    index: usize,
    out: &mut Vec<Patch>,
) {
    match (old, new) {
        (None, None) => {}
        (None, Some(new)) => out.push(Patch::AddChild {
            path: parent.clone(),
            index,
            node: new.clone(),
        }),
        (Some(_), None) => out.push(Patch::RemoveChild {
            path: parent.clone(),
            index,
        }),
        (Some(old), Some(new)) => {
            if !old.same_identity(new) {
                out.push(Patch::ReplaceChild {
                    path: parent.clone(),
                    index,
                    node: new.clone(),
                });
                return;
            }

            parent.push(index);
            diff_props(old, new, parent, out);
            diff_children(old, new, parent, out);
            parent.pop();
        }
    }
}

fn diff_props(old: &VNode, new: &VNode, path: &NodePath, out: &mut Vec<Patch>) {
    let old_props = old.attributes();
    let new_props = new.attributes();

    for (key, value) in new_props {
        match old_props.get(key) {
            None => out.push(Patch::AddProp {
                path: path.clone(),
                key: key.clone(),
                value: value.clone(),
            }),
            Some(previous) if previous != value => out.push(Patch::UpdateProp {
                path: path.clone(),
                key: key.clone(),
                value: value.clone(),
            }),
            Some(_) => {}
        }
    }

    for key in old_props.keys() {
        if !new_props.contains_key(key) {
            out.push(Patch::RemoveProp {
                path: path.clone(),
                key: key.clone(),
            });
        }
    }
}

fn diff_children(old: &VNode, new: &VNode, path: &mut NodePath, out: &mut Vec<Patch>) {
    let old_children = old.child_nodes();
    let new_children = new.child_nodes();
    let common = old_children.len().min(new_children.len());

    for i in 0..common {
        diff_node(Some(&old_children[i]), Some(&new_children[i]), path, i, out);
    }

    for (i, child) in new_children.iter().enumerate().skip(common) {
        diff_node(None, Some(child), path, i, out);
    }

    for i in (common..old_children.len()).rev() {
        diff_node(Some(&old_children[i]), None, path, i, out);
    }
}
