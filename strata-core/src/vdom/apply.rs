//! Patch Application
//!
//! Replays a patch list against a tree the way a thin client replays it
//! against its DOM. The server never needs this to render; it exists so a
//! patch list can be checked against the tree it was computed for, and so
//! Rust-side clients (tests, headless tools) can mirror server state.

use super::node::VNode;
use super::patch::Patch;
use crate::error::{Error, Result};

/// Apply `patches` in order to `root` and return the resulting root.
///
/// `root` is child `0` of the mount container. A list that removes the root
/// yields `None`.
pub fn apply_patches(root: Option<&VNode>, patches: &[Patch]) -> Result<Option<VNode>> {
    let mut mount: Vec<VNode> = root.cloned().into_iter().collect();

    for patch in patches {
        apply_one(&mut mount, patch)?;
    }

    if mount.len() > 1 {
        return Err(Error::Patch(format!(
            "mount container holds {} roots after patching",
            mount.len()
        )));
    }
    Ok(mount.pop())
}

fn apply_one(mount: &mut Vec<VNode>, patch: &Patch) -> Result<()> {
    match patch {
        Patch::AddProp { path, key, value } | Patch::UpdateProp { path, key, value } => {
            let node = element_at(mount, path)?;
            node.props_mut().insert(key.clone(), value.clone());
        }
        Patch::RemoveProp { path, key } => {
            let node = element_at(mount, path)?;
            node.props_mut().shift_remove(key);
        }
        Patch::AddChild { path, index, node } => {
            let children = children_at(mount, path)?;
            if *index > children.len() {
                return Err(out_of_range(path, *index, children.len()));
            }
            children.insert(*index, node.clone());
        }
        Patch::RemoveChild { path, index } => {
            let children = children_at(mount, path)?;
            if *index >= children.len() {
                return Err(out_of_range(path, *index, children.len()));
            }
            children.remove(*index);
        }
        Patch::ReplaceChild { path, index, node } => {
            let children = children_at(mount, path)?;
            let len = children.len();
            let slot = children
                .get_mut(*index)
                .ok_or_else(|| out_of_range(path, *index, len))?;
            *slot = node.clone();
        }
    }
    Ok(())
}

fn out_of_range(path: &[usize], index: usize, len: usize) -> Error {
    Error::Patch(format!(
        "child index {} out of range at {:?} ({} children)",
        index, path, len
    ))
}

fn node_at<'a>(mount: &'a mut [VNode], path: &[usize]) -> Result<&'a mut VNode> {
    let (first, rest) = path
        .split_first()
        .ok_or_else(|| Error::Patch("empty path does not address a node".to_string()))?;

    let mut node = mount
        .get_mut(*first)
        .ok_or_else(|| Error::Patch(format!("no root at index {}", first)))?;

    for (depth, &i) in rest.iter().enumerate() {
        node = node.children_mut().get_mut(i).ok_or_else(|| {
            Error::Patch(format!("no node at {:?}", &path[..depth + 2]))
        })?;
    }
    Ok(node)
}

fn element_at<'a>(mount: &'a mut [VNode], path: &[usize]) -> Result<&'a mut VNode> {
    let node = node_at(mount, path)?;
    if node.is_text() {
        return Err(Error::Patch(format!("node at {:?} is a text node", path)));
    }
    Ok(node)
}

fn children_at<'a>(mount: &'a mut Vec<VNode>, path: &[usize]) -> Result<&'a mut Vec<VNode>> {
    if path.is_empty() {
        return Ok(mount);
    }
    Ok(element_at(mount, path)?.children_mut())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vdom::{diff, diff_trees};
    use smallvec::smallvec;

    fn replay(old: &VNode, new: &VNode) {
        let patches = diff_trees(old, new);
        let result = apply_patches(Some(old), &patches).unwrap();
        assert_eq!(result.as_ref(), Some(new), "patches: {:?}", patches);
    }

    #[test]
    fn replays_prop_changes() {
        replay(
            &VNode::element("a").prop("href", "/").prop("x", true),
            &VNode::element("a").prop("href", "/home").prop("y", 2),
        );
    }

    #[test]
    fn replays_growing_and_shrinking_children() {
        let small = VNode::element("ul").child(VNode::element("li").child(VNode::text("a")));
        let big = VNode::element("ul")
            .child(VNode::element("li").child(VNode::text("a")))
            .child(VNode::element("li").child(VNode::text("b")))
            .child(VNode::element("li").child(VNode::text("c")));
        replay(&small, &big);
        replay(&big, &small);
    }

    #[test]
    fn replays_root_replacement() {
        replay(&VNode::element("div"), &VNode::element("main").child(VNode::text("x")));
    }

    #[test]
    fn builds_root_from_nothing() {
        let new = VNode::element("div").child(VNode::text("hi"));
        let patches = diff(None, Some(&new));
        assert_eq!(apply_patches(None, &patches).unwrap(), Some(new));
    }

    #[test]
    fn rejects_patch_with_bad_path() {
        let root = VNode::element("div");
        let err = apply_patches(
            Some(&root),
            &[Patch::RemoveChild { path: smallvec![0], index: 4 }],
        )
        .unwrap_err();
        assert!(matches!(err, Error::Patch(_)));

        let err = apply_patches(
            Some(&root),
            &[Patch::RemoveProp { path: smallvec![0, 1], key: "a".into() }],
        )
        .unwrap_err();
        assert!(matches!(err, Error::Patch(_)));
    }

    #[test]
    fn rejects_props_on_text_nodes() {
        let root = VNode::element("p").child(VNode::text("t"));
        let err = apply_patches(
            Some(&root),
            &[Patch::AddProp { path: smallvec![0, 0], key: "a".into(), value: 1.into() }],
        )
        .unwrap_err();
        assert!(matches!(err, Error::Patch(_)));
    }
}
