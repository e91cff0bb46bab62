//! Persistent operations over the ordered field tree.
//!
//! Every operation takes the tree by reference and returns a new tree. Branches that are not on
//! the path to the edited node keep their `Arc` identity, so consumers can skip untouched
//! subtrees with [`Arc::ptr_eq`].

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::drag::geometry::{DropPosition, insertion_index};
use crate::foundation::error::{CardError, CardResult};
use crate::model::field::{Field, FieldId, FieldPatch, FieldType};

/// Ordered list of root fields.
pub type FieldTree = Vec<Arc<Field>>;

/// Where a field sits in the tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldLocation {
    /// Owning group, `None` for root fields.
    pub parent: Option<FieldId>,
    /// Index within the owning list.
    pub index: usize,
}

/// Depth-first search; returns the first match.
pub fn find_field<'a>(tree: &'a [Arc<Field>], id: &FieldId) -> Option<&'a Arc<Field>> {
    for node in tree {
        if &node.id == id {
            return Some(node);
        }
        if let Some(hit) = find_field(node.children(), id) {
            return Some(hit);
        }
    }
    None
}

/// Locate a field's owning list and index.
pub fn find_location(tree: &[Arc<Field>], id: &FieldId) -> Option<FieldLocation> {
    fn walk(list: &[Arc<Field>], parent: Option<&FieldId>, id: &FieldId) -> Option<FieldLocation> {
        for (index, node) in list.iter().enumerate() {
            if &node.id == id {
                return Some(FieldLocation {
                    parent: parent.cloned(),
                    index,
                });
            }
            if let Some(hit) = walk(node.children(), Some(&node.id), id) {
                return Some(hit);
            }
        }
        None
    }
    walk(tree, None, id)
}

/// Owning group of `id`; `None` for root fields and unknown ids.
pub fn find_parent<'a>(tree: &'a [Arc<Field>], id: &FieldId) -> Option<&'a Arc<Field>> {
    let parent = find_location(tree, id)?.parent?;
    find_field(tree, &parent)
}

/// Flatten the tree depth-first (pre-order).
pub fn iter_depth_first(tree: &[Arc<Field>]) -> Vec<&Arc<Field>> {
    fn walk<'a>(list: &'a [Arc<Field>], out: &mut Vec<&'a Arc<Field>>) {
        for node in list {
            out.push(node);
            walk(node.children(), out);
        }
    }
    let mut out = Vec::new();
    walk(tree, &mut out);
    out
}

/// Check every field and id uniqueness across the whole tree.
pub fn validate_tree(tree: &[Arc<Field>]) -> CardResult<()> {
    let mut seen = BTreeSet::new();
    for node in tree {
        node.validate_into(&mut seen)?;
    }
    Ok(())
}

/// Insert `field` relative to `anchor`.
///
/// Without an anchor, `Before` prepends and `After`/`Inside` append at the root. An anchor that
/// no longer exists degrades to appending at the root. `Inside` on a non-group anchor behaves
/// like `After`.
pub fn add_field(
    tree: &[Arc<Field>],
    field: Field,
    anchor: Option<&FieldId>,
    pos: DropPosition,
) -> CardResult<FieldTree> {
    field.validate()?;
    let field = Arc::new(field);
    let existing: BTreeSet<&str> = iter_depth_first(tree)
        .into_iter()
        .map(|f| f.id.as_str())
        .collect();
    if let Some(dup) = iter_depth_first(std::slice::from_ref(&field))
        .into_iter()
        .find(|f| existing.contains(f.id.as_str()))
    {
        return Err(CardError::validation(format!(
            "duplicate field id '{}'",
            dup.id
        )));
    }

    let Some(anchor) = anchor else {
        let mut out = tree.to_vec();
        match pos {
            DropPosition::Before => out.insert(0, field),
            DropPosition::After | DropPosition::Inside => out.push(field),
        }
        return Ok(out);
    };

    match insert_relative(tree, field.clone(), anchor, pos) {
        Some(out) => Ok(out),
        None => {
            tracing::debug!(anchor = %anchor, "add_field anchor not found; appending at root");
            let mut out = tree.to_vec();
            out.push(field);
            Ok(out)
        }
    }
}

/// Apply `patch` to the field with `id`. Unknown ids return an equal tree.
///
/// The patched tree is validated before it is returned; on error the caller keeps the old tree.
pub fn update_field(tree: &[Arc<Field>], id: &FieldId, patch: &FieldPatch) -> CardResult<FieldTree> {
    let Some(out) = rewrite(tree, id, &mut |node| Some(Arc::new(patch.apply(node)))) else {
        return Ok(tree.to_vec());
    };
    validate_tree(&out)?;
    Ok(out)
}

/// Remove the field with `id` and its whole subtree. Unknown ids return an equal tree.
pub fn remove_field(tree: &[Arc<Field>], id: &FieldId) -> FieldTree {
    rewrite(tree, id, &mut |_| None).unwrap_or_else(|| tree.to_vec())
}

/// Move an existing field next to (or into) `target`.
///
/// Within one list the index arithmetic of [`insertion_index`] compensates for the removed
/// source slot. Moves onto itself, into its own subtree, or involving unknown ids return an
/// equal tree.
pub fn move_field(
    tree: &[Arc<Field>],
    source: &FieldId,
    target: &FieldId,
    pos: DropPosition,
) -> FieldTree {
    let unchanged = || tree.to_vec();
    if source == target {
        return unchanged();
    }
    let (Some(src_loc), Some(dst_loc)) = (find_location(tree, source), find_location(tree, target))
    else {
        return unchanged();
    };
    let Some(moving) = find_field(tree, source).cloned() else {
        return unchanged();
    };
    if find_field(moving.children(), target).is_some() {
        tracing::debug!(%source, %target, "refusing to move a group into its own subtree");
        return unchanged();
    }

    let target_accepts = find_field(tree, target).is_some_and(|t| t.accepts_children());
    let pos = effective_position(pos, target_accepts);

    if src_loc.parent == dst_loc.parent && pos != DropPosition::Inside {
        let to = insertion_index(dst_loc.index, pos, Some(src_loc.index));
        return edit_list(tree, src_loc.parent.as_ref(), &mut |list| {
            let item = list.remove(src_loc.index);
            let to = to.min(list.len());
            list.insert(to, item);
        })
        .unwrap_or_else(unchanged);
    }

    let without = remove_field(tree, source);
    insert_relative(&without, moving, target, pos).unwrap_or_else(unchanged)
}

/// Smallest unused `"{type}_{n}"` id, `n >= 1`.
pub fn next_field_id(tree: &[Arc<Field>], ty: FieldType) -> FieldId {
    let taken: BTreeSet<&str> = iter_depth_first(tree)
        .into_iter()
        .map(|f| f.id.as_str())
        .collect();
    let mut n = 1usize;
    loop {
        let candidate = format!("{}_{n}", ty.as_str());
        if !taken.contains(candidate.as_str()) {
            return FieldId(candidate);
        }
        n += 1;
    }
}

fn effective_position(pos: DropPosition, target_accepts_children: bool) -> DropPosition {
    match pos {
        DropPosition::Inside if !target_accepts_children => DropPosition::After,
        other => other,
    }
}

/// Insert `field` relative to `anchor`; `None` when the anchor is missing.
pub(crate) fn insert_relative(
    tree: &[Arc<Field>],
    field: Arc<Field>,
    anchor: &FieldId,
    pos: DropPosition,
) -> Option<FieldTree> {
    let loc = find_location(tree, anchor)?;
    let anchor_accepts = find_field(tree, anchor).is_some_and(|a| a.accepts_children());
    match effective_position(pos, anchor_accepts) {
        DropPosition::Inside => edit_list(tree, Some(anchor), &mut |list| list.push(field.clone())),
        pos => {
            let at = insertion_index(loc.index, pos, None);
            edit_list(tree, loc.parent.as_ref(), &mut |list| {
                let at = at.min(list.len());
                list.insert(at, field.clone());
            })
        }
    }
}

/// Rebuild the path to `parent` (root when `None`) and run `edit` on its child list.
pub(crate) fn edit_list(
    tree: &[Arc<Field>],
    parent: Option<&FieldId>,
    edit: &mut dyn FnMut(&mut FieldTree),
) -> Option<FieldTree> {
    let Some(pid) = parent else {
        let mut out = tree.to_vec();
        edit(&mut out);
        return Some(out);
    };

    for (i, node) in tree.iter().enumerate() {
        if &node.id == pid {
            if !node.accepts_children() {
                return None;
            }
            let mut children = node.children().to_vec();
            edit(&mut children);
            let mut out = tree.to_vec();
            out[i] = Arc::new(node.with_children(children));
            return Some(out);
        }
        if let Some(children) = edit_list(node.children(), parent, edit) {
            let mut out = tree.to_vec();
            out[i] = Arc::new(node.with_children(children));
            return Some(out);
        }
    }
    None
}

/// Replace (or drop, when `f` returns `None`) the node with `id`.
fn rewrite(
    tree: &[Arc<Field>],
    id: &FieldId,
    f: &mut dyn FnMut(&Field) -> Option<Arc<Field>>,
) -> Option<FieldTree> {
    for (i, node) in tree.iter().enumerate() {
        if &node.id == id {
            let mut out = tree.to_vec();
            match f(node) {
                Some(next) => out[i] = next,
                None => {
                    out.remove(i);
                }
            }
            return Some(out);
        }
        if let Some(children) = rewrite(node.children(), id, f) {
            let mut out = tree.to_vec();
            out[i] = Arc::new(node.with_children(children));
            return Some(out);
        }
    }
    None
}

#[cfg(test)]
#[path = "../../tests/unit/model/tree.rs"]
mod tests;
