//! Menu hierarchy ordering.
//!
//! Menu items form sibling groups keyed by `parent_id` (root items share the
//! `None` group). Within a group positions are a dense `1..=n` sequence. An
//! edit is applied as: take the item out of its old group and close the gap,
//! then open a slot at the target position of the new group. For a move
//! inside one group this shifts exactly the items between the old and the new
//! position by one, and leaves every other sibling where it was.

use std::collections::HashMap;

use crate::error::{AppError, Result};
use crate::models::{MenuItem, MenuNode};

/// Where an item sat before the edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub parent_id: Option<i64>,
    pub position: i64,
}

/// An insert, move or reparent. `item` carries the new parent and the target
/// position; `previous` may be left out for stored items, in which case it is
/// read from the current item set.
#[derive(Debug, Clone)]
pub struct MenuEdit {
    pub item: MenuItem,
    pub previous: Option<Placement>,
}

impl MenuEdit {
    pub fn new(item: MenuItem) -> Self {
        Self {
            item,
            previous: None,
        }
    }
}

/// Compute the full replacement item set for `edit`.
///
/// The result keeps the input order; the edited item takes its new parent and
/// position in place, and a brand-new item (no id) is appended at the end.
pub fn reorder(items: &[MenuItem], edit: &MenuEdit) -> Vec<MenuItem> {
    let moving = &edit.item;
    let stored_index = moving
        .id
        .and_then(|id| items.iter().position(|item| item.id == Some(id)));

    let old_parent = match (edit.previous, stored_index) {
        (Some(previous), _) => Some(previous.parent_id),
        (None, Some(index)) => Some(items[index].parent_id),
        (None, None) => None,
    };

    let mut result: Vec<MenuItem> = items.to_vec();
    let is_moving = |item: &MenuItem| moving.id.is_some() && item.id == moving.id;

    // Close the gap in the group the item leaves.
    if let Some(old_parent) = old_parent {
        renumber_group(&mut result, old_parent, &is_moving);
    }

    // Dense numbering of the destination group before opening the slot. When
    // the group did not change this is a no-op on the already closed group.
    let new_parent = moving.parent_id;
    if old_parent != Some(new_parent) {
        renumber_group(&mut result, new_parent, &is_moving);
    }

    let group_len = result
        .iter()
        .filter(|item| item.parent_id == new_parent && !is_moving(item))
        .count() as i64;
    let target = moving.position.clamp(1, group_len + 1);

    for item in result.iter_mut() {
        if item.parent_id == new_parent && !is_moving(item) && item.position >= target {
            item.position += 1;
        }
    }

    let mut placed = moving.clone();
    placed.position = target;
    match stored_index {
        Some(index) => result[index] = placed,
        None => result.push(placed),
    }

    result
}

/// Renumber one sibling group `1..=k` by current order, skipping `excluded`.
fn renumber_group(
    items: &mut [MenuItem],
    parent_id: Option<i64>,
    excluded: &dyn Fn(&MenuItem) -> bool,
) {
    let mut members: Vec<usize> = items
        .iter()
        .enumerate()
        .filter(|(_, item)| item.parent_id == parent_id && !excluded(item))
        .map(|(index, _)| index)
        .collect();

    members.sort_by_key(|&index| sort_key(&items[index]));

    for (rank, index) in members.into_iter().enumerate() {
        items[index].position = rank as i64 + 1;
    }
}

// Unsaved items sort after stored ones that share a position.
fn sort_key(item: &MenuItem) -> (i64, i64) {
    (item.position, item.id.unwrap_or(i64::MAX))
}

/// Items of `after` whose parent or position differ from `before`, plus any
/// item that has no id yet. These are the records the caller must persist.
pub fn changed_items(before: &[MenuItem], after: &[MenuItem]) -> Vec<MenuItem> {
    let previous: HashMap<i64, &MenuItem> = before
        .iter()
        .filter_map(|item| item.id.map(|id| (id, item)))
        .collect();

    after
        .iter()
        .filter(|item| match item.id.and_then(|id| previous.get(&id)) {
            Some(old) => old.parent_id != item.parent_id || old.position != item.position,
            None => true,
        })
        .cloned()
        .collect()
}

/// Remove `id` and close the gap it leaves. Children of the removed item are
/// dropped as well, mirroring the cascading delete in the database.
pub fn remove(items: &[MenuItem], id: i64) -> Vec<MenuItem> {
    let Some(removed) = items.iter().find(|item| item.id == Some(id)) else {
        return items.to_vec();
    };
    let parent_id = removed.parent_id;

    let mut result: Vec<MenuItem> = items
        .iter()
        .filter(|item| item.id != Some(id) && item.parent_id != Some(id))
        .cloned()
        .collect();
    renumber_group(&mut result, parent_id, &|_| false);
    result
}

/// Target position that places an item directly after `id` ("after item X").
pub fn position_after(items: &[MenuItem], id: i64) -> Option<i64> {
    items
        .iter()
        .find(|item| item.id == Some(id))
        .map(|item| item.position + 1)
}

/// Reject placements that break the one-level hierarchy.
pub fn check_hierarchy(items: &[MenuItem], item: &MenuItem) -> Result<()> {
    let Some(parent_id) = item.parent_id else {
        return Ok(());
    };

    if item.id == Some(parent_id) {
        return Err(AppError::validation("A menu item cannot be its own parent"));
    }

    let parent = items
        .iter()
        .find(|candidate| candidate.id == Some(parent_id))
        .ok_or_else(|| AppError::validation(format!("Parent menu item {parent_id} does not exist")))?;

    if parent.parent_id.is_some() {
        return Err(AppError::validation(
            "Menu items can only be nested one level deep",
        ));
    }

    if let Some(id) = item.id {
        if items.iter().any(|candidate| candidate.parent_id == Some(id)) {
            return Err(AppError::validation(
                "A menu item with children cannot be placed under another item",
            ));
        }
    }

    Ok(())
}

/// Nested navigation for the public site. Orphans (children whose parent is
/// not in `items`) are left out.
pub fn build_tree(items: &[MenuItem]) -> Vec<MenuNode> {
    let mut sorted: Vec<&MenuItem> = items.iter().collect();
    sorted.sort_by_key(|item| sort_key(item));

    sorted
        .iter()
        .filter(|item| item.parent_id.is_none())
        .filter_map(|root| {
            let id = root.id?;
            let children = sorted
                .iter()
                .filter(|child| child.parent_id == Some(id))
                .filter_map(|child| {
                    Some(MenuNode {
                        id: child.id?,
                        title: child.title.clone(),
                        url: child.url.clone(),
                        children: Vec::new(),
                    })
                })
                .collect();

            Some(MenuNode {
                id,
                title: root.title.clone(),
                url: root.url.clone(),
                children,
            })
        })
        .collect()
}
