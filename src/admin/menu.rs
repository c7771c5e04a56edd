//! Persisting menu edits computed by [`crate::menu_order`].

use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use super::save_record;
use crate::database::Repository;
use crate::error::{AppError, Result};
use crate::menu_order::{changed_items, check_hierarchy, remove, reorder, MenuEdit};
use crate::models::MenuItem;
use crate::validation::Validate;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuSave {
    pub item: MenuItem,
    /// The full item set after the edit.
    pub items: Vec<MenuItem>,
}

/// Insert, move or reparent `item` within `current`.
///
/// Siblings whose position changed are written in parallel first, then the
/// edited item itself. A failed sibling write is reported after every write
/// was attempted; nothing is rolled back.
pub async fn save_menu_item<R>(repo: &R, current: &[MenuItem], item: MenuItem) -> Result<MenuSave>
where
    R: Repository<MenuItem> + ?Sized,
{
    item.validate()?;
    if let Some(id) = item.id {
        if !current.iter().any(|existing| existing.id == Some(id)) {
            return Err(AppError::not_found(format!("menu item {id}")));
        }
    }
    check_hierarchy(current, &item)?;

    let mut items = reorder(current, &MenuEdit::new(item.clone()));
    let is_edited = |candidate: &MenuItem| match item.id {
        Some(id) => candidate.id == Some(id),
        None => candidate.id.is_none(),
    };

    let siblings: Vec<MenuItem> = changed_items(current, &items)
        .into_iter()
        .filter(|candidate| !is_edited(candidate))
        .collect();
    persist_positions(repo, &siblings).await?;

    let index = items
        .iter()
        .position(|candidate| is_edited(candidate))
        .ok_or_else(|| AppError::Internal("edited menu item missing after reorder".to_string()))?;
    let saved = save_record(repo, &items[index]).await?;
    items[index] = saved.clone();

    info!(
        "🧭 Saved menu item '{}' at position {} ({} siblings moved)",
        saved.title,
        saved.position,
        siblings.len()
    );
    Ok(MenuSave { item: saved, items })
}

/// Delete `id` and close the gap it leaves among its siblings.
pub async fn delete_menu_item<R>(repo: &R, current: &[MenuItem], id: i64) -> Result<Vec<MenuItem>>
where
    R: Repository<MenuItem> + ?Sized,
{
    repo.delete(id).await?;

    let items = remove(current, id);
    persist_positions(repo, &changed_items(current, &items)).await?;
    Ok(items)
}

async fn persist_positions<R>(repo: &R, items: &[MenuItem]) -> Result<()>
where
    R: Repository<MenuItem> + ?Sized,
{
    let results = join_all(items.iter().map(|item| repo.update(item))).await;

    let mut first_error = None;
    for (item, result) in items.iter().zip(results) {
        if let Err(e) = result {
            warn!("Could not move menu item {:?}: {}", item.id, e);
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
