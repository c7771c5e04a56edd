use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;

use super::AppState;
use crate::admin::{delete_menu_item, save_menu_item, MenuSave};
use crate::database::Repository;
use crate::error::{AppError, Result};
use crate::menu_order::position_after;
use crate::models::{Ack, MenuItem};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", put(update).delete(remove))
}

/// `?after=<id>` places the item right behind that sibling instead of using
/// the position in the body.
#[derive(Debug, Default, Deserialize)]
pub struct Placement {
    pub after: Option<i64>,
}

fn place(current: &[MenuItem], item: &mut MenuItem, placement: &Placement) -> Result<()> {
    let Some(after) = placement.after else {
        return Ok(());
    };
    let anchor = current
        .iter()
        .find(|candidate| candidate.id == Some(after))
        .ok_or_else(|| AppError::validation(format!("Menu item {after} does not exist")))?;
    if anchor.parent_id != item.parent_id {
        return Err(AppError::validation(format!(
            "Menu item {after} is not a sibling of the edited item"
        )));
    }

    item.position = position_after(current, after)
        .ok_or_else(|| AppError::validation(format!("Menu item {after} does not exist")))?;
    Ok(())
}

async fn list(State(state): State<AppState>) -> Result<Json<Vec<MenuItem>>> {
    Ok(Json(Repository::<MenuItem>::list(&state.db).await?))
}

async fn create(
    State(state): State<AppState>,
    Query(placement): Query<Placement>,
    Json(mut item): Json<MenuItem>,
) -> Result<(StatusCode, Json<MenuSave>)> {
    item.id = None;
    let current = Repository::<MenuItem>::list(&state.db).await?;
    place(&current, &mut item, &placement)?;
    let outcome = save_menu_item(&state.db, &current, item).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(placement): Query<Placement>,
    Json(mut item): Json<MenuItem>,
) -> Result<Json<MenuSave>> {
    item.id = Some(id);
    let current = Repository::<MenuItem>::list(&state.db).await?;
    place(&current, &mut item, &placement)?;
    Ok(Json(save_menu_item(&state.db, &current, item).await?))
}

async fn remove(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Ack>> {
    let current = Repository::<MenuItem>::list(&state.db).await?;
    delete_menu_item(&state.db, &current, id).await?;
    Ok(Json(Ack::ok()))
}
