use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};

use super::{crud, AppState};
use crate::admin::{cascade_save, save_record, CascadeOutcome};
use crate::database::Repository;
use crate::error::{AppError, Result};
use crate::models::{
    ContactDetail, ContactGroup, ContactGroupDraft, ContactGroupWithDetails, PositionUpdate,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/contacts/groups",
            get(list_groups).post(crud::create::<ContactGroup>),
        )
        .route("/api/contacts/groups/save", post(save_group))
        .route("/api/contacts/groups/reorder", post(reorder_groups))
        .route(
            "/api/contacts/groups/:id",
            put(crud::update::<ContactGroup>).delete(crud::remove::<ContactGroup>),
        )
        .route("/api/contacts/groups/:id/details", post(create_detail))
        .route(
            "/api/contacts/details/:id",
            put(update_detail).delete(crud::remove::<ContactDetail>),
        )
}

async fn list_groups(State(state): State<AppState>) -> Result<Json<Vec<ContactGroupWithDetails>>> {
    Ok(Json(state.db.contact_groups_with_details().await?))
}

/// Cascade save of a group and its details. A failed group save returns the
/// error; the client refetches the list.
async fn save_group(
    State(state): State<AppState>,
    Json(draft): Json<ContactGroupDraft>,
) -> Result<Json<CascadeOutcome>> {
    Ok(Json(cascade_save(&state.db, &draft).await?))
}

async fn reorder_groups(
    State(state): State<AppState>,
    Json(updates): Json<Vec<PositionUpdate>>,
) -> Result<Json<Vec<ContactGroupWithDetails>>> {
    state.db.reorder_contact_groups(&updates).await?;
    Ok(Json(state.db.contact_groups_with_details().await?))
}

async fn create_detail(
    State(state): State<AppState>,
    Path(group_id): Path<i64>,
    Json(mut detail): Json<ContactDetail>,
) -> Result<(StatusCode, Json<ContactDetail>)> {
    Repository::<ContactGroup>::get(&state.db, group_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("contact group {group_id}")))?;

    detail.id = None;
    detail.group_id = group_id;
    Ok((StatusCode::CREATED, Json(save_record(&state.db, &detail).await?)))
}

/// Keeps the stored group unless the body names one.
async fn update_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(mut detail): Json<ContactDetail>,
) -> Result<Json<ContactDetail>> {
    let stored = Repository::<ContactDetail>::get(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("contact detail {id}")))?;

    detail.id = Some(id);
    if detail.group_id == 0 {
        detail.group_id = stored.group_id;
    }
    Ok(Json(save_record(&state.db, &detail).await?))
}
