use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tracing::info;

use super::AppState;
use crate::admin::save_record;
use crate::auth::user_from_input;
use crate::database::Repository;
use crate::error::{AppError, Result};
use crate::models::{Ack, Role, User, UserInput, UserView};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(fetch).put(update).delete(remove))
}

fn require_admin(user: &UserView) -> Result<()> {
    if user.role != Role::Admin {
        return Err(AppError::Forbidden(
            "Only administrators can manage users".to_string(),
        ));
    }
    Ok(())
}

async fn list(State(state): State<AppState>) -> Result<Json<Vec<User>>> {
    Ok(Json(Repository::<User>::list(&state.db).await?))
}

async fn fetch(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<User>> {
    Repository::<User>::get(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("user {id}")))
}

async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<UserView>,
    Json(input): Json<UserInput>,
) -> Result<(StatusCode, Json<User>)> {
    require_admin(&current)?;
    let saved = save_record(&state.db, &user_from_input(None, &input)?).await?;
    info!("👤 {} created user {}", current.username, saved.username);
    Ok((StatusCode::CREATED, Json(saved)))
}

async fn update(
    State(state): State<AppState>,
    Extension(current): Extension<UserView>,
    Path(id): Path<i64>,
    Json(input): Json<UserInput>,
) -> Result<Json<User>> {
    if current.id != id {
        require_admin(&current)?;
    } else if input.role != current.role || !input.active {
        // editors may change their own password but not their own access
        require_admin(&current)?;
    }
    Ok(Json(save_record(&state.db, &user_from_input(Some(id), &input)?).await?))
}

async fn remove(
    State(state): State<AppState>,
    Extension(current): Extension<UserView>,
    Path(id): Path<i64>,
) -> Result<Json<Ack>> {
    require_admin(&current)?;
    if current.id == id {
        return Err(AppError::validation("You cannot delete your own account"));
    }
    Repository::<User>::delete(&state.db, id).await?;
    Ok(Json(Ack::ok()))
}
