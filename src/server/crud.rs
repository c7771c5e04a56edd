//! Generic list/get/create/update/delete handlers shared by the flat
//! content types.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use super::AppState;
use crate::admin::save_record;
use crate::database::{Database, Repository};
use crate::error::{AppError, Result};
use crate::models::{Ack, Entity};
use crate::validation::Validate;

/// Bounds every routed entity satisfies.
pub trait Resource: Entity + Validate + Serialize + DeserializeOwned {}

impl<E: Entity + Validate + Serialize + DeserializeOwned> Resource for E {}

pub fn routes<E>() -> Router<AppState>
where
    E: Resource,
    Database: Repository<E>,
{
    Router::new()
        .route("/", get(list::<E>).post(create::<E>))
        .route("/:id", get(fetch::<E>).put(update::<E>).delete(remove::<E>))
}

pub async fn list<E>(State(state): State<AppState>) -> Result<Json<Vec<E>>>
where
    E: Resource,
    Database: Repository<E>,
{
    Ok(Json(Repository::<E>::list(&state.db).await?))
}

pub async fn fetch<E>(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<E>>
where
    E: Resource,
    Database: Repository<E>,
{
    Repository::<E>::get(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("{} {id}", E::NAME)))
}

pub async fn create<E>(
    State(state): State<AppState>,
    Json(mut record): Json<E>,
) -> Result<(StatusCode, Json<E>)>
where
    E: Resource,
    Database: Repository<E>,
{
    record.set_id(None);
    let saved = save_record(&state.db, &record).await?;
    info!("Created {} {:?}", E::NAME, saved.id());
    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn update<E>(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(mut record): Json<E>,
) -> Result<Json<E>>
where
    E: Resource,
    Database: Repository<E>,
{
    record.set_id(Some(id));
    Ok(Json(save_record(&state.db, &record).await?))
}

pub async fn remove<E>(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Ack>>
where
    E: Resource,
    Database: Repository<E>,
{
    Repository::<E>::delete(&state.db, id).await?;
    info!("Deleted {} {}", E::NAME, id);
    Ok(Json(Ack::ok()))
}
