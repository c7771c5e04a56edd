use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use super::AppState;
use crate::error::{AppError, Result};
use crate::models::Setting;
use crate::settings::{list_masked, mask, save_settings};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/settings", get(list).put(save_batch))
        .route("/api/settings/:key", get(fetch).put(save_one))
}

#[derive(Debug, Deserialize)]
pub struct SettingValue {
    pub value: String,
}

async fn list(State(state): State<AppState>) -> Result<Json<Vec<Setting>>> {
    Ok(Json(list_masked(&state.db).await?))
}

async fn fetch(State(state): State<AppState>, Path(key): Path<String>) -> Result<Json<Setting>> {
    state
        .db
        .get_setting(&key)
        .await?
        .map(|setting| Json(mask(setting)))
        .ok_or_else(|| AppError::not_found(format!("setting '{key}'")))
}

/// Body is a `{ key: value }` object.
async fn save_batch(
    State(state): State<AppState>,
    Json(values): Json<BTreeMap<String, String>>,
) -> Result<Json<Vec<Setting>>> {
    let entries: Vec<(String, String)> = values.into_iter().collect();
    save_settings(&state.db, state.cipher.as_ref(), &entries).await?;
    Ok(Json(list_masked(&state.db).await?))
}

async fn save_one(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(body): Json<SettingValue>,
) -> Result<Json<Setting>> {
    save_settings(&state.db, state.cipher.as_ref(), &[(key.clone(), body.value)]).await?;
    state
        .db
        .get_setting(&key)
        .await?
        .map(|setting| Json(mask(setting)))
        .ok_or_else(|| AppError::not_found(format!("setting '{key}'")))
}
