use axum::extract::{Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use subtle::ConstantTimeEq;
use tracing::warn;

use super::AppState;
use crate::error::{AppError, Result};
use crate::scheduler::{run_task, Task, TaskReport};

#[derive(Debug, Deserialize)]
pub struct TaskQuery {
    pub task: String,
    #[serde(default)]
    pub force: bool,
}

fn authorized(headers: &HeaderMap, secret: &str) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| bool::from(token.trim().as_bytes().ct_eq(secret.as_bytes())))
        .unwrap_or(false)
}

/// `GET|POST /api/scheduler?task=backup|cleanup[&force=true]`
pub async fn trigger(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<TaskQuery>,
) -> Result<Json<TaskReport>> {
    let Some(secret) = state.config.cron_secret.as_deref() else {
        warn!("Scheduler called but CRON_SECRET is not configured");
        return Err(AppError::Unauthorized);
    };
    if !authorized(&headers, secret) {
        warn!("Scheduler called with a bad token");
        return Err(AppError::Unauthorized);
    }

    let task: Task = query.task.parse()?;
    Ok(Json(
        run_task(state.backups.as_ref(), task, query.force, Utc::now()).await?,
    ))
}
