use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use super::AppState;
use crate::admin::{AdminState, Collections};
use crate::error::Result;

/// Every collection the dashboard needs, loaded in one go.
pub async fn bootstrap(State(state): State<AppState>) -> Result<Json<Collections>> {
    let mut admin = AdminState::new(Arc::new(state.db.clone()));
    admin.load_all().await?;
    Ok(Json(admin.into_snapshot()))
}
