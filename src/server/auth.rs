use axum::extract::{Request, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::AppState;
use crate::auth::{authenticate, SESSION_COOKIE};
use crate::error::{AppError, Result};
use crate::models::{Ack, UserView};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    pub user: Option<UserView>,
}

/// Token from the session cookie, if present.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token.to_string())
        .filter(|token| !token.is_empty())
}

fn session_cookie(token: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={token}; HttpOnly; Path=/; SameSite=Lax"
    ))
    .map_err(|e| AppError::Internal(e.to_string()))
}

fn expired_cookie() -> HeaderValue {
    HeaderValue::from_static("clinic_session=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0")
}

/// Reject requests without a live session; the resolved user is placed in
/// the request extensions.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let token = session_token(request.headers()).ok_or(AppError::Unauthorized)?;
    let user = state
        .sessions
        .touch(&token)
        .await
        .ok_or(AppError::Unauthorized)?;

    debug!("{} {} by {}", request.method(), request.uri().path(), user.username);
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

pub async fn status(State(state): State<AppState>, headers: HeaderMap) -> Json<AuthStatus> {
    let user = match session_token(&headers) {
        Some(token) => state.sessions.touch(&token).await,
        None => None,
    };

    Json(AuthStatus {
        authenticated: user.is_some(),
        user,
    })
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Response> {
    let user = authenticate(&state.db, &body.username, &body.password).await?;

    let purged = state.sessions.purge_expired(Utc::now()).await;
    if purged > 0 {
        debug!("Dropped {} idle sessions", purged);
    }

    let token = state.sessions.create(user.clone()).await;
    info!("🔑 {} logged in", user.username);

    let mut response = Json(AuthStatus {
        authenticated: true,
        user: Some(user),
    })
    .into_response();
    response
        .headers_mut()
        .insert(SET_COOKIE, session_cookie(&token)?);
    Ok(response)
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers) {
        state.sessions.remove(&token).await;
    }

    let mut response = Json(Ack::ok()).into_response();
    response.headers_mut().insert(SET_COOKIE, expired_cookie());
    response
}
