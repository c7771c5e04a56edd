//! Read API for the public site. Menu and contact info are served from
//! five-minute caches.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::{AppError, Result};
use crate::menu_order::build_tree;
use crate::models::{
    ContactGroupWithDetails, Doctor, MenuNode, NewsItem, Page, ResponseSubmission, Service,
    SurveyTree,
};
use crate::settings::{SeoSettings, SettingsMap};

const DEFAULT_NEWS_LIMIT: i64 = 20;
const MAX_NEWS_LIMIT: i64 = 100;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/pages/:slug", get(page))
        .route("/news", get(news))
        .route("/services", get(services))
        .route("/doctors", get(doctors))
        .route("/menu", get(menu))
        .route("/contacts", get(contacts))
        .route("/seo", get(seo))
        .route("/surveys/:id", get(survey))
        .route("/surveys/:id/responses", post(submit_response))
}

#[derive(Debug, Deserialize)]
pub struct NewsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SubmittedResponse {
    pub response_id: String,
}

async fn page(State(state): State<AppState>, Path(slug): Path<String>) -> Result<Json<Page>> {
    state
        .db
        .published_page(&slug)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("page '{slug}'")))
}

async fn news(
    State(state): State<AppState>,
    Query(query): Query<NewsQuery>,
) -> Result<Json<Vec<NewsItem>>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_NEWS_LIMIT)
        .clamp(1, MAX_NEWS_LIMIT);
    Ok(Json(state.db.published_news(limit).await?))
}

async fn services(State(state): State<AppState>) -> Result<Json<Vec<Service>>> {
    Ok(Json(state.db.published_services().await?))
}

async fn doctors(State(state): State<AppState>) -> Result<Json<Vec<Doctor>>> {
    Ok(Json(state.db.published_doctors().await?))
}

async fn menu(State(state): State<AppState>) -> Result<Json<Vec<MenuNode>>> {
    let db = state.db.clone();
    let tree = state
        .menu_cache
        .get_or_load(|| async move { Ok(build_tree(&db.active_menu_items().await?)) })
        .await?;
    Ok(Json(tree))
}

async fn contacts(State(state): State<AppState>) -> Result<Json<Vec<ContactGroupWithDetails>>> {
    let db = state.db.clone();
    let groups = state
        .contact_cache
        .get_or_load(|| async move { db.active_contact_info().await })
        .await?;
    Ok(Json(groups))
}

async fn seo(State(state): State<AppState>) -> Result<Json<SeoSettings>> {
    let settings = SettingsMap::load(&state.db).await?;
    Ok(Json(SeoSettings::from_map(&settings)))
}

async fn survey(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<SurveyTree>> {
    state
        .db
        .survey_tree(id)
        .await?
        .filter(|tree| tree.survey.is_active)
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("survey {id}")))
}

async fn submit_response(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(submission): Json<ResponseSubmission>,
) -> Result<(StatusCode, Json<SubmittedResponse>)> {
    let response_id = state.db.submit_response(id, &submission).await?;
    Ok((StatusCode::CREATED, Json(SubmittedResponse { response_id })))
}
