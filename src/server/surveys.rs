use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};

use super::{crud, AppState};
use crate::admin::{save_record, save_survey_tree, SurveyTreeSave};
use crate::database::Repository;
use crate::error::{AppError, Result};
use crate::export::{survey_csv, survey_csv_filename};
use crate::models::{Question, QuestionOption, Survey, SurveyTree};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/surveys",
            get(crud::list::<Survey>).post(crud::create::<Survey>),
        )
        .route("/api/surveys/tree", post(save_tree))
        .route(
            "/api/surveys/:id",
            get(fetch_tree)
                .put(crud::update::<Survey>)
                .delete(crud::remove::<Survey>),
        )
        .route("/api/surveys/:id/questions", post(create_question))
        .route("/api/surveys/:id/export", get(export_responses))
        .route(
            "/api/questions/:id",
            put(update_question).delete(crud::remove::<Question>),
        )
        .route("/api/questions/:id/options", post(create_option))
        .route(
            "/api/options/:id",
            put(update_option).delete(crud::remove::<QuestionOption>),
        )
}

async fn load_tree(state: &AppState, id: i64) -> Result<SurveyTree> {
    state
        .db
        .survey_tree(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("survey {id}")))
}

async fn fetch_tree(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<SurveyTree>> {
    Ok(Json(load_tree(&state, id).await?))
}

async fn save_tree(
    State(state): State<AppState>,
    Json(tree): Json<SurveyTree>,
) -> Result<Json<SurveyTreeSave>> {
    Ok(Json(save_survey_tree(&state.db, &tree).await?))
}

async fn create_question(
    State(state): State<AppState>,
    Path(survey_id): Path<i64>,
    Json(mut question): Json<Question>,
) -> Result<(StatusCode, Json<Question>)> {
    Repository::<Survey>::get(&state.db, survey_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("survey {survey_id}")))?;

    question.id = None;
    question.survey_id = survey_id;
    Ok((StatusCode::CREATED, Json(save_record(&state.db, &question).await?)))
}

async fn update_question(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(mut question): Json<Question>,
) -> Result<Json<Question>> {
    let stored = Repository::<Question>::get(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("question {id}")))?;

    question.id = Some(id);
    question.survey_id = stored.survey_id;
    Ok(Json(save_record(&state.db, &question).await?))
}

async fn create_option(
    State(state): State<AppState>,
    Path(question_id): Path<i64>,
    Json(mut option): Json<QuestionOption>,
) -> Result<(StatusCode, Json<QuestionOption>)> {
    let question = Repository::<Question>::get(&state.db, question_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("question {question_id}")))?;
    if !question.question_type.has_options() {
        return Err(AppError::validation(format!(
            "Question \"{}\" does not take options",
            question.text
        )));
    }

    option.id = None;
    option.question_id = question_id;
    Ok((StatusCode::CREATED, Json(save_record(&state.db, &option).await?)))
}

async fn update_option(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(mut option): Json<QuestionOption>,
) -> Result<Json<QuestionOption>> {
    let stored = Repository::<QuestionOption>::get(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("question option {id}")))?;

    option.id = Some(id);
    option.question_id = stored.question_id;
    Ok(Json(save_record(&state.db, &option).await?))
}

async fn export_responses(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response> {
    let tree = load_tree(&state, id).await?;
    let answers = state.db.survey_answers(id).await?;
    let body = survey_csv(&tree, &answers)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", survey_csv_filename(id)),
            ),
        ],
        body,
    )
        .into_response())
}
