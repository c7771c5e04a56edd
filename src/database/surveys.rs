use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::{delete_by_id, fetch_by_id, require_id, updated, Database, Repository};
use crate::error::{AppError, Result};
use crate::models::{
    Question, QuestionOption, QuestionTree, QuestionType, ResponseSubmission, Survey, SurveyAnswer,
    SurveyTree,
};

#[async_trait]
impl Repository<Survey> for Database {
    async fn list(&self) -> Result<Vec<Survey>> {
        Ok(
            sqlx::query_as::<_, Survey>("SELECT * FROM surveys ORDER BY created_at DESC, id DESC")
                .fetch_all(self.pool())
                .await?,
        )
    }

    async fn get(&self, id: i64) -> Result<Option<Survey>> {
        fetch_by_id(self.pool(), "surveys", id).await
    }

    async fn insert(&self, survey: &Survey) -> Result<Survey> {
        Ok(sqlx::query_as::<_, Survey>(
            r#"
            INSERT INTO surveys (title, description, is_active, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&survey.title)
        .bind(&survey.description)
        .bind(survey.is_active)
        .bind(survey.created_at.unwrap_or_else(Utc::now))
        .fetch_one(self.pool())
        .await?)
    }

    async fn update(&self, survey: &Survey) -> Result<Survey> {
        let id = require_id(survey)?;
        let row = sqlx::query_as::<_, Survey>(
            "UPDATE surveys SET title = ?, description = ?, is_active = ? WHERE id = ? RETURNING *",
        )
        .bind(&survey.title)
        .bind(&survey.description)
        .bind(survey.is_active)
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        updated(row, id)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        delete_by_id(self.pool(), "surveys", id, "survey").await
    }
}

#[async_trait]
impl Repository<Question> for Database {
    async fn list(&self) -> Result<Vec<Question>> {
        Ok(
            sqlx::query_as::<_, Question>("SELECT * FROM questions ORDER BY survey_id, position, id")
                .fetch_all(self.pool())
                .await?,
        )
    }

    async fn get(&self, id: i64) -> Result<Option<Question>> {
        fetch_by_id(self.pool(), "questions", id).await
    }

    async fn insert(&self, question: &Question) -> Result<Question> {
        Ok(sqlx::query_as::<_, Question>(
            r#"
            INSERT INTO questions (survey_id, text, question_type, required, position)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(question.survey_id)
        .bind(&question.text)
        .bind(question.question_type)
        .bind(question.required)
        .bind(question.position)
        .fetch_one(self.pool())
        .await?)
    }

    async fn update(&self, question: &Question) -> Result<Question> {
        let id = require_id(question)?;
        let row = sqlx::query_as::<_, Question>(
            r#"
            UPDATE questions
            SET survey_id = ?, text = ?, question_type = ?, required = ?, position = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(question.survey_id)
        .bind(&question.text)
        .bind(question.question_type)
        .bind(question.required)
        .bind(question.position)
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        updated(row, id)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        delete_by_id(self.pool(), "questions", id, "question").await
    }
}

#[async_trait]
impl Repository<QuestionOption> for Database {
    async fn list(&self) -> Result<Vec<QuestionOption>> {
        Ok(sqlx::query_as::<_, QuestionOption>(
            "SELECT * FROM question_options ORDER BY question_id, position, id",
        )
        .fetch_all(self.pool())
        .await?)
    }

    async fn get(&self, id: i64) -> Result<Option<QuestionOption>> {
        fetch_by_id(self.pool(), "question_options", id).await
    }

    async fn insert(&self, option: &QuestionOption) -> Result<QuestionOption> {
        Ok(sqlx::query_as::<_, QuestionOption>(
            "INSERT INTO question_options (question_id, text, position) VALUES (?, ?, ?) RETURNING *",
        )
        .bind(option.question_id)
        .bind(&option.text)
        .bind(option.position)
        .fetch_one(self.pool())
        .await?)
    }

    async fn update(&self, option: &QuestionOption) -> Result<QuestionOption> {
        let id = require_id(option)?;
        let row = sqlx::query_as::<_, QuestionOption>(
            "UPDATE question_options SET question_id = ?, text = ?, position = ? WHERE id = ? RETURNING *",
        )
        .bind(option.question_id)
        .bind(&option.text)
        .bind(option.position)
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        updated(row, id)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        delete_by_id(self.pool(), "question_options", id, "question option").await
    }
}

impl Database {
    /// Survey with questions and options, or `None` when the survey is missing.
    pub async fn survey_tree(&self, survey_id: i64) -> Result<Option<SurveyTree>> {
        let Some(survey) = Repository::<Survey>::get(self, survey_id).await? else {
            return Ok(None);
        };

        let questions = sqlx::query_as::<_, Question>(
            "SELECT * FROM questions WHERE survey_id = ? ORDER BY position, id",
        )
        .bind(survey_id)
        .fetch_all(self.pool())
        .await?;

        let options = sqlx::query_as::<_, QuestionOption>(
            r#"
            SELECT o.* FROM question_options o
            JOIN questions q ON q.id = o.question_id
            WHERE q.survey_id = ?
            ORDER BY o.position, o.id
            "#,
        )
        .bind(survey_id)
        .fetch_all(self.pool())
        .await?;

        let mut by_question: HashMap<i64, Vec<QuestionOption>> = HashMap::new();
        for option in options {
            by_question.entry(option.question_id).or_default().push(option);
        }

        let questions = questions
            .into_iter()
            .map(|question| {
                let options = question
                    .id
                    .and_then(|id| by_question.remove(&id))
                    .unwrap_or_default();
                QuestionTree { question, options }
            })
            .collect();

        Ok(Some(SurveyTree { survey, questions }))
    }

    /// Store one public submission. Answers are checked against the survey's
    /// questions and options; all rows share a fresh response id.
    pub async fn submit_response(
        &self,
        survey_id: i64,
        submission: &ResponseSubmission,
    ) -> Result<String> {
        let tree = self
            .survey_tree(survey_id)
            .await?
            .filter(|tree| tree.survey.is_active)
            .ok_or_else(|| AppError::not_found(format!("survey {survey_id}")))?;

        let rows = answer_rows(&tree, submission)?;
        let response_id = Uuid::new_v4().to_string();
        let submitted_at = Utc::now();

        let mut tx = self.pool().begin().await?;
        for (question_id, option_id, text) in &rows {
            sqlx::query(
                r#"
                INSERT INTO survey_answers (survey_id, question_id, response_id, option_id, answer_text, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(survey_id)
            .bind(question_id)
            .bind(&response_id)
            .bind(option_id)
            .bind(text)
            .bind(submitted_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        info!("📝 Stored response {} for survey {} ({} answers)", response_id, survey_id, rows.len());
        Ok(response_id)
    }

    pub async fn survey_answers(&self, survey_id: i64) -> Result<Vec<SurveyAnswer>> {
        Ok(sqlx::query_as::<_, SurveyAnswer>(
            "SELECT * FROM survey_answers WHERE survey_id = ? ORDER BY created_at, response_id, id",
        )
        .bind(survey_id)
        .fetch_all(self.pool())
        .await?)
    }
}

type AnswerRow = (i64, Option<i64>, Option<String>);

fn answer_rows(tree: &SurveyTree, submission: &ResponseSubmission) -> Result<Vec<AnswerRow>> {
    let mut rows = Vec::new();

    for entry in &tree.questions {
        let question = &entry.question;
        let Some(question_id) = question.id else { continue };
        let answer = submission
            .answers
            .iter()
            .find(|answer| answer.question_id == question_id);

        let text = answer
            .and_then(|a| a.text.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty());
        let option_ids = answer.map(|a| a.option_ids.as_slice()).unwrap_or_default();

        let answered = match question.question_type {
            QuestionType::SingleChoice | QuestionType::MultipleChoice => !option_ids.is_empty(),
            QuestionType::Text | QuestionType::Rating => text.is_some(),
        };
        if !answered {
            if question.required {
                return Err(AppError::validation(format!(
                    "Question \"{}\" requires an answer",
                    question.text
                )));
            }
            continue;
        }

        match question.question_type {
            QuestionType::SingleChoice | QuestionType::MultipleChoice => {
                if question.question_type == QuestionType::SingleChoice && option_ids.len() > 1 {
                    return Err(AppError::validation(format!(
                        "Question \"{}\" accepts a single option",
                        question.text
                    )));
                }
                for option_id in option_ids {
                    if !entry.options.iter().any(|o| o.id == Some(*option_id)) {
                        return Err(AppError::validation(format!(
                            "Option {} does not belong to question \"{}\"",
                            option_id, question.text
                        )));
                    }
                    rows.push((question_id, Some(*option_id), None));
                }
            }
            QuestionType::Rating => {
                let value = text.unwrap_or_default();
                match value.parse::<u8>() {
                    Ok(score) if (1..=5).contains(&score) => {
                        rows.push((question_id, None, Some(score.to_string())))
                    }
                    _ => {
                        return Err(AppError::validation(format!(
                            "Rating for \"{}\" must be between 1 and 5",
                            question.text
                        )))
                    }
                }
            }
            QuestionType::Text => rows.push((question_id, None, text.map(str::to_string))),
        }
    }

    for answer in &submission.answers {
        let known = tree
            .questions
            .iter()
            .any(|entry| entry.question.id == Some(answer.question_id));
        if !known {
            return Err(AppError::validation(format!(
                "Question {} is not part of this survey",
                answer.question_id
            )));
        }
    }

    Ok(rows)
}
