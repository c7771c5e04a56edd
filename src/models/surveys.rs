use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum QuestionType {
    SingleChoice,
    MultipleChoice,
    Text,
    Rating,
}

impl QuestionType {
    pub fn has_options(self) -> bool {
        matches!(self, QuestionType::SingleChoice | QuestionType::MultipleChoice)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Survey {
    #[serde(default)]
    pub id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Question {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub survey_id: i64,
    pub text: String,
    pub question_type: QuestionType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub position: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct QuestionOption {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub question_id: i64,
    pub text: String,
    #[serde(default)]
    pub position: i64,
}

/// One stored answer row. All rows of a single submission share `response_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SurveyAnswer {
    pub id: Option<i64>,
    pub survey_id: i64,
    pub question_id: i64,
    pub response_id: String,
    pub option_id: Option<i64>,
    pub answer_text: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionTree {
    #[serde(flatten)]
    pub question: Question,
    #[serde(default)]
    pub options: Vec<QuestionOption>,
}

/// A survey with its questions and their options, as edited by the builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyTree {
    #[serde(flatten)]
    pub survey: Survey,
    #[serde(default)]
    pub questions: Vec<QuestionTree>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerInput {
    pub question_id: i64,
    #[serde(default)]
    pub option_ids: Vec<i64>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSubmission {
    pub answers: Vec<AnswerInput>,
}
