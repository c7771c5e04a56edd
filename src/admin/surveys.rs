use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use super::save_record;
use crate::database::Repository;
use crate::error::{AppError, Result};
use crate::models::{Question, QuestionOption, QuestionTree, Survey, SurveyTree};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurveyTreeSave {
    /// What was stored; questions or options that failed are left out.
    pub tree: SurveyTree,
    pub failures: Vec<String>,
}

/// Save a survey, its questions in order, and each question's options in
/// parallel. Only a survey failure aborts; everything below it is best effort.
pub async fn save_survey_tree<R>(repo: &R, tree: &SurveyTree) -> Result<SurveyTreeSave>
where
    R: Repository<Survey> + Repository<Question> + Repository<QuestionOption> + ?Sized,
{
    let survey = save_record(repo, &tree.survey).await?;
    let survey_id = survey
        .id
        .ok_or_else(|| AppError::Internal("saved survey has no id".to_string()))?;

    let mut failures = Vec::new();
    let mut questions = Vec::with_capacity(tree.questions.len());

    for (index, entry) in tree.questions.iter().enumerate() {
        let mut question = entry.question.clone();
        question.survey_id = survey_id;
        if question.position == 0 {
            question.position = index as i64 + 1;
        }

        let saved = match save_record(repo, &question).await {
            Ok(saved) => saved,
            Err(e) => {
                warn!("Question '{}' of survey {} not saved: {}", question.text, survey_id, e);
                failures.push(format!("Question \"{}\": {}", question.text, e));
                continue;
            }
        };
        let Some(question_id) = saved.id else { continue };

        let options: Vec<QuestionOption> = if saved.question_type.has_options() {
            entry
                .options
                .iter()
                .enumerate()
                .map(|(i, option)| {
                    let mut option = option.clone();
                    option.question_id = question_id;
                    if option.position == 0 {
                        option.position = i as i64 + 1;
                    }
                    option
                })
                .collect()
        } else {
            Vec::new()
        };

        let results = join_all(options.iter().map(|option| save_record(repo, option))).await;
        let mut saved_options = Vec::with_capacity(options.len());
        for (option, result) in options.iter().zip(results) {
            match result {
                Ok(stored) => saved_options.push(stored),
                Err(e) => {
                    warn!("Option '{}' of question {} not saved: {}", option.text, question_id, e);
                    failures.push(format!("Option \"{}\": {}", option.text, e));
                }
            }
        }

        questions.push(QuestionTree {
            question: saved,
            options: saved_options,
        });
    }

    info!(
        "🗳️ Saved survey {} with {} questions ({} failures)",
        survey_id,
        questions.len(),
        failures.len()
    );

    Ok(SurveyTreeSave {
        tree: SurveyTree { survey, questions },
        failures,
    })
}
