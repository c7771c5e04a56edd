//! CSV export of survey responses.

use std::collections::HashMap;

use csv::Writer;

use crate::error::{AppError, Result};
use crate::models::{SurveyAnswer, SurveyTree};

const MULTI_SEPARATOR: &str = "; ";

pub fn survey_csv_filename(survey_id: i64) -> String {
    format!("survey-{survey_id}-responses.csv")
}

/// One row per response: `response_id,submitted_at,<question text>...`.
///
/// Option answers render the option text, several options for one question
/// are joined with `"; "`. Responses keep the order of their first answer.
pub fn survey_csv(tree: &SurveyTree, answers: &[SurveyAnswer]) -> Result<Vec<u8>> {
    let option_text: HashMap<i64, &str> = tree
        .questions
        .iter()
        .flat_map(|q| q.options.iter())
        .filter_map(|o| o.id.map(|id| (id, o.text.as_str())))
        .collect();

    let mut order: Vec<&str> = Vec::new();
    let mut responses: HashMap<&str, Vec<&SurveyAnswer>> = HashMap::new();
    for answer in answers {
        let entry = responses.entry(answer.response_id.as_str()).or_default();
        if entry.is_empty() {
            order.push(answer.response_id.as_str());
        }
        entry.push(answer);
    }

    let mut writer = Writer::from_writer(Vec::new());

    let mut header = vec!["response_id".to_string(), "submitted_at".to_string()];
    header.extend(tree.questions.iter().map(|q| q.question.text.clone()));
    writer.write_record(&header)?;

    for response_id in order {
        let rows = &responses[response_id];
        let submitted_at = rows
            .iter()
            .filter_map(|a| a.created_at)
            .min()
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();

        let mut record = vec![response_id.to_string(), submitted_at];
        for entry in &tree.questions {
            let values: Vec<&str> = rows
                .iter()
                .filter(|a| Some(a.question_id) == entry.question.id)
                .filter_map(|a| match a.option_id {
                    Some(option_id) => option_text.get(&option_id).copied(),
                    None => a.answer_text.as_deref(),
                })
                .collect();
            record.push(values.join(MULTI_SEPARATOR));
        }
        writer.write_record(&record)?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::Io(e.into_error()))
}
