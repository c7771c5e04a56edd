//! Common test utilities and helpers


pub use database::{test_app, test_database, TestApp, TestDatabase};

/// Test data utilities
pub mod test_data {
    use clinic_cms::models::{
        ContactDetailDraft, ContactGroup, ContactGroupDraft, ContactKind, DetailKey, MenuItem,
        Page, Question, QuestionOption, QuestionTree, QuestionType, Survey, SurveyTree,
    };

    /// Menu item whose URL is derived from the title.
    pub fn menu_item(id: Option<i64>, title: &str, parent_id: Option<i64>, position: i64) -> MenuItem {
        MenuItem {
            id,
            title: title.to_string(),
            url: format!("/{}", title.to_lowercase().replace(' ', "-")),
            parent_id,
            position,
            is_active: true,
        }
    }

    pub fn page(slug: &str, published: bool) -> Page {
        Page {
            id: None,
            title: format!("Page {slug}"),
            slug: slug.to_string(),
            content: "<p>Welcome to the clinic</p>".to_string(),
            meta_title: Some("Clinic".to_string()),
            meta_description: None,
            published,
            updated_at: None,
        }
    }

    pub fn contact_group(name: &str, position: i64) -> ContactGroup {
        ContactGroup {
            id: None,
            name: name.to_string(),
            position,
            is_active: true,
        }
    }

    pub fn detail_draft(key: Option<DetailKey>, kind: ContactKind, value: &str) -> ContactDetailDraft {
        ContactDetailDraft {
            id: key,
            kind,
            value: value.to_string(),
            label: None,
            position: 0,
        }
    }

    pub fn group_draft(group: ContactGroup, details: Vec<ContactDetailDraft>) -> ContactGroupDraft {
        ContactGroupDraft { group, details }
    }

    /// Unsaved survey: one single choice question with two options, one
    /// required rating and one optional text question.
    pub fn survey_tree(title: &str) -> SurveyTree {
        let question = |text: &str, question_type, required, position| Question {
            id: None,
            survey_id: 0,
            text: text.to_string(),
            question_type,
            required,
            position,
        };
        let option = |text: &str, position| QuestionOption {
            id: None,
            question_id: 0,
            text: text.to_string(),
            position,
        };

        SurveyTree {
            survey: Survey {
                id: None,
                title: title.to_string(),
                description: Some("Tell us about your visit".to_string()),
                is_active: true,
                created_at: None,
            },
            questions: vec![
                QuestionTree {
                    question: question("How did you book?", QuestionType::SingleChoice, true, 1),
                    options: vec![option("Phone", 1), option("Website", 2)],
                },
                QuestionTree {
                    question: question("Rate your visit", QuestionType::Rating, true, 2),
                    options: vec![],
                },
                QuestionTree {
                    question: question("Anything else?", QuestionType::Text, false, 3),
                    options: vec![],
                },
            ],
        }
    }
}

/// Logging utilities for tests
pub mod logging {
    use std::sync::Once;
    use tracing::{debug, info};

    static INIT: Once = Once::new();

    /// Initialize test logging
    pub fn init_test_logging() {
        INIT.call_once(|| {
            // test_log may already have installed a subscriber
            let _ = tracing::subscriber::set_global_default(
                tracing_subscriber::fmt()
                    .with_env_filter("clinic_cms=debug,test=debug")
                    .with_test_writer()
                    .finish(),
            );
        });
    }

    /// Log test step
    pub fn log_test_step(step: &str) {
        info!("🧪 Test Step: {}", step);
    }

    /// Log test data
    pub fn log_test_data<T: std::fmt::Debug>(label: &str, data: &T) {
        debug!("📊 {}: {:?}", label, data);
    }
}
