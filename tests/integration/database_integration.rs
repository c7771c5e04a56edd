//! Database integration tests

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;

use clinic_cms::backup::{cleanup, run_backup};
use clinic_cms::database::{upsert, Repository};
use clinic_cms::models::{
    AnswerInput, BackupStatus, ContactDetail, ContactGroup, ContactKind, Page, PositionUpdate,
    ResponseSubmission, SurveyTree,
};
use clinic_cms::secrets::SettingsCipher;
use clinic_cms::settings::{list_masked, save_settings, SECRET_PLACEHOLDER, SITE_TITLE, SMTP_PASSWORD};
use clinic_cms::AppError;

use crate::common::{logging, test_data, test_database};

#[tokio::test]
async fn test_page_lifecycle_and_publication() {
    logging::init_test_logging();
    logging::log_test_step("Testing page insert, update, publish filter and delete");
    let env = test_database().await.expect("Failed to create test database");
    let db = &env.db;

    let draft = upsert(db, &test_data::page("about", false)).await.unwrap();
    let id = draft.id.expect("stored id");
    assert!(draft.updated_at.is_some());
    assert_eq!(db.published_page("about").await.unwrap(), None);

    let mut published = draft.clone();
    published.published = true;
    published.title = "About us".to_string();
    let published = upsert(db, &published).await.unwrap();
    assert_eq!(published.id, Some(id));
    assert_eq!(
        db.published_page("about").await.unwrap().map(|p| p.title),
        Some("About us".to_string())
    );

    let duplicate = Repository::<Page>::insert(db, &test_data::page("about", true)).await;
    assert_matches!(duplicate, Err(AppError::Conflict(_)));

    Repository::<Page>::delete(db, id).await.unwrap();
    assert_matches!(
        Repository::<Page>::delete(db, id).await,
        Err(AppError::NotFound(_))
    );
}

#[tokio::test]
async fn test_contact_groups_reorder_and_public_filter() {
    let env = test_database().await.unwrap();
    let db = &env.db;

    let phones = Repository::<ContactGroup>::insert(db, &test_data::contact_group("Phones", 1))
        .await
        .unwrap();
    let mut hidden = test_data::contact_group("Hidden", 2);
    hidden.is_active = false;
    let hidden = Repository::<ContactGroup>::insert(db, &hidden).await.unwrap();
    let email = Repository::<ContactGroup>::insert(db, &test_data::contact_group("Email", 3))
        .await
        .unwrap();

    Repository::<ContactDetail>::insert(
        db,
        &ContactDetail {
            id: None,
            group_id: phones.id.unwrap(),
            kind: ContactKind::Phone,
            value: "+1 555 010 2030".to_string(),
            label: Some("Reception".to_string()),
            position: 1,
        },
    )
    .await
    .unwrap();

    db.reorder_contact_groups(&[
        PositionUpdate { id: email.id.unwrap(), position: 1 },
        PositionUpdate { id: phones.id.unwrap(), position: 2 },
        PositionUpdate { id: hidden.id.unwrap(), position: 3 },
    ])
    .await
    .unwrap();

    let public = db.active_contact_info().await.unwrap();
    let names: Vec<&str> = public.iter().map(|g| g.group.name.as_str()).collect();
    assert_eq!(names, vec!["Email", "Phones"]);
    assert_eq!(public[1].details.len(), 1);

    let missing = db
        .reorder_contact_groups(&[PositionUpdate { id: 999, position: 1 }])
        .await;
    assert_matches!(missing, Err(AppError::NotFound(_)));
}

async fn stored_survey(db: &clinic_cms::database::Database) -> SurveyTree {
    let saved = clinic_cms::admin::save_survey_tree(db, &test_data::survey_tree("Visit feedback"))
        .await
        .unwrap();
    assert!(saved.failures.is_empty(), "{:?}", saved.failures);
    saved.tree
}

#[tokio::test]
async fn test_survey_responses_are_validated_and_grouped() {
    logging::init_test_logging();
    let env = test_database().await.unwrap();
    let db = &env.db;

    let tree = stored_survey(db).await;
    let survey_id = tree.survey.id.unwrap();
    let booking = &tree.questions[0];
    let rating = tree.questions[1].question.id.unwrap();
    let website = booking.options[1].id.unwrap();

    let answer = |question_id, option_ids: Vec<i64>, text: Option<&str>| AnswerInput {
        question_id,
        option_ids,
        text: text.map(str::to_string),
    };

    // Required rating missing.
    let rejected = db
        .submit_response(
            survey_id,
            &ResponseSubmission {
                answers: vec![answer(booking.question.id.unwrap(), vec![website], None)],
            },
        )
        .await;
    assert_matches!(rejected, Err(AppError::Validation(_)));

    let response_id = db
        .submit_response(
            survey_id,
            &ResponseSubmission {
                answers: vec![
                    answer(booking.question.id.unwrap(), vec![website], None),
                    answer(rating, vec![], Some("5")),
                ],
            },
        )
        .await
        .unwrap();

    let answers = db.survey_answers(survey_id).await.unwrap();
    logging::log_test_data("Answers", &answers);
    assert_eq!(answers.len(), 2);
    assert!(answers.iter().all(|a| a.response_id == response_id));
    assert!(answers.iter().any(|a| a.option_id == Some(website)));
}

#[tokio::test]
async fn test_backup_run_and_cleanup() {
    let env = test_database().await.unwrap();
    let db = &env.db;
    Repository::<Page>::insert(db, &test_data::page("home", true)).await.unwrap();

    let record = run_backup(db, &env.config.backup_dir).await.unwrap();
    assert_eq!(record.status, BackupStatus::Completed);
    assert!(record.size_bytes > 0);

    let path = env.config.backup_dir.join(&record.filename);
    let dump = std::fs::read_to_string(&path).unwrap();
    assert!(dump.contains("INSERT INTO pages"));
    assert!(dump.contains("'home'"));

    // Nothing expires inside the retention window.
    assert_eq!(cleanup(db, &env.config.backup_dir, 30, Utc::now()).await.unwrap(), 0);

    let later = Utc::now() + Duration::days(31);
    assert_eq!(cleanup(db, &env.config.backup_dir, 30, later).await.unwrap(), 1);
    assert!(!path.exists());
    assert!(db.list_backups().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cleanup_rejects_out_of_range_retention() {
    let env = test_database().await.unwrap();
    let db = &env.db;
    run_backup(db, &env.config.backup_dir).await.unwrap();

    let result = cleanup(db, &env.config.backup_dir, 100_000_000, Utc::now()).await;
    assert_matches!(result, Err(AppError::Validation(_)));
    assert_eq!(db.list_backups().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_secret_settings_are_encrypted_and_masked() {
    let env = test_database().await.unwrap();
    let db = &env.db;
    let cipher = SettingsCipher::from_passphrase("integration-key").unwrap();

    let saved = save_settings(
        db,
        Some(&cipher),
        &[
            (SITE_TITLE.to_string(), "Riverside Clinic".to_string()),
            (SMTP_PASSWORD.to_string(), "mail-secret".to_string()),
        ],
    )
    .await
    .unwrap();
    assert!(saved.iter().any(|s| s.key == SMTP_PASSWORD && s.value == SECRET_PLACEHOLDER));

    let stored = db.setting_value(SMTP_PASSWORD).await.unwrap().unwrap();
    assert_ne!(stored, "mail-secret");
    assert_eq!(cipher.decrypt(&stored).unwrap(), "mail-secret");

    // Saving the placeholder back leaves the ciphertext alone.
    save_settings(
        db,
        Some(&cipher),
        &[(SMTP_PASSWORD.to_string(), SECRET_PLACEHOLDER.to_string())],
    )
    .await
    .unwrap();
    assert_eq!(db.setting_value(SMTP_PASSWORD).await.unwrap(), Some(stored));

    let listed = list_masked(db).await.unwrap();
    assert!(listed.iter().any(|s| s.key == SITE_TITLE && s.value == "Riverside Clinic"));
}
