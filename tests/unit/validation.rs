//! Field validation for admin input

use assert_matches::assert_matches;

use clinic_cms::models::{ContactDetail, ContactKind, Role, UserInput};
use clinic_cms::validation::{is_valid_link, is_valid_slug, Validate};
use clinic_cms::AppError;

use crate::common::test_data;

fn detail(kind: ContactKind, value: &str) -> ContactDetail {
    ContactDetail {
        id: None,
        group_id: 1,
        kind,
        value: value.to_string(),
        label: None,
        position: 1,
    }
}

#[test]
fn test_slugs_and_links() {
    assert!(is_valid_slug("family-medicine"));
    assert!(!is_valid_slug("Family Medicine"));
    assert!(!is_valid_slug("trailing-"));

    assert!(is_valid_link("/services"));
    assert!(is_valid_link("https://clinic.example/book"));
    assert!(!is_valid_link("//evil.example"));
    assert!(!is_valid_link("javascript:alert(1)"));
}

#[test]
fn test_page_and_menu_validation() {
    let mut page = test_data::page("about", true);
    assert!(page.validate().is_ok());

    page.meta_title = Some("t".repeat(61));
    assert_matches!(page.validate(), Err(AppError::Validation(_)));

    let mut item = test_data::menu_item(None, "Home", None, 1);
    assert!(item.validate().is_ok());
    item.position = 0;
    assert_matches!(item.validate(), Err(AppError::Validation(_)));
}

#[test]
fn test_contact_details_by_kind() {
    assert!(detail(ContactKind::Phone, "+1 555 010 2030").validate().is_ok());
    assert!(detail(ContactKind::Phone, "ring us").validate().is_err());
    assert!(detail(ContactKind::Email, "desk@clinic.example").validate().is_ok());
    assert!(detail(ContactKind::Email, "desk").validate().is_err());
    assert!(detail(ContactKind::Hours, "Mon-Fri 8-18").validate().is_ok());
}

#[test]
fn test_user_input_rules() {
    let input = UserInput {
        username: "reception".to_string(),
        password: Some("short".to_string()),
        active: true,
        role: Role::Editor,
    };
    assert_matches!(input.validate(), Err(AppError::Validation(msg)) if msg.contains("at least"));

    let input = UserInput {
        password: None,
        ..input
    };
    assert!(input.validate().is_ok());
}
