//! Menu ordering scenarios and density checks

use std::collections::BTreeMap;

use pretty_assertions::assert_eq;
use test_log::test;

use clinic_cms::menu_order::{
    build_tree, changed_items, check_hierarchy, position_after, remove, reorder, MenuEdit,
    Placement,
};
use clinic_cms::models::MenuItem;

use crate::common::{logging, test_data::menu_item};

fn positions(items: &[MenuItem]) -> BTreeMap<String, i64> {
    items
        .iter()
        .map(|item| (item.title.clone(), item.position))
        .collect()
}

/// Every sibling group is numbered 1..=n with no gaps or duplicates.
fn assert_dense(items: &[MenuItem]) {
    let mut groups: BTreeMap<Option<i64>, Vec<i64>> = BTreeMap::new();
    for item in items {
        groups.entry(item.parent_id).or_default().push(item.position);
    }
    for (parent, mut group) in groups {
        group.sort_unstable();
        let expected: Vec<i64> = (1..=group.len() as i64).collect();
        assert_eq!(group, expected, "group under {:?} is not dense", parent);
    }
}

fn edit(items: &[MenuItem], title: &str, parent_id: Option<i64>, position: i64) -> MenuEdit {
    let mut item = items
        .iter()
        .find(|item| item.title == title)
        .cloned()
        .expect("item exists");
    item.parent_id = parent_id;
    item.position = position;
    MenuEdit::new(item)
}

#[test]
fn test_moving_last_root_item_to_front() {
    logging::init_test_logging();
    let items = vec![
        menu_item(Some(1), "A", None, 1),
        menu_item(Some(2), "B", None, 2),
        menu_item(Some(3), "C", None, 3),
    ];

    let result = reorder(&items, &edit(&items, "C", None, 1));

    let expected: BTreeMap<String, i64> =
        [("A".to_string(), 2), ("B".to_string(), 3), ("C".to_string(), 1)].into();
    assert_eq!(positions(&result), expected);
    assert_dense(&result);
}

#[test]
fn test_reparent_root_item_into_middle_of_children() {
    let items = vec![
        menu_item(Some(1), "P", None, 1),
        menu_item(Some(2), "New", None, 2),
        menu_item(Some(3), "Q", None, 3),
        menu_item(Some(10), "X", Some(1), 1),
        menu_item(Some(11), "Y", Some(1), 2),
    ];

    let result = reorder(&items, &edit(&items, "New", Some(1), 2));
    logging::log_test_data("Reparented", &result);

    let moved = result.iter().find(|i| i.title == "New").expect("moved item");
    assert_eq!(moved.parent_id, Some(1));

    let by_title = positions(&result);
    assert_eq!(by_title["X"], 1);
    assert_eq!(by_title["New"], 2);
    assert_eq!(by_title["Y"], 3);
    // Old group closes the gap.
    assert_eq!(by_title["P"], 1);
    assert_eq!(by_title["Q"], 2);
    assert_dense(&result);
}

#[test]
fn test_move_to_front_only_shifts_preceding_siblings() {
    let items: Vec<MenuItem> = (1..=5)
        .map(|n| menu_item(Some(n), &format!("Item {n}"), None, n))
        .chain([menu_item(Some(20), "Child", Some(1), 1)])
        .collect();

    let result = reorder(&items, &edit(&items, "Item 4", None, 1));
    let by_title = positions(&result);

    assert_eq!(by_title["Item 4"], 1);
    assert_eq!(by_title["Item 1"], 2);
    assert_eq!(by_title["Item 2"], 3);
    assert_eq!(by_title["Item 3"], 4);
    assert_eq!(by_title["Item 5"], 5);
    assert_eq!(by_title["Child"], 1);

    let changed = changed_items(&items, &result);
    let mut changed_titles: Vec<&str> = changed.iter().map(|i| i.title.as_str()).collect();
    changed_titles.sort_unstable();
    assert_eq!(changed_titles, vec!["Item 1", "Item 2", "Item 3", "Item 4"]);
}

#[test]
fn test_cross_group_move_to_old_group_size_appends() {
    let items = vec![
        menu_item(Some(1), "A", None, 1),
        menu_item(Some(2), "B", None, 2),
        menu_item(Some(3), "C", None, 3),
        menu_item(Some(10), "X", Some(1), 1),
    ];

    // Position 3 is the size of the group C leaves; the new group only has
    // one item, so C lands at the end of it.
    let result = reorder(&items, &edit(&items, "C", Some(1), 3));

    let expected: BTreeMap<String, i64> = [
        ("A".to_string(), 1),
        ("B".to_string(), 2),
        ("C".to_string(), 2),
        ("X".to_string(), 1),
    ]
    .into();
    assert_eq!(positions(&result), expected);
    let moved = result.iter().find(|i| i.title == "C").expect("moved item");
    assert_eq!(moved.parent_id, Some(1));
    assert_dense(&result);
}

#[test]
fn test_cross_group_move_to_old_group_size_inside_larger_group() {
    let items = vec![
        menu_item(Some(1), "A", None, 1),
        menu_item(Some(2), "B", None, 2),
        menu_item(Some(10), "X", Some(1), 1),
        menu_item(Some(11), "Y", Some(1), 2),
        menu_item(Some(12), "Z", Some(1), 3),
    ];

    let result = reorder(&items, &edit(&items, "B", Some(1), 2));

    let expected: BTreeMap<String, i64> = [
        ("A".to_string(), 1),
        ("B".to_string(), 2),
        ("X".to_string(), 1),
        ("Y".to_string(), 3),
        ("Z".to_string(), 4),
    ]
    .into();
    assert_eq!(positions(&result), expected);
    assert_dense(&result);
}

#[test]
fn test_every_move_keeps_groups_dense() {
    let items = vec![
        menu_item(Some(1), "Home", None, 1),
        menu_item(Some(2), "Services", None, 2),
        menu_item(Some(3), "Contact", None, 3),
        menu_item(Some(4), "Dental", Some(2), 1),
        menu_item(Some(5), "Surgery", Some(2), 2),
        menu_item(Some(6), "Lab", Some(2), 3),
    ];

    let movable = ["Home", "Contact", "Dental", "Surgery", "Lab"];
    for title in movable {
        for parent in [None, Some(2)] {
            for position in 0..=5 {
                let result = reorder(&items, &edit(&items, title, parent, position));
                assert_eq!(result.len(), items.len());
                assert_dense(&result);
            }
        }
    }
}

#[test]
fn test_new_item_is_inserted_and_previous_placement_is_honoured() {
    let items = vec![
        menu_item(Some(1), "A", None, 1),
        menu_item(Some(2), "B", None, 2),
    ];

    let inserted = reorder(&items, &MenuEdit::new(menu_item(None, "New", None, 1)));
    assert_eq!(inserted.len(), 3);
    assert_eq!(positions(&inserted)["New"], 1);
    assert_eq!(positions(&inserted)["A"], 2);
    assert_dense(&inserted);

    // Caller-provided previous placement wins over the stored row.
    let mut target = items[1].clone();
    target.position = 1;
    let result = reorder(
        &items,
        &MenuEdit {
            item: target,
            previous: Some(Placement {
                parent_id: None,
                position: 2,
            }),
        },
    );
    assert_eq!(positions(&result)["B"], 1);
    assert_eq!(positions(&result)["A"], 2);
}

#[test]
fn test_remove_position_after_and_tree() {
    let items = vec![
        menu_item(Some(1), "Home", None, 1),
        menu_item(Some(2), "About", None, 2),
        menu_item(Some(3), "Team", Some(2), 1),
        menu_item(Some(4), "Contact", None, 3),
        menu_item(Some(5), "Orphan", Some(99), 1),
    ];

    assert_eq!(position_after(&items, 1), Some(2));
    assert_eq!(position_after(&items, 42), None);

    let tree = build_tree(&items);
    let titles: Vec<&str> = tree.iter().map(|n| n.title.as_str()).collect();
    assert_eq!(titles, vec!["Home", "About", "Contact"]);
    assert_eq!(tree[1].children.len(), 1);
    assert_eq!(tree[1].children[0].title, "Team");

    let remaining = remove(&items, 2);
    let by_title = positions(&remaining);
    assert!(!by_title.contains_key("About"));
    assert!(!by_title.contains_key("Team"));
    assert_eq!(by_title["Contact"], 2);
}

#[test]
fn test_hierarchy_is_one_level_deep() {
    let items = vec![
        menu_item(Some(1), "Services", None, 1),
        menu_item(Some(2), "Dental", Some(1), 1),
        menu_item(Some(3), "About", None, 2),
    ];

    assert!(check_hierarchy(&items, &menu_item(None, "Lab", Some(1), 1)).is_ok());
    assert!(check_hierarchy(&items, &menu_item(None, "Deep", Some(2), 1)).is_err());
    assert!(check_hierarchy(&items, &menu_item(Some(1), "Services", Some(3), 1)).is_err());
    assert!(check_hierarchy(&items, &menu_item(Some(3), "About", Some(3), 1)).is_err());
    assert!(check_hierarchy(&items, &menu_item(None, "Lost", Some(77), 1)).is_err());
}
