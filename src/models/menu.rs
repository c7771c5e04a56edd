use serde::{Deserialize, Serialize};

/// Navigation entry. `parent_id` is at most one level deep and `position` is
/// 1-based within the sibling group sharing the same parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MenuItem {
    #[serde(default)]
    pub id: Option<i64>,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default = "first_position")]
    pub position: i64,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

fn first_position() -> i64 {
    1
}

fn active_by_default() -> bool {
    true
}

/// Nested form served to the public site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuNode {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub children: Vec<MenuNode>,
}
