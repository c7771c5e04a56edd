use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Editor,
}

impl Default for Role {
    fn default() -> Self {
        Role::Editor
    }
}

/// Admin panel account. The credential never leaves the server: it is skipped
/// on serialization and an empty hash on update means "keep the stored one".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    #[serde(default)]
    pub id: Option<i64>,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Create/update body for users; `password` is hashed before storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInput {
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "active_by_default")]
    pub active: bool,
    #[serde(default)]
    pub role: Role,
}

/// Public projection of a user for auth status responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserView {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

fn active_by_default() -> bool {
    true
}
