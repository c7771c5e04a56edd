use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use super::{delete_by_id, fetch_by_id, require_id, updated, Database, Repository};
use crate::error::{AppError, Result};
use crate::models::User;

#[async_trait]
impl Repository<User> for Database {
    async fn list(&self) -> Result<Vec<User>> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY username")
            .fetch_all(self.pool())
            .await?)
    }

    async fn get(&self, id: i64) -> Result<Option<User>> {
        fetch_by_id(self.pool(), "users", id).await
    }

    async fn insert(&self, user: &User) -> Result<User> {
        if user.password_hash.is_empty() {
            return Err(AppError::validation("A password is required for new users"));
        }

        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash, active, role, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.active)
        .bind(user.role)
        .bind(Utc::now())
        .fetch_one(self.pool())
        .await
        .map_err(|e| AppError::from_write(e, "A user with this username"))
    }

    /// An empty `password_hash` keeps the stored credential.
    async fn update(&self, user: &User) -> Result<User> {
        let id = require_id(user)?;
        let row = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = ?, password_hash = COALESCE(NULLIF(?, ''), password_hash),
                active = ?, role = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.active)
        .bind(user.role)
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AppError::from_write(e, "A user with this username"))?;

        updated(row, id)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        delete_by_id(self.pool(), "users", id, "user").await
    }
}

impl Database {
    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
                .bind(username)
                .fetch_optional(self.pool())
                .await?,
        )
    }

    pub async fn user_count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM users")
            .fetch_one(self.pool())
            .await?;
        Ok(row.get::<i64, _>("count"))
    }
}
