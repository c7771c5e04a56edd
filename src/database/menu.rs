use async_trait::async_trait;

use super::{delete_by_id, fetch_by_id, require_id, updated, Database, Repository};
use crate::error::Result;
use crate::models::MenuItem;

#[async_trait]
impl Repository<MenuItem> for Database {
    async fn list(&self) -> Result<Vec<MenuItem>> {
        Ok(sqlx::query_as::<_, MenuItem>(
            "SELECT * FROM menu_items ORDER BY parent_id IS NOT NULL, parent_id, position, id",
        )
        .fetch_all(self.pool())
        .await?)
    }

    async fn get(&self, id: i64) -> Result<Option<MenuItem>> {
        fetch_by_id(self.pool(), "menu_items", id).await
    }

    async fn insert(&self, item: &MenuItem) -> Result<MenuItem> {
        Ok(sqlx::query_as::<_, MenuItem>(
            r#"
            INSERT INTO menu_items (title, url, parent_id, position, is_active)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&item.title)
        .bind(&item.url)
        .bind(item.parent_id)
        .bind(item.position)
        .bind(item.is_active)
        .fetch_one(self.pool())
        .await?)
    }

    async fn update(&self, item: &MenuItem) -> Result<MenuItem> {
        let id = require_id(item)?;
        let row = sqlx::query_as::<_, MenuItem>(
            r#"
            UPDATE menu_items
            SET title = ?, url = ?, parent_id = ?, position = ?, is_active = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&item.title)
        .bind(&item.url)
        .bind(item.parent_id)
        .bind(item.position)
        .bind(item.is_active)
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        updated(row, id)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        delete_by_id(self.pool(), "menu_items", id, "menu item").await
    }
}

impl Database {
    /// Active items only, for the public navigation.
    pub async fn active_menu_items(&self) -> Result<Vec<MenuItem>> {
        Ok(sqlx::query_as::<_, MenuItem>(
            "SELECT * FROM menu_items WHERE is_active = 1 ORDER BY position, id",
        )
        .fetch_all(self.pool())
        .await?)
    }
}
