use std::collections::HashMap;

use async_trait::async_trait;
use tracing::info;

use super::{delete_by_id, fetch_by_id, require_id, updated, Database, Repository};
use crate::error::{AppError, Result};
use crate::models::{ContactDetail, ContactGroup, ContactGroupWithDetails, PositionUpdate};

#[async_trait]
impl Repository<ContactGroup> for Database {
    async fn list(&self) -> Result<Vec<ContactGroup>> {
        Ok(
            sqlx::query_as::<_, ContactGroup>("SELECT * FROM contact_groups ORDER BY position, id")
                .fetch_all(self.pool())
                .await?,
        )
    }

    async fn get(&self, id: i64) -> Result<Option<ContactGroup>> {
        fetch_by_id(self.pool(), "contact_groups", id).await
    }

    async fn insert(&self, group: &ContactGroup) -> Result<ContactGroup> {
        Ok(sqlx::query_as::<_, ContactGroup>(
            "INSERT INTO contact_groups (name, position, is_active) VALUES (?, ?, ?) RETURNING *",
        )
        .bind(&group.name)
        .bind(group.position)
        .bind(group.is_active)
        .fetch_one(self.pool())
        .await?)
    }

    async fn update(&self, group: &ContactGroup) -> Result<ContactGroup> {
        let id = require_id(group)?;
        let row = sqlx::query_as::<_, ContactGroup>(
            "UPDATE contact_groups SET name = ?, position = ?, is_active = ? WHERE id = ? RETURNING *",
        )
        .bind(&group.name)
        .bind(group.position)
        .bind(group.is_active)
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        updated(row, id)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        delete_by_id(self.pool(), "contact_groups", id, "contact group").await
    }
}

#[async_trait]
impl Repository<ContactDetail> for Database {
    async fn list(&self) -> Result<Vec<ContactDetail>> {
        Ok(sqlx::query_as::<_, ContactDetail>(
            "SELECT * FROM contact_details ORDER BY group_id, position, id",
        )
        .fetch_all(self.pool())
        .await?)
    }

    async fn get(&self, id: i64) -> Result<Option<ContactDetail>> {
        fetch_by_id(self.pool(), "contact_details", id).await
    }

    async fn insert(&self, detail: &ContactDetail) -> Result<ContactDetail> {
        Ok(sqlx::query_as::<_, ContactDetail>(
            r#"
            INSERT INTO contact_details (group_id, kind, value, label, position)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(detail.group_id)
        .bind(detail.kind)
        .bind(&detail.value)
        .bind(&detail.label)
        .bind(detail.position)
        .fetch_one(self.pool())
        .await?)
    }

    async fn update(&self, detail: &ContactDetail) -> Result<ContactDetail> {
        let id = require_id(detail)?;
        let row = sqlx::query_as::<_, ContactDetail>(
            r#"
            UPDATE contact_details
            SET group_id = ?, kind = ?, value = ?, label = ?, position = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(detail.group_id)
        .bind(detail.kind)
        .bind(&detail.value)
        .bind(&detail.label)
        .bind(detail.position)
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        updated(row, id)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        delete_by_id(self.pool(), "contact_details", id, "contact detail").await
    }
}

impl Database {
    /// Every group with its details, groups in display order.
    pub async fn contact_groups_with_details(&self) -> Result<Vec<ContactGroupWithDetails>> {
        let groups = Repository::<ContactGroup>::list(self).await?;
        let details = Repository::<ContactDetail>::list(self).await?;
        Ok(attach_details(groups, details))
    }

    /// Active groups only, for the public contact block.
    pub async fn active_contact_info(&self) -> Result<Vec<ContactGroupWithDetails>> {
        let groups = sqlx::query_as::<_, ContactGroup>(
            "SELECT * FROM contact_groups WHERE is_active = 1 ORDER BY position, id",
        )
        .fetch_all(self.pool())
        .await?;
        let details = Repository::<ContactDetail>::list(self).await?;
        Ok(attach_details(groups, details))
    }

    /// Apply an ordered list of group positions in one transaction.
    pub async fn reorder_contact_groups(&self, updates: &[PositionUpdate]) -> Result<()> {
        let mut tx = self.pool().begin().await?;

        for update in updates {
            let result = sqlx::query("UPDATE contact_groups SET position = ? WHERE id = ?")
                .bind(update.position)
                .bind(update.id)
                .execute(&mut *tx)
                .await?;

            if result.rows_affected() == 0 {
                return Err(AppError::not_found(format!("contact group {}", update.id)));
            }
        }

        tx.commit().await?;
        info!("Reordered {} contact groups", updates.len());
        Ok(())
    }
}

fn attach_details(
    groups: Vec<ContactGroup>,
    details: Vec<ContactDetail>,
) -> Vec<ContactGroupWithDetails> {
    let mut by_group: HashMap<i64, Vec<ContactDetail>> = HashMap::new();
    for detail in details {
        by_group.entry(detail.group_id).or_default().push(detail);
    }

    groups
        .into_iter()
        .map(|group| {
            let details = group
                .id
                .and_then(|id| by_group.remove(&id))
                .unwrap_or_default();
            ContactGroupWithDetails { group, details }
        })
        .collect()
}
