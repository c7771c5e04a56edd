use chrono::{DateTime, Utc};

use super::Database;
use crate::error::{AppError, Result};
use crate::models::{BackupRecord, BackupStatus};

impl Database {
    pub async fn create_backup_record(&self, filename: &str) -> Result<BackupRecord> {
        Ok(sqlx::query_as::<_, BackupRecord>(
            r#"
            INSERT INTO backups (filename, size_bytes, status, created_at)
            VALUES (?, 0, ?, ?)
            RETURNING *
            "#,
        )
        .bind(filename)
        .bind(BackupStatus::Pending)
        .bind(Utc::now())
        .fetch_one(self.pool())
        .await?)
    }

    pub async fn mark_backup_completed(&self, id: i64, size_bytes: i64) -> Result<BackupRecord> {
        sqlx::query_as::<_, BackupRecord>(
            r#"
            UPDATE backups SET status = ?, size_bytes = ?, error = NULL, completed_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(BackupStatus::Completed)
        .bind(size_bytes)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| AppError::not_found(format!("backup {id}")))
    }

    pub async fn mark_backup_failed(&self, id: i64, error: &str) -> Result<BackupRecord> {
        sqlx::query_as::<_, BackupRecord>(
            r#"
            UPDATE backups SET status = ?, error = ?, completed_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(BackupStatus::Failed)
        .bind(error)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| AppError::not_found(format!("backup {id}")))
    }

    pub async fn list_backups(&self) -> Result<Vec<BackupRecord>> {
        Ok(sqlx::query_as::<_, BackupRecord>(
            "SELECT * FROM backups ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(self.pool())
        .await?)
    }

    pub async fn get_backup(&self, id: i64) -> Result<Option<BackupRecord>> {
        Ok(sqlx::query_as::<_, BackupRecord>("SELECT * FROM backups WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?)
    }

    pub async fn backups_created_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<BackupRecord>> {
        Ok(sqlx::query_as::<_, BackupRecord>(
            "SELECT * FROM backups WHERE created_at < ? ORDER BY created_at",
        )
        .bind(cutoff)
        .fetch_all(self.pool())
        .await?)
    }

    pub async fn delete_backup_record(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM backups WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}
