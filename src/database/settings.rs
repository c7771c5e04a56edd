use chrono::Utc;

use super::Database;
use crate::error::Result;
use crate::models::Setting;

impl Database {
    pub async fn list_settings(&self) -> Result<Vec<Setting>> {
        Ok(sqlx::query_as::<_, Setting>("SELECT * FROM settings ORDER BY key")
            .fetch_all(self.pool())
            .await?)
    }

    pub async fn get_setting(&self, key: &str) -> Result<Option<Setting>> {
        Ok(sqlx::query_as::<_, Setting>("SELECT * FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(self.pool())
            .await?)
    }

    /// Raw value lookup; `None` when the key was never written.
    pub async fn setting_value(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get_setting(key).await?.map(|setting| setting.value))
    }

    /// Batch upsert in one transaction.
    pub async fn upsert_settings(&self, entries: &[(String, String)]) -> Result<Vec<Setting>> {
        let mut tx = self.pool().begin().await?;
        let now = Utc::now();
        let mut saved = Vec::with_capacity(entries.len());

        for (key, value) in entries {
            let setting = sqlx::query_as::<_, Setting>(
                r#"
                INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
                RETURNING *
                "#,
            )
            .bind(key)
            .bind(value)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;
            saved.push(setting);
        }

        tx.commit().await?;
        Ok(saved)
    }
}
