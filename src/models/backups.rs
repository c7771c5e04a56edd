use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum BackupStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct BackupRecord {
    pub id: i64,
    pub filename: String,
    pub size_bytes: i64,
    pub status: BackupStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Value of the `db_backup_frequency` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupFrequency {
    Daily,
    Weekly,
    Monthly,
}

impl FromStr for BackupFrequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(BackupFrequency::Daily),
            "weekly" => Ok(BackupFrequency::Weekly),
            "monthly" => Ok(BackupFrequency::Monthly),
            other => Err(format!(
                "unknown backup frequency '{other}' (expected daily, weekly or monthly)"
            )),
        }
    }
}

impl std::fmt::Display for BackupFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            BackupFrequency::Daily => "daily",
            BackupFrequency::Weekly => "weekly",
            BackupFrequency::Monthly => "monthly",
        })
    }
}
