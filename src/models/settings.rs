use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Key-value settings row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Setting {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}
