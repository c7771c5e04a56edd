use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Static page rendered by the public site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Page {
    #[serde(default)]
    pub id: Option<i64>,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub meta_title: Option<String>,
    #[serde(default)]
    pub meta_description: Option<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct NewsItem {
    #[serde(default)]
    pub id: Option<i64>,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

/// Medical service offered by the clinic, listed in `position` order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Service {
    #[serde(default)]
    pub id: Option<i64>,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub published: bool,
}

/// Doctor profile, ordered on the public site by `position`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Doctor {
    #[serde(default)]
    pub id: Option<i64>,
    pub full_name: String,
    pub specialty: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub published: bool,
}
