use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub mod backups;
pub mod contacts;
pub mod content;
pub mod menu;
pub mod settings;
pub mod surveys;
pub mod users;

pub use backups::{BackupFrequency, BackupRecord, BackupStatus};
pub use contacts::{
    ContactDetail, ContactDetailDraft, ContactGroup, ContactGroupDraft, ContactGroupWithDetails,
    ContactKind, DetailKey, PositionUpdate,
};
pub use content::{Doctor, NewsItem, Page, Service};
pub use menu::{MenuItem, MenuNode};
pub use settings::Setting;
pub use surveys::{
    AnswerInput, Question, QuestionOption, QuestionTree, QuestionType, ResponseSubmission, Survey,
    SurveyAnswer, SurveyTree,
};
pub use users::{Role, User, UserInput, UserView};

/// A persisted record with a server-assigned integer id.
///
/// `id()` is `None` until the backend has stored the record, which is what the
/// generic upsert uses to pick between insert and update.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Human readable name used in log lines and error messages.
    const NAME: &'static str;

    fn id(&self) -> Option<i64>;

    fn set_id(&mut self, id: Option<i64>);
}

macro_rules! impl_entity {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl Entity for $ty {
                const NAME: &'static str = $name;

                fn id(&self) -> Option<i64> {
                    self.id
                }

                fn set_id(&mut self, id: Option<i64>) {
                    self.id = id;
                }
            }
        )*
    };
}

impl_entity!(
    Page => "page",
    NewsItem => "news item",
    Service => "service",
    Doctor => "doctor",
    MenuItem => "menu item",
    ContactGroup => "contact group",
    ContactDetail => "contact detail",
    Survey => "survey",
    Question => "question",
    QuestionOption => "question option",
    User => "user",
);

/// Simple acknowledgement body for deletes and logout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ack {
    pub ok: bool,
}

impl Ack {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

/// Configuration for the application
/// One week.
pub const MAX_SESSION_IDLE_MINUTES: i64 = 7 * 24 * 60;
/// One day.
pub const MAX_CACHE_TTL_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub bind_address: String,
    pub upload_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub cron_secret: Option<String>,
    pub settings_encryption_key: Option<String>,
    pub session_idle_minutes: i64,
    pub cache_ttl_secs: u64,
    pub max_upload_bytes: usize,
    pub scheduler_poll_secs: u64,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub cors_origin: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let config = Config {
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "clinic.db".to_string()),
            bind_address: std::env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            upload_dir: std::env::var("UPLOAD_DIR")
                .unwrap_or_else(|_| "uploads".to_string())
                .into(),
            backup_dir: std::env::var("BACKUP_DIR")
                .unwrap_or_else(|_| "backups".to_string())
                .into(),
            cron_secret: optional_var("CRON_SECRET"),
            settings_encryption_key: optional_var("SETTINGS_ENCRYPTION_KEY"),
            session_idle_minutes: parse_var("SESSION_IDLE_MINUTES", 30)?,
            cache_ttl_secs: parse_var("CACHE_TTL_SECS", 300)?,
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            scheduler_poll_secs: parse_var("SCHEDULER_POLL_SECS", 0)?,
            admin_username: optional_var("ADMIN_USERNAME"),
            admin_password: optional_var("ADMIN_PASSWORD"),
            cors_origin: optional_var("CORS_ORIGIN"),
        };

        config.check_limits()?;
        Ok(config)
    }

    /// Reject values the session store and caches cannot represent.
    pub fn check_limits(&self) -> anyhow::Result<()> {
        if !(1..=MAX_SESSION_IDLE_MINUTES).contains(&self.session_idle_minutes) {
            anyhow::bail!(
                "SESSION_IDLE_MINUTES must be between 1 and {MAX_SESSION_IDLE_MINUTES}"
            );
        }
        if self.cache_ttl_secs > MAX_CACHE_TTL_SECS {
            anyhow::bail!("CACHE_TTL_SECS must be at most {MAX_CACHE_TTL_SECS}");
        }
        Ok(())
    }

    /// Defaults suitable for tests: everything lives under `root`.
    pub fn for_root(root: &std::path::Path) -> Self {
        Config {
            database_path: root.join("clinic.db").to_string_lossy().to_string(),
            bind_address: "127.0.0.1:0".to_string(),
            upload_dir: root.join("uploads"),
            backup_dir: root.join("backups"),
            cron_secret: None,
            settings_encryption_key: None,
            session_idle_minutes: 30,
            cache_ttl_secs: 300,
            max_upload_bytes: 10 * 1024 * 1024,
            scheduler_poll_secs: 0,
            admin_username: None,
            admin_password: None,
            cors_origin: None,
        }
    }
}

fn optional_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid {key} value '{raw}': {e}")),
        Err(_) => Ok(default),
    }
}
