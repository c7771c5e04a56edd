//! Data-access layer.
//!
//! Thin per-entity helpers over a SQLite pool. Every content type implements
//! [`Repository`], which is the seam the admin flows and HTTP handlers are
//! written against.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::error::{AppError, Result};
use crate::models::Entity;

pub mod backups;
pub mod contacts;
pub mod content;
pub mod menu;
pub mod settings;
pub mod surveys;
pub mod users;

/// Tables included in backups, in restore order (parents before children).
pub const BACKUP_TABLES: &[&str] = &[
    "users",
    "pages",
    "news",
    "services",
    "doctors",
    "menu_items",
    "contact_groups",
    "contact_details",
    "surveys",
    "questions",
    "question_options",
    "survey_answers",
    "settings",
];

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT UNIQUE NOT NULL,
        password_hash TEXT NOT NULL,
        active BOOLEAN NOT NULL DEFAULT 1,
        role TEXT NOT NULL DEFAULT 'editor',
        created_at DATETIME NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS pages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        slug TEXT UNIQUE NOT NULL,
        content TEXT NOT NULL DEFAULT '',
        meta_title TEXT,
        meta_description TEXT,
        published BOOLEAN NOT NULL DEFAULT 0,
        updated_at DATETIME
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS news (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        slug TEXT UNIQUE NOT NULL,
        summary TEXT,
        content TEXT NOT NULL DEFAULT '',
        image_url TEXT,
        published BOOLEAN NOT NULL DEFAULT 0,
        published_at DATETIME
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS services (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        slug TEXT UNIQUE NOT NULL,
        description TEXT,
        content TEXT NOT NULL DEFAULT '',
        icon TEXT,
        position INTEGER NOT NULL DEFAULT 0,
        published BOOLEAN NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS doctors (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        full_name TEXT NOT NULL,
        specialty TEXT NOT NULL,
        bio TEXT,
        photo_url TEXT,
        position INTEGER NOT NULL DEFAULT 0,
        published BOOLEAN NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS menu_items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        url TEXT NOT NULL,
        parent_id INTEGER REFERENCES menu_items(id) ON DELETE CASCADE,
        position INTEGER NOT NULL,
        is_active BOOLEAN NOT NULL DEFAULT 1
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS contact_groups (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        position INTEGER NOT NULL DEFAULT 0,
        is_active BOOLEAN NOT NULL DEFAULT 1
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS contact_details (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        group_id INTEGER NOT NULL REFERENCES contact_groups(id) ON DELETE CASCADE,
        kind TEXT NOT NULL,
        value TEXT NOT NULL,
        label TEXT,
        position INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS surveys (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        description TEXT,
        is_active BOOLEAN NOT NULL DEFAULT 0,
        created_at DATETIME NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS questions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        survey_id INTEGER NOT NULL REFERENCES surveys(id) ON DELETE CASCADE,
        text TEXT NOT NULL,
        question_type TEXT NOT NULL,
        required BOOLEAN NOT NULL DEFAULT 0,
        position INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS question_options (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        question_id INTEGER NOT NULL REFERENCES questions(id) ON DELETE CASCADE,
        text TEXT NOT NULL,
        position INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS survey_answers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        survey_id INTEGER NOT NULL REFERENCES surveys(id) ON DELETE CASCADE,
        question_id INTEGER NOT NULL REFERENCES questions(id) ON DELETE CASCADE,
        response_id TEXT NOT NULL,
        option_id INTEGER REFERENCES question_options(id) ON DELETE SET NULL,
        answer_text TEXT,
        created_at DATETIME NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS settings (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at DATETIME
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS backups (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        filename TEXT NOT NULL,
        size_bytes INTEGER NOT NULL DEFAULT 0,
        status TEXT NOT NULL,
        error TEXT,
        created_at DATETIME NOT NULL,
        completed_at DATETIME
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_menu_items_parent ON menu_items(parent_id, position)",
    "CREATE INDEX IF NOT EXISTS idx_contact_details_group ON contact_details(group_id, position)",
    "CREATE INDEX IF NOT EXISTS idx_questions_survey ON questions(survey_id, position)",
    "CREATE INDEX IF NOT EXISTS idx_survey_answers_response ON survey_answers(survey_id, response_id)",
];

/// Connection pool plus the schema bootstrap.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if missing) the database at `database_path` and make sure
    /// every table exists.
    pub async fn connect(database_path: &str) -> Result<Self> {
        let connection_string = if database_path.starts_with("sqlite:") {
            database_path.to_string()
        } else {
            format!("sqlite:{}", database_path)
        };

        let options = SqliteConnectOptions::from_str(&connection_string)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await?;

        let database = Self { pool };
        database.create_schema().await?;
        info!("💾 Database ready at {}", database_path);

        Ok(database)
    }

    async fn create_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Row counts per backed-up table, for status reports.
    pub async fn table_counts(&self) -> Result<Vec<(String, i64)>> {
        let mut counts = Vec::with_capacity(BACKUP_TABLES.len());
        for table in BACKUP_TABLES {
            let row = sqlx::query(&format!("SELECT COUNT(*) AS count FROM {table}"))
                .fetch_one(&self.pool)
                .await?;
            counts.push((table.to_string(), row.get::<i64, _>("count")));
        }
        Ok(counts)
    }
}

/// Per-entity CRUD against the backend.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    async fn list(&self) -> Result<Vec<E>>;

    async fn get(&self, id: i64) -> Result<Option<E>>;

    async fn insert(&self, record: &E) -> Result<E>;

    async fn update(&self, record: &E) -> Result<E>;

    async fn delete(&self, id: i64) -> Result<()>;
}

/// Insert when the record has no id yet, update otherwise.
pub async fn upsert<E, R>(repo: &R, record: &E) -> Result<E>
where
    E: Entity,
    R: Repository<E> + ?Sized,
{
    match record.id() {
        Some(_) => repo.update(record).await,
        None => repo.insert(record).await,
    }
}

pub(crate) fn require_id<E: Entity>(record: &E) -> Result<i64> {
    record
        .id()
        .ok_or_else(|| AppError::validation(format!("{} has no id", E::NAME)))
}

pub(crate) async fn fetch_by_id<E>(pool: &SqlitePool, table: &str, id: i64) -> Result<Option<E>>
where
    E: for<'r> sqlx::FromRow<'r, SqliteRow> + Send + Unpin,
{
    let sql = format!("SELECT * FROM {table} WHERE id = ?");
    Ok(sqlx::query_as::<_, E>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

pub(crate) async fn delete_by_id(pool: &SqlitePool, table: &str, id: i64, what: &str) -> Result<()> {
    let sql = format!("DELETE FROM {table} WHERE id = ?");
    let result = sqlx::query(&sql).bind(id).execute(pool).await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found(format!("{what} {id}")));
    }
    Ok(())
}

/// Turn the `RETURNING *` row of an update into a result, treating "no row" as not found.
pub(crate) fn updated<E: Entity>(row: Option<E>, id: i64) -> Result<E> {
    row.ok_or_else(|| AppError::not_found(format!("{} {id}", E::NAME)))
}
