//! SQL text dumps of the content tables.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeDelta, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};
use tracing::{error, info, warn};

use crate::database::{Database, BACKUP_TABLES};
use crate::error::{AppError, Result};
use crate::models::BackupRecord;

/// Render every table in [`BACKUP_TABLES`] as SQL statements.
pub async fn dump_sql(db: &Database, created_at: DateTime<Utc>) -> Result<String> {
    let mut out = String::new();
    let _ = writeln!(out, "-- Clinic CMS database backup");
    let _ = writeln!(out, "-- Created: {}", created_at.to_rfc3339());
    let _ = writeln!(out, "-- Tables: {}", BACKUP_TABLES.join(", "));

    for table in BACKUP_TABLES {
        let rows = sqlx::query(&format!("SELECT * FROM {table} ORDER BY rowid"))
            .fetch_all(db.pool())
            .await?;

        let _ = writeln!(out);
        let _ = writeln!(out, "TRUNCATE TABLE {table};");
        for row in &rows {
            out.push_str(&insert_statement(table, row)?);
            out.push('\n');
        }
    }

    Ok(out)
}

fn insert_statement(table: &str, row: &SqliteRow) -> Result<String> {
    let columns: Vec<&str> = row.columns().iter().map(|c| c.name()).collect();
    let mut values = Vec::with_capacity(columns.len());
    for index in 0..columns.len() {
        values.push(sql_literal(row, index)?);
    }

    Ok(format!(
        "INSERT INTO {table} ({}) VALUES ({});",
        columns.join(", "),
        values.join(", ")
    ))
}

fn sql_literal(row: &SqliteRow, index: usize) -> Result<String> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok("NULL".to_string());
    }

    let type_name = raw.type_info().name().to_ascii_uppercase();
    Ok(match type_name.as_str() {
        "INTEGER" | "BOOLEAN" => row.try_get::<i64, _>(index)?.to_string(),
        "REAL" => row.try_get::<f64, _>(index)?.to_string(),
        "BLOB" => format!("X'{}'", hex::encode(row.try_get::<Vec<u8>, _>(index)?)),
        _ => quote(&row.try_get::<String, _>(index)?),
    })
}

/// Single-quoted SQL string literal.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

pub fn backup_filename(at: DateTime<Utc>) -> String {
    format!("backup-{}.sql", at.format("%Y%m%d-%H%M%S-%3f"))
}

/// Location of a stored backup, refusing names that would leave `dir`.
pub fn backup_path(dir: &Path, record: &BackupRecord) -> Result<PathBuf> {
    let name = &record.filename;
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(AppError::Internal(format!("invalid backup filename '{name}'")));
    }
    Ok(dir.join(name))
}

/// Write a new dump into `dir` and track it in the backups table.
///
/// The record is created as pending first; it ends up completed with the file
/// size, or failed with the error text.
pub async fn run_backup(db: &Database, dir: &Path) -> Result<BackupRecord> {
    let now = Utc::now();
    let record = db.create_backup_record(&backup_filename(now)).await?;
    info!("💾 Starting backup {}", record.filename);

    match write_dump(db, dir, &record, now).await {
        Ok(size) => {
            let record = db.mark_backup_completed(record.id, size).await?;
            info!("✅ Backup {} completed ({} bytes)", record.filename, size);
            Ok(record)
        }
        Err(e) => {
            error!("❌ Backup {} failed: {}", record.filename, e);
            db.mark_backup_failed(record.id, &e.to_string()).await?;
            Err(e)
        }
    }
}

async fn write_dump(
    db: &Database,
    dir: &Path,
    record: &BackupRecord,
    now: DateTime<Utc>,
) -> Result<i64> {
    let sql = dump_sql(db, now).await?;
    tokio::fs::create_dir_all(dir).await?;
    let path = backup_path(dir, record)?;
    tokio::fs::write(&path, sql.as_bytes()).await?;
    Ok(sql.len() as i64)
}

/// Delete backups (files and records) older than `retention_days`.
pub async fn cleanup(
    db: &Database,
    dir: &Path,
    retention_days: i64,
    now: DateTime<Utc>,
) -> Result<usize> {
    let cutoff = TimeDelta::try_days(retention_days)
        .and_then(|age| now.checked_sub_signed(age))
        .ok_or_else(|| {
            AppError::validation(format!("Retention of {retention_days} days is out of range"))
        })?;
    let expired = db.backups_created_before(cutoff).await?;

    for record in &expired {
        match backup_path(dir, record) {
            Ok(path) => match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            },
            Err(e) => warn!("Skipping file removal for backup {}: {}", record.id, e),
        }
        db.delete_backup_record(record.id).await?;
    }

    if !expired.is_empty() {
        info!("🧹 Removed {} backups older than {} days", expired.len(), retention_days);
    }
    Ok(expired.len())
}
