//! Media uploads and backup downloads.

use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::AppState;
use crate::backup::{backup_path, run_backup};
use crate::error::{AppError, Result};
use crate::models::{BackupRecord, BackupStatus};

const UPLOAD_FIELD: &str = "file";
/// Served inline from the site origin, so nothing that can carry script (svg, html).
const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "pdf"];

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

/// Lowercased extension of `filename` if it is one we serve.
fn allowed_extension(filename: &str) -> Option<String> {
    let (_, extension) = filename.rsplit_once('.')?;
    let extension = extension.to_ascii_lowercase();
    ALLOWED_EXTENSIONS
        .contains(&extension.as_str())
        .then_some(extension)
}

pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(e.to_string()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let original = field.file_name().unwrap_or_default().to_string();
        let extension = allowed_extension(&original).ok_or_else(|| {
            AppError::validation(format!(
                "Unsupported file type (allowed: {})",
                ALLOWED_EXTENSIONS.join(", ")
            ))
        })?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::validation(e.to_string()))?;
        if bytes.is_empty() {
            return Err(AppError::validation("Uploaded file is empty"));
        }

        let stored = format!("{}.{}", Uuid::new_v4(), extension);
        tokio::fs::create_dir_all(&state.config.upload_dir).await?;
        tokio::fs::write(state.config.upload_dir.join(&stored), &bytes).await?;
        info!("📎 Stored upload {} as {} ({} bytes)", original, stored, bytes.len());

        return Ok((
            StatusCode::CREATED,
            Json(UploadResponse {
                url: format!("/uploads/{stored}"),
            }),
        ));
    }

    Err(AppError::validation(format!(
        "Multipart field '{UPLOAD_FIELD}' is required"
    )))
}

pub async fn list_backups(State(state): State<AppState>) -> Result<Json<Vec<BackupRecord>>> {
    Ok(Json(state.db.list_backups().await?))
}

/// Manual backup, regardless of the schedule.
pub async fn create_backup(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<BackupRecord>)> {
    let record = run_backup(&state.db, &state.config.backup_dir).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn download_backup(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response> {
    let record = state
        .db
        .get_backup(id)
        .await?
        .filter(|record| record.status == BackupStatus::Completed)
        .ok_or_else(|| AppError::not_found(format!("backup {id}")))?;

    let body = tokio::fs::read(backup_path(&state.config.backup_dir, &record)?)
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AppError::not_found(format!("backup file {}", record.filename)),
            _ => AppError::Io(e),
        })?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/sql".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", record.filename),
            ),
        ],
        body,
    )
        .into_response())
}
