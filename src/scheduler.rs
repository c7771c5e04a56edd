//! Backup scheduling: next-run arithmetic, task dispatch and the optional
//! in-process poll loop.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Months, Utc};
use serde::Serialize;
use tracing::{error, info};

use crate::backup;
use crate::database::Database;
use crate::error::{AppError, Result};
use crate::models::{BackupFrequency, BackupRecord};
use crate::settings::{BackupSettings, BACKUP_LAST_RUN, BACKUP_NEXT_RUN};

/// When the next scheduled backup is due after `from`.
///
/// Monthly schedules move one calendar month and land on the last day of the
/// month when the day does not exist (Jan 31 -> Feb 28/29).
pub fn next_run(from: DateTime<Utc>, frequency: BackupFrequency) -> DateTime<Utc> {
    match frequency {
        BackupFrequency::Daily => from + Duration::days(1),
        BackupFrequency::Weekly => from + Duration::days(7),
        BackupFrequency::Monthly => from
            .checked_add_months(Months::new(1))
            .unwrap_or_else(|| from + Duration::days(30)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    Backup,
    Cleanup,
}

impl FromStr for Task {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "backup" => Ok(Task::Backup),
            "cleanup" => Ok(Task::Cleanup),
            other => Err(AppError::validation(format!(
                "Unknown task '{other}' (expected backup or cleanup)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskReport {
    pub task: Task,
    pub ran: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<BackupRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_run: Option<DateTime<Utc>>,
}

impl TaskReport {
    fn skipped(task: Task, message: impl Into<String>) -> Self {
        Self {
            task,
            ran: false,
            message: message.into(),
            backup: None,
            removed: None,
            next_run: None,
        }
    }
}

/// The side effects the scheduler needs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BackupJobs: Send + Sync {
    async fn settings(&self) -> Result<BackupSettings>;

    async fn run_backup(&self) -> Result<BackupRecord>;

    async fn cleanup(&self, retention_days: i64, now: DateTime<Utc>) -> Result<usize>;

    async fn record_run(&self, last_run: DateTime<Utc>, next_run: DateTime<Utc>) -> Result<()>;
}

/// [`BackupJobs`] backed by the database and the backup directory.
#[derive(Clone)]
pub struct DatabaseBackups {
    db: Database,
    dir: PathBuf,
}

impl DatabaseBackups {
    pub fn new(db: Database, dir: PathBuf) -> Self {
        Self { db, dir }
    }
}

#[async_trait]
impl BackupJobs for DatabaseBackups {
    async fn settings(&self) -> Result<BackupSettings> {
        BackupSettings::load(&self.db).await
    }

    async fn run_backup(&self) -> Result<BackupRecord> {
        backup::run_backup(&self.db, &self.dir).await
    }

    async fn cleanup(&self, retention_days: i64, now: DateTime<Utc>) -> Result<usize> {
        backup::cleanup(&self.db, &self.dir, retention_days, now).await
    }

    async fn record_run(&self, last_run: DateTime<Utc>, next_run: DateTime<Utc>) -> Result<()> {
        self.db
            .upsert_settings(&[
                (BACKUP_LAST_RUN.to_string(), last_run.to_rfc3339()),
                (BACKUP_NEXT_RUN.to_string(), next_run.to_rfc3339()),
            ])
            .await?;
        Ok(())
    }
}

/// Run one task. Backups run when enabled and due, or when `force` is set.
pub async fn run_task<J>(jobs: &J, task: Task, force: bool, now: DateTime<Utc>) -> Result<TaskReport>
where
    J: BackupJobs + ?Sized,
{
    let settings = jobs.settings().await?;

    match task {
        Task::Backup => {
            if !force && !settings.enabled {
                return Ok(TaskReport::skipped(task, "Scheduled backups are disabled"));
            }
            if let Some(due) = settings.next_run.filter(|due| !force && *due > now) {
                return Ok(TaskReport::skipped(
                    task,
                    format!("Next backup is due at {}", due.to_rfc3339()),
                ));
            }

            let record = jobs.run_backup().await?;
            let next = next_run(now, settings.frequency);
            jobs.record_run(now, next).await?;

            Ok(TaskReport {
                task,
                ran: true,
                message: format!("Backup {} completed", record.filename),
                backup: Some(record),
                removed: None,
                next_run: Some(next),
            })
        }
        Task::Cleanup => {
            let removed = jobs.cleanup(settings.retention_days, now).await?;
            Ok(TaskReport {
                task,
                ran: true,
                message: format!(
                    "Removed {removed} backups older than {} days",
                    settings.retention_days
                ),
                backup: None,
                removed: Some(removed),
                next_run: None,
            })
        }
    }
}

/// Check both tasks every `every` until the process exits.
pub async fn poll_loop<J>(jobs: Arc<J>, every: StdDuration)
where
    J: BackupJobs + ?Sized,
{
    info!("⏰ Backup scheduler polling every {:?}", every);
    let mut interval = tokio::time::interval(every);

    loop {
        interval.tick().await;
        for task in [Task::Backup, Task::Cleanup] {
            match run_task(jobs.as_ref(), task, false, Utc::now()).await {
                Ok(report) if report.ran => info!("{:?}: {}", task, report.message),
                Ok(_) => {}
                Err(e) => error!("Scheduled {:?} failed: {}", task, e),
            }
        }
    }
}
