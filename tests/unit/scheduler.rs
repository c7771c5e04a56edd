//! Scheduler arithmetic and task dispatch against an in-memory job runner

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use pretty_assertions::assert_eq;

use clinic_cms::models::{BackupFrequency, BackupRecord, BackupStatus};
use clinic_cms::scheduler::{next_run, run_task, BackupJobs, Task};
use clinic_cms::settings::BackupSettings;
use clinic_cms::Result;

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 3, 0, 0).single().expect("valid date")
}

#[derive(Default)]
struct RecordingJobs {
    settings: Option<BackupSettings>,
    backups: Mutex<usize>,
    runs: Mutex<Vec<(DateTime<Utc>, DateTime<Utc>)>>,
    cleanups: Mutex<Vec<i64>>,
}

impl RecordingJobs {
    fn with(settings: BackupSettings) -> Self {
        Self {
            settings: Some(settings),
            ..Default::default()
        }
    }
}

#[async_trait]
impl BackupJobs for RecordingJobs {
    async fn settings(&self) -> Result<BackupSettings> {
        Ok(self.settings.clone().unwrap_or(BackupSettings {
            enabled: false,
            frequency: BackupFrequency::Daily,
            retention_days: 30,
            last_run: None,
            next_run: None,
        }))
    }

    async fn run_backup(&self) -> Result<BackupRecord> {
        *self.backups.lock().unwrap() += 1;
        Ok(BackupRecord {
            id: 1,
            filename: "backup-20240101-030000-000.sql".to_string(),
            size_bytes: 128,
            status: BackupStatus::Completed,
            error: None,
            created_at: at(2024, 1, 1),
            completed_at: Some(at(2024, 1, 1)),
        })
    }

    async fn cleanup(&self, retention_days: i64, _now: DateTime<Utc>) -> Result<usize> {
        self.cleanups.lock().unwrap().push(retention_days);
        Ok(2)
    }

    async fn record_run(&self, last_run: DateTime<Utc>, next_run: DateTime<Utc>) -> Result<()> {
        self.runs.lock().unwrap().push((last_run, next_run));
        Ok(())
    }
}

fn enabled(frequency: BackupFrequency, next: Option<DateTime<Utc>>) -> BackupSettings {
    BackupSettings {
        enabled: true,
        frequency,
        retention_days: 14,
        last_run: None,
        next_run: next,
    }
}

#[test]
fn test_next_run_by_frequency() {
    let from = at(2024, 3, 10);
    assert_eq!(next_run(from, BackupFrequency::Daily), at(2024, 3, 11));
    assert_eq!(next_run(from, BackupFrequency::Weekly), at(2024, 3, 17));
    assert_eq!(next_run(from, BackupFrequency::Monthly), at(2024, 4, 10));
    // Month end clamps.
    assert_eq!(next_run(at(2023, 1, 31), BackupFrequency::Monthly), at(2023, 2, 28));
    assert_eq!(next_run(at(2024, 12, 31), BackupFrequency::Monthly), at(2025, 1, 31));
}

#[test]
fn test_task_names_parse() {
    assert_eq!("backup".parse::<Task>().ok(), Some(Task::Backup));
    assert_eq!(" Cleanup ".parse::<Task>().ok(), Some(Task::Cleanup));
    assert!("vacuum".parse::<Task>().is_err());
}

#[tokio::test]
async fn test_backup_skipped_when_disabled_unless_forced() {
    let jobs = RecordingJobs::default();
    let now = at(2024, 5, 1);

    let report = run_task(&jobs, Task::Backup, false, now).await.unwrap();
    assert!(!report.ran);
    assert_eq!(*jobs.backups.lock().unwrap(), 0);

    let report = run_task(&jobs, Task::Backup, true, now).await.unwrap();
    assert!(report.ran);
    assert_eq!(report.next_run, Some(at(2024, 5, 2)));
    assert_eq!(*jobs.backups.lock().unwrap(), 1);
    assert_eq!(jobs.runs.lock().unwrap().as_slice(), &[(now, at(2024, 5, 2))]);
}

#[tokio::test]
async fn test_backup_waits_until_due() {
    let now = at(2024, 5, 1);
    let jobs = RecordingJobs::with(enabled(BackupFrequency::Weekly, Some(at(2024, 5, 3))));

    let report = run_task(&jobs, Task::Backup, false, now).await.unwrap();
    assert!(!report.ran);
    assert!(report.message.contains("due"));

    let due = RecordingJobs::with(enabled(BackupFrequency::Weekly, Some(at(2024, 4, 30))));
    let report = run_task(&due, Task::Backup, false, now).await.unwrap();
    assert!(report.ran);
    assert_eq!(report.next_run, Some(at(2024, 5, 8)));
}

#[tokio::test]
async fn test_cleanup_uses_retention_setting() {
    let jobs = RecordingJobs::with(enabled(BackupFrequency::Daily, None));

    let report = run_task(&jobs, Task::Cleanup, false, at(2024, 5, 1)).await.unwrap();
    assert!(report.ran);
    assert_eq!(report.removed, Some(2));
    assert_eq!(jobs.cleanups.lock().unwrap().as_slice(), &[14]);
}
