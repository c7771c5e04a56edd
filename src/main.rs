use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use clinic_cms::auth::bootstrap_admin;
use clinic_cms::database::Database;
use clinic_cms::models::Config;
use clinic_cms::scheduler::poll_loop;
use clinic_cms::server::{start_server, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    clinic_cms::init_logging();
    info!("🏥 Starting Clinic CMS");

    let config = Config::from_env().context("Failed to load configuration")?;
    let database = Database::connect(&config.database_path)
        .await
        .with_context(|| format!("Failed to open database at {}", config.database_path))?;

    bootstrap_admin(&database, &config).await?;

    let poll_secs = config.scheduler_poll_secs;
    let state = AppState::new(database, config)?;

    if poll_secs > 0 {
        tokio::spawn(poll_loop(state.backups.clone(), Duration::from_secs(poll_secs)));
    } else {
        info!("In-process backup scheduler disabled; use /api/scheduler");
    }

    start_server(state).await
}
