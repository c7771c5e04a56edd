pub mod admin;
pub mod auth;
pub mod backup;
pub mod cache;
pub mod database;
pub mod error;
pub mod export;
pub mod menu_order;
pub mod models;
pub mod scheduler;
pub mod secrets;
pub mod server;
pub mod settings;
pub mod validation;

pub use error::{AppError, Result};

use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "clinic_cms=info,tower_http=info";

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
