//! HTTP surface: admin API behind a session, public read API, and the
//! bearer-token scheduler trigger.

use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal::{self, ctrl_c};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::models::{Doctor, NewsItem, Page, Service};

pub mod admin;
pub mod auth;
pub mod contacts;
pub mod crud;
pub mod files;
pub mod menu;
pub mod public;
pub mod scheduler;
pub mod settings;
pub mod state;
pub mod surveys;
pub mod users;

pub use state::AppState;

/// Full application router.
pub fn router(state: AppState) -> Router {
    let max_upload = state.config.max_upload_bytes;

    let admin = Router::new()
        .route("/api/admin/bootstrap", get(admin::bootstrap))
        .nest("/api/pages", crud::routes::<Page>())
        .nest("/api/news", crud::routes::<NewsItem>())
        .nest("/api/services", crud::routes::<Service>())
        .nest("/api/doctors", crud::routes::<Doctor>())
        .nest("/api/users", users::routes())
        .nest("/api/menu", menu::routes())
        .merge(contacts::routes())
        .merge(surveys::routes())
        .merge(settings::routes())
        .route(
            "/api/upload",
            post(files::upload)
                .layer::<_, std::convert::Infallible>(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(max_upload)),
        )
        .route("/api/backups", get(files::list_backups).post(files::create_backup))
        .route("/api/backups/:id/download", get(files::download_backup))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ));

    let open = Router::new()
        .route("/api/auth/status", get(auth::status))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/scheduler", get(scheduler::trigger).post(scheduler::trigger))
        .nest("/api/public", public::routes());

    Router::new()
        .merge(open)
        .merge(admin)
        .nest_service("/uploads", ServeDir::new(&state.config.upload_dir))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(state.config.cors_origin.as_deref()))
        .with_state(state)
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    match origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => layer
            .allow_origin(AllowOrigin::exact(origin))
            .allow_credentials(true),
        Some(Err(e)) => {
            warn!("Ignoring invalid CORS_ORIGIN: {}", e);
            layer
        }
        None => layer,
    }
}

/// Bind and serve until Ctrl+C or SIGTERM.
pub async fn start_server(state: AppState) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(&state.config.upload_dir).await?;
    tokio::fs::create_dir_all(&state.config.backup_dir).await?;

    let address = state.config.bind_address.clone();
    let app = router(state);

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("🚀 Server running on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
