use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tracing::info;

use diary_reports::ReportEngine;
use diary_reports::collation::TitleCollator;
use diary_reports::config::ServerConfig;
use diary_reports::dates::{LocalCalendar, SystemClock};
use diary_reports::export::FsHttpPhotoSource;
use diary_reports::middleware::LoggingMiddleware;
use diary_reports::routes::{AppState, app};
use diary_reports::session::SessionResolver;
use diary_store::DiaryStore;
use diary_store::http_client::ReqwestDiaryStore;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Configure logging from env var `DIARY_LOG_LEVEL` (or fallback to `RUST_LOG`, default `info`).
    let log_env = std::env::var("DIARY_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());

    let env_filter = tracing_subscriber::EnvFilter::try_new(log_env.clone())
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .compact()
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(env_filter)
        .init();

    tracing::info!(%log_env, "diary_reports:http: log filter");

    let handle = PrometheusBuilder::new().install_recorder()?;

    let store_config = match diary_store::config::Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %e, "invalid store configuration; aborting startup");
            std::process::exit(1);
        }
    };
    let config = ServerConfig::from_env()?;

    let store: Arc<dyn DiaryStore> = Arc::new(LoggingMiddleware::new(
        ReqwestDiaryStore::from_config(&store_config)?,
    ));
    let calendar = LocalCalendar::new(Arc::new(SystemClock), config.timezone);
    let photos = FsHttpPhotoSource::new(config.uploads_dir.clone(), config.photo_timeout)?;

    if config.session_secret.is_none() && config.demo_user.is_none() {
        tracing::warn!("neither DIARY_SESSION_SECRET nor DIARY_DEMO_USER_ID is set; every report request will be unauthorized");
    }

    let state = Arc::new(AppState {
        engine: ReportEngine::new(store, calendar, TitleCollator),
        sessions: SessionResolver::new(config.session_secret.clone(), config.demo_user),
        photos: Arc::new(photos),
        metrics: Some(handle),
    });

    let router = app(state, config.request_timeout);
    let addr = config.address;
    info!(%addr, timezone = %config.timezone, "starting HTTP server");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to address {addr}: {e}");
            std::process::exit(1);
        }
    };

    let server = axum::serve(listener, router.into_make_service());
    if let Err(e) = server
        .with_graceful_shutdown(async {
            if let Err(e) = signal::ctrl_c().await {
                tracing::error!("failed to install ctrl+c handler: {e}");
            }
        })
        .await
    {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }

    Ok(())
}
