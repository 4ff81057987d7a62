use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sikjipsa_api::background::quota_pruning;
use sikjipsa_api::config::ServerConfig;
use sikjipsa_api::engine::dispatcher::DiagnosisDispatcher;
use sikjipsa_api::middleware::rate_limit::UploadRateLimiter;
use sikjipsa_api::router::build_app_router;
use sikjipsa_api::state::AppState;
use sikjipsa_media::CloudinaryHost;
use sikjipsa_plantid::PlantIdApi;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sikjipsa_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");
    if !config.plant_id.is_configured() {
        tracing::warn!("PLANT_AI_API_KEY is not set; diagnosis uploads will be rejected");
    }
    if !config.cloudinary.is_configured() {
        tracing::warn!("Cloudinary credentials are not set; diagnosis uploads will be rejected");
    }

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = sikjipsa_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    sikjipsa_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    sikjipsa_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Diagnosis worker pool ---
    let diagnosis_queue = Arc::new(Notify::new());
    let background_cancel = CancellationToken::new();
    let shutdown_grace = Duration::from_secs(config.shutdown_timeout_secs);

    let dispatcher_handle = match PlantIdApi::new(&config.plant_id) {
        Ok(api) => {
            let dispatcher = Arc::new(DiagnosisDispatcher::new(
                pool.clone(),
                Arc::new(api),
                Arc::clone(&diagnosis_queue),
                config.dispatcher.clone(),
            ));
            let cancel = background_cancel.clone();
            Some(tokio::spawn(dispatcher.run(cancel, shutdown_grace)))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Diagnosis dispatcher not started");
            None
        }
    };

    // --- Upload quota ---
    let upload_limiter = Arc::new(UploadRateLimiter::per_hour(
        config.upload_rate_limit_per_hour,
    ));
    let pruning_handle = tokio::spawn(quota_pruning::run(
        Arc::clone(&upload_limiter),
        quota_pruning::PRUNE_INTERVAL,
        background_cancel.clone(),
    ));

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        image_host: Arc::new(CloudinaryHost::new(config.cloudinary.clone())),
        upload_limiter,
        diagnosis_queue,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    background_cancel.cancel();
    if let Some(handle) = dispatcher_handle {
        // The dispatcher bounds its own drain by the grace period.
        let _ = handle.await;
    }
    let _ = pruning_handle.await;

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
