// File: services/slotwise_backend/src/main.rs
use slotwise_backend::{build_app, AppState, MetricsState, RateLimitState, StartupError};
use slotwise_common::{logging, set_detailed_errors};
use slotwise_config::load_config;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    logging::init();

    if let Err(e) = run().await {
        error!("Slotwise backend stopped: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    let config = Arc::new(load_config()?);
    set_detailed_errors(!config.is_production());

    let (state, audit_writer) = AppState::new(config.clone()).await?;
    let metrics = MetricsState::new(config.metrics.enabled);
    let rate_limit = RateLimitState::from_settings(&config.rate_limit);
    rate_limit.spawn_cleanup(Duration::from_secs(config.rate_limit.window_secs.max(1)));
    let app = build_app(&state, metrics, rate_limit);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Starting server at http://{}", addr);
    info!("API endpoints available at http://{}/api", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // Dropping the state closes the audit queue so the writer can drain.
    drop(state);
    if audit_writer.await.is_err() {
        error!("Audit writer ended abnormally");
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Ctrl+C handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("SIGTERM handler unavailable: {}", e);
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
    info!("Shutdown signal received");
}
