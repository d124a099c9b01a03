use ducklake_gateway::api::{router, AppState};
use ducklake_gateway::config::{CatalogConfig, Config};
use ducklake_gateway::pool::{DuckLakeBinder, LifecycleManager};

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env first so LOG_DIR and RUST_LOG can come from it
    let dotenv = dotenvy::dotenv();

    let config = Config::from_env()?;
    let log_dir = config.log_dir.clone();

    std::fs::create_dir_all(&log_dir).unwrap_or_else(|e| {
        eprintln!("Warning: Could not create log directory {}: {}", log_dir.display(), e);
    });

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "ducklake-gateway.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,ducklake_gateway=debug")),
        )
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .json()
                .with_writer(non_blocking),
        )
        .init();

    debug!("Logging initialized - log directory: {}", log_dir.display());
    if let Err(e) = dotenv {
        warn!("No .env file found or error loading it: {}", e);
    }

    let catalog = CatalogConfig::from_env()?;
    let socket_addr = config.socket_addr()?;

    info!("Starting DuckLake Gateway on {}", socket_addr);
    info!("Catalog: {}", catalog.redact(&catalog.attach_uri()));
    info!("Data path: {}", catalog.data_path);
    info!("Engine pool size: {}", config.engine_pool_size);
    info!("Query timeout: {:?}", config.query_timeout);

    let binder = Arc::new(DuckLakeBinder::new(catalog));
    let lifecycle = Arc::new(LifecycleManager::new(binder, config.engine_pool_size));

    if config.eager_init {
        let lifecycle = lifecycle.clone();
        tokio::spawn(async move {
            if let Err(e) = lifecycle.acquire().await {
                error!("Background initialization failed: {}", e);
            }
        });
    } else {
        info!("Eager initialization disabled; the first data request will attach the catalog");
    }

    let app = router(Arc::new(AppState::new(lifecycle, config)));

    let listener = tokio::net::TcpListener::bind(&socket_addr).await?;
    info!("Server listening on {}", socket_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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

    info!("Received shutdown signal");
}
