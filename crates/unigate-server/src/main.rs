//! Unigate HTTP Server
//!
//! Serves the REST API over the configured document store.

use anyhow::Result;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use unigate_repository::Gateway;
use unigate_server::{app, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = ServerConfig::load()?;

    // Initialize tracing
    init_tracing(&config)?;
    info!("Loaded configuration: {:?}", config);

    // Connect to the store and provision every container
    let gateway = Gateway::connect(&config.store)
        .await?
        .with_concurrency(config.update_concurrency);
    if let Err(e) = gateway.init().await {
        error!("Failed to start server: {}", e);
        return Err(e.into());
    }
    info!("Database setup completed successfully");

    // Start server
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;
    info!(
        "✓ Server listening on http://{} in {} mode",
        addr, config.environment
    );
    info!("  Allowed CORS origins: {}", config.cors_allowed_origins.join(", "));
    info!("  Health check: http://{}/health", addr);

    axum::serve(listener, app(gateway.clone(), &config))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    gateway.close().await?;
    info!("Server stopped");

    Ok(())
}

/// Initialize tracing subscriber
fn init_tracing(config: &ServerConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "unigate_server={level},unigate_repository={level},unigate_store={level},unigate_core={level},tower_http=debug",
            level = config.log_level
        )
        .into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    result.map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("SIGINT received. Shutting down gracefully..."),
        _ = terminate => info!("SIGTERM received. Shutting down gracefully..."),
    }
}
