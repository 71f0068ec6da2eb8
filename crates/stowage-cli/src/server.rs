//! Server startup and lifecycle

use crate::{routes, AppState, GatewayConfig, StorageDefaults};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Run the gateway server
pub async fn run_server(config: GatewayConfig, defaults: StorageDefaults) -> anyhow::Result<()> {
    run_server_with_shutdown(config, defaults, std::future::pending()).await
}

/// Run server with graceful shutdown
pub async fn run_server_with_shutdown(
    config: GatewayConfig,
    defaults: StorageDefaults,
    shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    config.validate()?;
    let state = Arc::new(AppState::new(config.clone(), defaults)?);
    let app = routes::create_router(state);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr).await?;

    info!("Stowage gateway listening on http://{}", addr);
    info!(
        api = %config.api_path,
        proxy = %config.proxy_prefix(),
        "Action API and proxy ready"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Gateway shutdown complete");

    Ok(())
}

/// Resolves on Ctrl+C
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
