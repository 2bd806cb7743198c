use anyhow::Result;
use tracing::{error, info};
use vm_api::{create_app, AppState, Config};
use vm_logging::LogSettings;

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = vm_logging::init_subscriber(&LogSettings::from_env())?;

    info!("Starting vm-api service...");

    // Load configuration
    let config = Config::from_env();
    info!(
        bind_addr = %config.bind_addr,
        kubeconfig = ?config.kubeconfig,
        request_timeout_secs = config.request_timeout_secs,
        console_chunk_size = config.console_chunk_size,
        "Configuration loaded"
    );

    // One client for the process lifetime
    let client = vm_cluster::connect(config.kubeconfig.as_deref()).await?;
    info!(namespace = %client.default_namespace(), "Cluster client ready");

    let app = create_app(AppState::from_client(client, &config));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("vm-api stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal, stopping gracefully");
}
