mod api_doc;
mod error;
mod extract;
mod handlers;
mod setup;
mod state;
mod telemetry;

use lingora_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize the application (database, storage, cache, services, routes)
    let (state, router) = setup::initialize_app(config.clone()).await?;

    // Serve until a shutdown signal arrives
    setup::server::start_server(&config, router).await?;

    // Let in-flight blob deletions finish before the process exits.
    state.cleanup_queue.shutdown().await;
    tracing::info!("Cleanup queue drained, exiting");

    Ok(())
}
