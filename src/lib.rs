pub mod api;
pub mod config;
pub mod confirmation;
pub mod core_state;
pub mod db;
pub mod models;
pub mod pipeline;
pub mod session;
pub mod store;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::core_state::{CoreError, CoreState};

/// Run the service until Ctrl-C.
///
/// The scanner's blocking HTTP clients must be built and dropped outside
/// the async runtime, so the core is created first and outlives it.
pub fn run() -> Result<(), CoreError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("Pantry Scan starting v{}", config::APP_VERSION);

    let config = AppConfig::from_env()?;
    pipeline::scan::cleanup_orphaned_uploads(&config.upload_dir);
    let core = Arc::new(CoreState::from_config(config)?);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(serve(Arc::clone(&core)));
    drop(runtime);
    drop(core);
    result
}

async fn serve(core: Arc<CoreState>) -> Result<(), CoreError> {
    let addr = core.config.bind_addr;
    let mut server = api::start_api_server_on(core, addr).await?;
    tracing::info!(addr = %server.local_addr(), "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Cannot listen for Ctrl-C, shutting down");
    }

    server.shutdown();
    server.wait().await?;
    Ok(())
}
