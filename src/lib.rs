pub mod api;
pub mod auth;
pub mod config;
pub mod core_state;
pub mod db;
pub mod diagnostics;
pub mod export;
pub mod inference;
pub mod models;

use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::{ConfigError, PortalConfig};
use crate::core_state::{CoreError, CoreState};
use crate::inference::ModelManager;

#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Server(#[from] api::ServerError),

    #[error("Cannot start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

pub fn run() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    if let Err(e) = serve() {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

/// Resolve configuration, load the models, prepare storage and serve the
/// portal until Ctrl-C.
pub fn serve() -> Result<(), RunError> {
    let config = PortalConfig::from_env()?;

    let models = Arc::new(ModelManager::load(&config.models_dir));
    let status = models.status();
    tracing::info!(
        fallback_mode = status.fallback_mode,
        loaded = status.loaded.len(),
        skipped = status.skipped.len(),
        "Model roster ready"
    );

    let bind_addr = config.bind_addr;
    let core = Arc::new(CoreState::new(config, models));
    core.initialize()?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let mut server = api::start_portal_server(core, bind_addr).await?;
        tracing::info!(addr = %server.session.server_addr, "NeuroSense portal listening");

        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Cannot listen for Ctrl-C: {e}");
        }
        server.shutdown();
        server.stopped().await;
        Ok(())
    })
}
