use std::sync::Arc;

use anyhow::Context;
use gnxi_config::Config;
use gnxi_core::{
    ConfigStore, FileStore, TestCatalog, TestEngine,
    engine::{ProcessEngineSettings, ProcessTestEngine},
    stores::{FsFileStore, JsonConfigStore},
};
use tracing::info;

use super::app_state::AppState;

/// Build the production [`AppState`] from loaded configuration.
pub async fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    let config_store: Arc<dyn ConfigStore> = match &config.storage.state_file {
        Some(path) => Arc::new(
            JsonConfigStore::open(path)
                .await
                .with_context(|| format!("failed to open state file {}", path.display()))?,
        ),
        None => Arc::new(JsonConfigStore::in_memory()),
    };

    let file_store: Arc<dyn FileStore> = Arc::new(
        FsFileStore::new(config.files_dir())
            .await
            .context("failed to prepare file store")?,
    );

    let catalog = match &config.catalog.path {
        Some(path) => TestCatalog::load_from_file(path)
            .with_context(|| format!("failed to load test catalog {}", path.display()))?,
        None => TestCatalog::builtin(),
    };
    info!(
        tests = catalog.len(),
        source = %config
            .catalog
            .path
            .as_deref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "built-in".to_string()),
        "test catalog loaded"
    );

    let engine: Arc<dyn TestEngine> =
        Arc::new(ProcessTestEngine::new(ProcessEngineSettings {
            command: config.engine.command.clone(),
            args: config.engine.args.clone(),
            probe_timeout: config.engine.probe_timeout,
        }));

    Ok(AppState::new(
        config,
        config_store,
        file_store,
        Arc::new(catalog),
        engine,
    ))
}
