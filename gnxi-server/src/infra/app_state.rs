use std::{fmt, sync::Arc};

use gnxi_config::Config;
use gnxi_core::{
    ConfigStore, ConfigurationResolver, ExecutorSettings, FileStore, RunExecutor,
    TestCatalog, TestEngine,
};

use super::run_control::RunControlPlane;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub config_store: Arc<dyn ConfigStore>,
    pub file_store: Arc<dyn FileStore>,
    pub catalog: Arc<TestCatalog>,
    pub run_control: RunControlPlane,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("catalog_tests", &self.catalog.len())
            .field("run_control", &self.run_control)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Wire the run lifecycle around the given collaborators.
    pub fn new(
        config: Arc<Config>,
        config_store: Arc<dyn ConfigStore>,
        file_store: Arc<dyn FileStore>,
        catalog: Arc<TestCatalog>,
        engine: Arc<dyn TestEngine>,
    ) -> Self {
        let resolver = ConfigurationResolver::new(
            Arc::clone(&config_store),
            Arc::clone(&file_store),
            Arc::clone(&catalog),
        );
        let executor = RunExecutor::new(
            engine,
            ExecutorSettings {
                test_timeout: config.engine.test_timeout,
                run_timeout: config.run.timeout,
            },
        );

        Self {
            config,
            config_store,
            file_store,
            catalog,
            run_control: RunControlPlane::new(resolver, executor),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_store(&self) -> &Arc<dyn ConfigStore> {
        &self.config_store
    }

    pub fn file_store(&self) -> &Arc<dyn FileStore> {
        &self.file_store
    }

    pub fn catalog(&self) -> &TestCatalog {
        &self.catalog
    }

    pub fn run_control(&self) -> &RunControlPlane {
        &self.run_control
    }
}
