pub mod sources;

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub catalog: CatalogConfig,
    pub engine: EngineConfig,
    pub run: RunConfig,
    pub cors: CorsConfig,
    pub metadata: ConfigMetadata,
}

impl Config {
    pub fn ensure_directories(&self) -> anyhow::Result<()> {
        self.storage.ensure_directories()
    }

    pub fn normalize_paths(&mut self) -> anyhow::Result<()> {
        self.storage.normalize_paths()
    }

    pub fn files_dir(&self) -> &Path {
        &self.storage.files_dir
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// JSON document holding prompt sets and targets. `None` keeps them in
    /// memory only.
    pub state_file: Option<PathBuf>,
    pub files_dir: PathBuf,
}

impl StorageConfig {
    fn ensure_directories(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.files_dir)?;
        if let Some(parent) = self
            .state_file
            .as_deref()
            .and_then(Path::parent)
            .filter(|parent| !parent.as_os_str().is_empty())
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    fn normalize_paths(&mut self) -> anyhow::Result<()> {
        self.files_dir = std::fs::canonicalize(&self.files_dir)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct CatalogConfig {
    /// TOML or JSON catalog file. `None` uses the built-in catalog.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub command: String,
    pub args: Vec<String>,
    pub probe_timeout: Duration,
    pub test_timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_headers: Vec<String>,
}

impl CorsConfig {
    pub fn is_wildcard_origin(&self) -> bool {
        self.allowed_origins.iter().any(|origin| origin.trim() == "*")
    }

    pub fn is_wildcard_headers(&self) -> bool {
        self.allowed_headers.iter().any(|header| header.trim() == "*")
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}
