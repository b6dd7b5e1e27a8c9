use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::util::parse_csv_var;

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub storage: FileStorageConfig,
    #[serde(default)]
    pub catalog: FileCatalogConfig,
    #[serde(default)]
    pub engine: FileEngineConfig,
    #[serde(default)]
    pub run: FileRunConfig,
    #[serde(default)]
    pub cors: FileCorsConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileStorageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileCatalogConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileEngineConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe_timeout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_timeout: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileRunConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileCorsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_origins: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_headers: Option<Vec<String>>,
}

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub server_host: Option<String>,
    pub server_port: Option<u16>,
    pub state_file: Option<PathBuf>,
    pub files_dir: Option<PathBuf>,
    pub catalog_path: Option<PathBuf>,
    pub engine_command: Option<String>,
    pub engine_args: Option<Vec<String>>,
    pub probe_timeout: Option<String>,
    pub test_timeout: Option<String>,
    pub run_timeout: Option<String>,
    pub cors_allowed_origins: Option<Vec<String>>,
    pub cors_allowed_headers: Option<Vec<String>>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self {
            config_path: non_empty_var("GNXI_CONFIG_PATH").map(PathBuf::from),
            server_host: non_empty_var("SERVER_HOST"),
            server_port: std::env::var("SERVER_PORT")
                .ok()
                .and_then(|s| s.trim().parse().ok()),
            state_file: non_empty_var("GNXI_STATE_FILE").map(PathBuf::from),
            files_dir: non_empty_var("GNXI_FILES_DIR").map(PathBuf::from),
            catalog_path: non_empty_var("GNXI_CATALOG_PATH").map(PathBuf::from),
            engine_command: non_empty_var("GNXI_ENGINE_COMMAND"),
            engine_args: parse_csv_var("GNXI_ENGINE_ARGS"),
            probe_timeout: non_empty_var("GNXI_PROBE_TIMEOUT"),
            test_timeout: non_empty_var("GNXI_TEST_TIMEOUT"),
            run_timeout: non_empty_var("GNXI_RUN_TIMEOUT"),
            cors_allowed_origins: parse_csv_var("CORS_ALLOWED_ORIGINS"),
            cors_allowed_headers: parse_csv_var("CORS_ALLOWED_HEADERS"),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
}
