pub mod error;

use once_cell::sync::Lazy;
use std::{fs, path::PathBuf, time::Duration};
use tracing::debug;

use crate::{
    models::{
        CatalogConfig, Config, ConfigMetadata, CorsConfig, EngineConfig,
        RunConfig, ServerConfig, StorageConfig,
        sources::{EnvConfig, FileConfig},
    },
    util::parse_limit,
    validation::{self, ConfigWarnings},
};
use error::ConfigLoadError;

pub const DEFAULT_PORT: u16 = 8888;
pub const DEFAULT_ENGINE_COMMAND: &str = "gnxi-test-runner";
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(60 * 60);

static DEFAULT_CONFIG_LOCATIONS: Lazy<Vec<PathBuf>> = Lazy::new(|| {
    vec![PathBuf::from("gnxi.toml"), PathBuf::from("config/gnxi.toml")]
});

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(
                |err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                },
            )?,
            None => {
                dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                })?
            }
        };

        let env_config = EnvConfig::gather();
        let (file_config, config_path) = self.load_file_config(&env_config)?;

        let (config, warnings) = compose_config(
            file_config,
            env_config,
            ConfigMetadata {
                config_path,
                env_file_loaded,
            },
        )?;

        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(
        &self,
        env_config: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let (path, explicit) = match (&self.options.config_path, &env_config.config_path)
        {
            (Some(path), _) | (None, Some(path)) => (path.clone(), true),
            (None, None) => match DEFAULT_CONFIG_LOCATIONS
                .iter()
                .find(|candidate| candidate.exists())
            {
                Some(path) => (path.clone(), false),
                None => return Ok((None, None)),
            },
        };

        if !path.exists() {
            if explicit {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            return Ok((None, None));
        }

        let contents =
            fs::read_to_string(&path).map_err(|source| ConfigLoadError::Io {
                path: path.clone(),
                source,
            })?;
        let file_config: FileConfig =
            toml::from_str(&contents).map_err(|source| ConfigLoadError::Parse {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), "configuration file parsed");

        Ok((Some(file_config), Some(path)))
    }
}

fn compose_config(
    file_config: Option<FileConfig>,
    env: EnvConfig,
    metadata: ConfigMetadata,
) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
    let mut warnings = ConfigWarnings::default();

    if metadata.config_path.is_none() {
        warnings.push_with_hint(
            "No gnxi.toml detected; using defaults and environment variables",
            "Pass --config or set GNXI_CONFIG_PATH to load a configuration file",
        );
    }

    let FileConfig {
        server: file_server,
        storage: file_storage,
        catalog: file_catalog,
        engine: file_engine,
        run: file_run,
        cors: file_cors,
    } = file_config.unwrap_or_default();

    let server = ServerConfig {
        host: env
            .server_host
            .or(file_server.host)
            .unwrap_or_else(|| "0.0.0.0".to_string()),
        port: env.server_port.or(file_server.port).unwrap_or(DEFAULT_PORT),
    };

    let storage = StorageConfig {
        state_file: env.state_file.or(file_storage.state_file),
        files_dir: env
            .files_dir
            .or(file_storage.files_dir)
            .unwrap_or_else(|| PathBuf::from("./files")),
    };

    let catalog = CatalogConfig {
        path: env.catalog_path.or(file_catalog.path),
    };

    let probe_timeout = resolve_limit(
        "engine.probe_timeout",
        env.probe_timeout.or(file_engine.probe_timeout),
        Some(DEFAULT_PROBE_TIMEOUT),
    )?
    .unwrap_or_default();

    let engine = EngineConfig {
        command: env
            .engine_command
            .or(file_engine.command)
            .unwrap_or_else(|| DEFAULT_ENGINE_COMMAND.to_string()),
        args: env.engine_args.or(file_engine.args).unwrap_or_default(),
        probe_timeout,
        test_timeout: resolve_limit(
            "engine.test_timeout",
            env.test_timeout.or(file_engine.test_timeout),
            Some(DEFAULT_TEST_TIMEOUT),
        )?,
    };

    let run = RunConfig {
        timeout: resolve_limit(
            "run.timeout",
            env.run_timeout.or(file_run.timeout),
            Some(DEFAULT_RUN_TIMEOUT),
        )?,
    };

    let cors = CorsConfig {
        allowed_origins: env
            .cors_allowed_origins
            .or(file_cors.allowed_origins)
            .unwrap_or_else(|| vec!["*".to_string()]),
        allowed_headers: env
            .cors_allowed_headers
            .or(file_cors.allowed_headers)
            .unwrap_or_else(|| vec!["*".to_string()]),
    };

    let mut config = Config {
        server,
        storage,
        catalog,
        engine,
        run,
        cors,
        metadata,
    };

    config
        .ensure_directories()
        .map_err(|err| ConfigLoadError::Filesystem { source: err })?;
    config
        .normalize_paths()
        .map_err(|err| ConfigLoadError::Filesystem { source: err })?;

    let guard_warnings = validation::apply_guard_rails(&config)?;
    warnings.extend(guard_warnings);

    Ok((config, warnings))
}

fn resolve_limit(
    key: &'static str,
    raw: Option<String>,
    default: Option<Duration>,
) -> Result<Option<Duration>, ConfigLoadError> {
    match raw {
        Some(value) => parse_limit(&value).map_err(|source| {
            ConfigLoadError::InvalidDuration { key, value, source }
        }),
        None => Ok(default),
    }
}
