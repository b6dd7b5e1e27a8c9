use thiserror::Error;

use crate::models::Config;

#[derive(Debug, Error)]
pub enum ConfigGuardRailError {
    #[error("engine command must not be empty")]
    EmptyEngineCommand,
    #[error("server port must not be 0")]
    ZeroPort,
    #[error("engine probe timeout must be greater than zero")]
    ZeroProbeTimeout,
    #[error("invalid CORS configuration: {reason}")]
    InvalidCorsConfig { reason: String },
}

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }
}

pub fn apply_guard_rails(
    config: &Config,
) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();

    if config.engine.command.trim().is_empty() {
        return Err(ConfigGuardRailError::EmptyEngineCommand);
    }
    if config.server.port == 0 {
        return Err(ConfigGuardRailError::ZeroPort);
    }
    if config.engine.probe_timeout.is_zero() {
        return Err(ConfigGuardRailError::ZeroProbeTimeout);
    }

    if config.cors.allowed_origins.is_empty() {
        return Err(ConfigGuardRailError::InvalidCorsConfig {
            reason: "allowed_origins must list at least one origin or '*'".into(),
        });
    }
    if config.cors.is_wildcard_origin() && config.cors.allowed_origins.len() > 1 {
        return Err(ConfigGuardRailError::InvalidCorsConfig {
            reason: "'*' cannot be combined with explicit origins".into(),
        });
    }

    if config.storage.state_file.is_none() {
        warnings.push_with_hint(
            "No state file configured; prompt sets and targets are kept in memory only",
            "Set GNXI_STATE_FILE or [storage] state_file to persist them across restarts",
        );
    }

    if config.run.timeout.is_none() {
        warnings.push_with_hint(
            "Run timeout disabled; a stuck test engine keeps the run slot busy until restart",
            "Set GNXI_RUN_TIMEOUT or [run] timeout to bound a run",
        );
    }

    Ok(warnings)
}
