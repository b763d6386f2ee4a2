pub mod types;

use crate::error::ConfigError;
use crate::snapshot::catalog::MAX_LIVE_SERVICES;
use std::fs;
use std::path::{Path, PathBuf};

pub use types::{ClusterConfig, Config, PushConfig, ServerConfig, ServicesConfig};

const CONFIG_FILE_NAME: &str = "batteries.toml";
const GLOBAL_CONFIG_FILE_NAME: &str = ".batteries.toml";

/// Get the global config file path (~/.batteries.toml)
pub fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(GLOBAL_CONFIG_FILE_NAME))
}

/// Get the local config file path (./batteries.toml)
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE_NAME)
}

/// Load configuration from file or use defaults.
///
/// An explicit path must exist. Otherwise the local file is tried first,
/// then the global one; if neither exists the defaults are returned.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    if let Some(path) = explicit {
        return read_config_file(path);
    }

    let local = local_config_path(Path::new("."));
    if local.exists() {
        return read_config_file(&local);
    }

    if let Some(global) = global_config_path() {
        if global.exists() {
            return read_config_file(&global);
        }
    }

    log::debug!("No config file found, using defaults");
    Ok(Config::default())
}

/// Parse a single TOML config file.
pub fn read_config_file(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParsingFailed {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    log::info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Overlay environment variables (`PORT`, `KUBECONFIG`) onto `config`.
///
/// `lookup` is usually `|k| std::env::var(k).ok()`.
pub fn apply_env<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("PORT").filter(|p| !p.is_empty()) {
        config.server.port = port.parse().map_err(|_| ConfigError::InvalidValue {
            field: "PORT",
            message: format!("'{}' is not a valid port", port),
        })?;
    }

    if config.cluster.kubeconfig.is_none() {
        if let Some(path) = lookup("KUBECONFIG").filter(|p| !p.is_empty()) {
            config.cluster.kubeconfig = Some(PathBuf::from(path));
        }
    }

    Ok(())
}

/// Reject values that would make the server misbehave at runtime.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.push.interval_secs == 0 {
        return Err(ConfigError::InvalidValue {
            field: "push.interval_secs",
            message: "must be greater than zero".to_string(),
        });
    }
    if config.cluster.request_timeout_secs == 0 {
        return Err(ConfigError::InvalidValue {
            field: "cluster.request_timeout_secs",
            message: "must be greater than zero".to_string(),
        });
    }
    if config.cluster.max_concurrent_queries == 0 {
        return Err(ConfigError::InvalidValue {
            field: "cluster.max_concurrent_queries",
            message: "must be greater than zero".to_string(),
        });
    }
    if config.services.max_live > MAX_LIVE_SERVICES {
        return Err(ConfigError::InvalidValue {
            field: "services.max_live",
            message: format!(
                "{} exceeds the limit of {}",
                config.services.max_live, MAX_LIVE_SERVICES
            ),
        });
    }
    Ok(())
}
