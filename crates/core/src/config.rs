use crate::defaults::CallbacksConfig;
use crate::error::{DynconfError, DynconfErrorExt};
use crate::listener::ListenerDescriptor;
use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Prefix of environment overrides, e.g. `DYNCONF__CALLBACKS__DEFAULTS`.
pub const ENV_PREFIX: &str = "DYNCONF";

/// The `dynconf` configuration section.
///
/// ```yaml
/// callbacks:
///   defaults:
///     - keys: ["g:d"]
///       default: { name: degrade, value: false }
/// listeners:
///   - listener: http
///     url: http://config.local/degrade
///     datas:
///       - { group: g, data_id: d, callbacks: ["g:d"] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynconfConfig {
    pub callbacks: CallbacksConfig,
    pub listeners: Vec<ListenerDescriptor>,
}

/// Loads `T` from a configuration file layered with environment overrides.
///
/// 1. **Base file**: any format the `config` crate recognises by extension
///    (TOML, JSON, YAML). Defaults to `dynconf` in the working directory.
/// 2. **Environment**: variables prefixed with `DYNCONF__`, nested with double
///    underscores (`DYNCONF__LOG__LEVEL` maps to `log.level`).
///
/// # Errors
/// [`DynconfError::Config`] if the file is missing or does not match `T`.
///
/// # Example
/// ```rust
/// use dynconf::config::{DynconfConfig, load_config};
///
/// let cfg: DynconfConfig = load_config(Some("config/local")).unwrap_or_default();
/// assert!(cfg.listeners.is_empty());
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, DynconfError>
where
    T: DeserializeOwned,
{
    let effective_path = path.map_or_else(|| PathBuf::from("dynconf"), |p| p.as_ref().to_path_buf());

    let builder = Config::builder()
        .add_source(File::from(effective_path.as_path()).required(true))
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    info!("Loading config from {}", effective_path.display());

    let config = builder
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")?;

    Ok(config)
}
