use crate::callback::Callbacks;
use crate::error::{DynconfError, DynconfErrorExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

/// Callback section of the configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallbacksConfig {
    pub defaults: Vec<DefaultEntry>,
}

/// A default envelope applied once, at startup, to every listed callback key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultEntry {
    pub keys: Vec<String>,
    /// The envelope, `{ "name": .., "value": .. }`.
    pub default: Value,
}

/// Seeds every configured default before any listener runs.
///
/// Entries and keys are applied in configuration order. The first unknown key
/// or failing callback aborts seeding; slots seeded before it keep their value.
///
/// Returns how many callbacks were applied.
///
/// # Errors
/// [`DynconfError::Callback`] wrapping the unresolved key or the apply failure.
pub fn provision(callbacks: &Callbacks, config: &CallbacksConfig) -> Result<usize, DynconfError> {
    let mut applied = 0;
    for entry in &config.defaults {
        let payload = entry.default.to_string();
        for key in &entry.keys {
            let callback = callbacks
                .resolve(key)
                .map_err(|err| DynconfError::callback(key.clone(), err))
                .context("get callback failed")?;

            debug!(callback = %key, "Applying default value");
            callback
                .apply(key, payload.as_bytes())
                .map_err(|err| DynconfError::callback(key.clone(), err))
                .context("execute callback with default value failed")?;
            applied += 1;
        }
    }
    info!(applied, "Default values provisioned");
    Ok(applied)
}
