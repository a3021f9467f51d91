//! # Dynconf Agent
//!
//! A standalone process that keeps JSON-valued slots in sync with the
//! configured listeners and logs every payload bound to a logging key.
//!
//! ## Example
//! ```no_run
//! use dynconf_agent::{Agent, AgentConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Agent::new(AgentConfig::default())?
//!         .run(async { tokio::signal::ctrl_c().await.unwrap_or_default() })
//!         .await
//! }
//! ```

use anyhow::{Context, Result};
use dynconf::config::DynconfConfig;
use dynconf::{CallbackFn, Dynconf, ListenerKinds, Registry};
use dynconf_logger::LogSettings;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use tracing::info;

/// Agent configuration file.
///
/// ```toml
/// log_keys = ["g:d"]
///
/// [[slots]]
/// key = "g:d"
/// name = "degrade"
///
/// [dynconf]
/// listeners = [{ listener = "http", url = "http://config.local/degrade", datas = [{ group = "g", data_id = "d", callbacks = ["g:d", "log:g:d"] }] }]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub log: LogSettings,
    pub slots: Vec<SlotBinding>,
    /// Keys bound to a callback that only logs what it receives.
    pub log_keys: Vec<String>,
    pub dynconf: DynconfConfig,
}

/// Binds a JSON-valued slot to a callback key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotBinding {
    pub key: String,
    pub name: String,
}

/// Callback bindings plus the pipeline that feeds them.
#[derive(Debug)]
pub struct Agent {
    registry: Registry,
    dynconf: Dynconf,
}

impl Agent {
    /// Binds every configured slot and logging key. Nothing runs until [`Agent::run`].
    ///
    /// # Errors
    /// Returns an error if a key is bound twice.
    pub fn new(cfg: AgentConfig) -> Result<Self> {
        let registry = Registry::new();
        let mut kinds = ListenerKinds::new();
        dynconf_listeners::register_builtin(&mut kinds);

        let dynconf = Dynconf::new(registry.clone(), kinds, cfg.dynconf);
        let callbacks = dynconf.callbacks();

        for slot in cfg.slots {
            callbacks
                .bind_slot::<Value>(slot.key.clone(), slot.name.clone())
                .with_context(|| format!("Failed to bind slot {} to {}", slot.name, slot.key))?;
        }
        for key in cfg.log_keys {
            let label = key.clone();
            callbacks
                .bind(key.clone(), CallbackFn::new("log", move |source_key: &str, payload: &[u8]| {
                    info!(
                        callback = %label,
                        source_key,
                        payload = %String::from_utf8_lossy(payload),
                        "Payload received"
                    );
                    Ok(())
                }))
                .with_context(|| format!("Failed to bind log callback {key}"))?;
        }

        Ok(Self { registry, dynconf })
    }

    /// The registry holding the agent's slots.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Seeds defaults, starts the listeners and runs until `shutdown` resolves.
    ///
    /// # Errors
    /// Returns an error if a default cannot be applied or a listener cannot start.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let running = self.dynconf.start().await.context("Failed to start dynconf")?;
        info!(listeners = running.len(), "Agent running");

        shutdown.await;

        info!("Shutdown signal received, stopping listeners");
        running.shutdown().await;
        Ok(())
    }
}
