use crate::callback::Callbacks;
use crate::config::DynconfConfig;
use crate::defaults::provision;
use crate::dispatch::Dispatcher;
use crate::error::{DynconfError, DynconfErrorExt};
use crate::listener::{Listener, ListenerContext, ListenerKinds, Shutdown};
use dynconf_registry::Registry;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Brings the dynamic configuration pipeline up.
///
/// Defaults are seeded first; only when every default applied are the
/// configured listeners constructed and started.
#[derive(Debug)]
pub struct Dynconf {
    callbacks: Callbacks,
    kinds: ListenerKinds,
    config: DynconfConfig,
}

impl Dynconf {
    #[must_use]
    pub const fn new(registry: Registry, kinds: ListenerKinds, config: DynconfConfig) -> Self {
        Self { callbacks: Callbacks::new(registry), kinds, config }
    }

    /// Bindings to populate before [`Dynconf::start`].
    #[must_use]
    pub const fn callbacks(&self) -> &Callbacks {
        &self.callbacks
    }

    /// Seeds defaults and constructs every configured listener without starting it.
    ///
    /// # Errors
    /// Fails on the first failing default or invalid listener description.
    pub fn provision(&self) -> Result<Vec<Box<dyn Listener>>, DynconfError> {
        // Keep the per-key context set by the orchestrator.
        provision(&self.callbacks, &self.config.callbacks)
            .inspect_err(|err| error!(%err, "Provision callbacks failed"))?;

        self.config
            .listeners
            .iter()
            .map(|descriptor| self.kinds.build(descriptor))
            .collect::<Result<Vec<_>, _>>()
            .context("load listeners failed")
    }

    /// Provisions, then starts every listener on the current tokio runtime.
    ///
    /// If a listener fails to start, those already running are stopped.
    pub async fn start(&self) -> Result<RunningListeners, DynconfError> {
        let listeners = self.provision()?;
        let (trigger, shutdown) = Shutdown::channel();
        let dispatcher = Dispatcher::new(self.callbacks.clone());
        let mut running = RunningListeners { trigger, tasks: Vec::with_capacity(listeners.len()) };

        for listener in listeners {
            let kind = listener.kind();
            match listener.start(ListenerContext::new(dispatcher.clone(), shutdown.clone())) {
                Ok(task) => running.tasks.push((kind, task)),
                Err(err) => {
                    running.shutdown().await;
                    return Err(err).context(format!("start {kind} listener failed"));
                },
            }
        }

        info!(listeners = running.len(), "Dynconf started");
        Ok(running)
    }
}

/// Handles of started listeners.
#[derive(Debug)]
pub struct RunningListeners {
    trigger: watch::Sender<bool>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl RunningListeners {
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Signals shutdown and waits for every listener task to finish.
    pub async fn shutdown(self) {
        let _ = self.trigger.send(true);
        for (kind, task) in self.tasks {
            if let Err(err) = task.await {
                warn!(listener = kind, %err, "Listener task ended abnormally");
            }
        }
        info!("Dynconf stopped");
    }
}
