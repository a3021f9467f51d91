use dynconf::{DynconfError, Listener, ListenerContext, Subscription};
use fxhash::FxHashMap;
use parking_lot::RwLock;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

/// Latest content of one remote entry; `None` until something is published.
pub type Content = Option<Arc<[u8]>>;

/// A remote configuration store that pushes changes to its subscribers.
///
/// Implementations wrap the store's client; the returned receiver must yield
/// the current content first and every later change after it.
pub trait ConfigSource: fmt::Debug + Send + Sync {
    fn watch(&self, group: &str, data_id: &str) -> Result<watch::Receiver<Content>, DynconfError>;
}

/// In-process [`ConfigSource`]: content is published by calling [`MemorySource::publish`].
#[derive(Debug, Default)]
pub struct MemorySource {
    entries: RwLock<FxHashMap<(String, String), watch::Sender<Content>>>,
}

impl MemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the content of `(group, data_id)` and notifies its watchers.
    pub fn publish(&self, group: &str, data_id: &str, content: impl Into<Arc<[u8]>>) {
        let content = Some(content.into());
        let key = (group.to_owned(), data_id.to_owned());
        if let Some(sender) = self.entries.read().get(&key) {
            sender.send_replace(content);
            return;
        }
        self.entries.write().entry(key).or_insert_with(|| watch::channel(None).0).send_replace(content);
    }
}

impl ConfigSource for MemorySource {
    fn watch(&self, group: &str, data_id: &str) -> Result<watch::Receiver<Content>, DynconfError> {
        let key = (group.to_owned(), data_id.to_owned());
        if let Some(sender) = self.entries.read().get(&key) {
            return Ok(sender.subscribe());
        }
        Ok(self.entries.write().entry(key).or_insert_with(|| watch::channel(None).0).subscribe())
    }
}

/// Options of a push listener.
///
/// `server_config` and `client_config` are handed through to the store client
/// and are opaque here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushConfig {
    #[serde(default)]
    pub server_config: Option<String>,
    #[serde(default)]
    pub client_config: Option<String>,
    #[serde(default)]
    pub datas: Vec<Subscription>,
}

/// Dispatches every change a [`ConfigSource`] pushes for the configured entries.
#[derive(Debug)]
pub struct PushListener {
    kind: &'static str,
    source: Arc<dyn ConfigSource>,
    config: PushConfig,
}

impl PushListener {
    pub fn new(kind: &'static str, source: Arc<dyn ConfigSource>, config: PushConfig) -> Self {
        Self { kind, source, config }
    }

    /// Constructor for [`dynconf::ListenerKinds::register_typed`], bound to `source`.
    ///
    /// ```rust
    /// use dynconf::ListenerKinds;
    /// use dynconf_listeners::{MemorySource, PushListener};
    /// use std::sync::Arc;
    ///
    /// let mut kinds = ListenerKinds::new();
    /// kinds.register_typed("nacos", PushListener::factory("nacos", Arc::new(MemorySource::new())));
    /// assert!(kinds.contains("nacos"));
    /// ```
    pub fn factory(
        kind: &'static str,
        source: Arc<dyn ConfigSource>,
    ) -> impl Fn(PushConfig) -> Result<Self, DynconfError> + Send + Sync + 'static {
        move |config| Ok(Self::new(kind, Arc::clone(&source), config))
    }
}

impl Listener for PushListener {
    fn kind(&self) -> &'static str {
        self.kind
    }

    fn start(self: Box<Self>, ctx: ListenerContext) -> Result<JoinHandle<()>, DynconfError> {
        let Self { kind, source, config } = *self;
        debug!(
            listener = kind,
            server = ?config.server_config,
            client = ?config.client_config,
            "Subscribing to config source"
        );
        let watches = config
            .datas
            .into_iter()
            .map(|sub| Ok((source.watch(&sub.group, &sub.data_id)?, sub)))
            .collect::<Result<Vec<_>, DynconfError>>()?;

        Ok(tokio::spawn(async move {
            info!(listener = kind, subscriptions = watches.len(), "Push listener started");
            let mut tasks = JoinSet::new();
            for (receiver, subscription) in watches {
                tasks.spawn(observe(subscription, receiver, ctx.clone()));
            }
            while let Some(joined) = tasks.join_next().await {
                if let Err(err) = joined {
                    warn!(listener = kind, %err, "Subscription task ended abnormally");
                }
            }
            info!(listener = kind, "Push listener stopped");
        }))
    }
}

async fn observe(subscription: Subscription, mut receiver: watch::Receiver<Content>, ctx: ListenerContext) {
    let mut shutdown = ctx.shutdown();
    loop {
        let content = receiver.borrow_and_update().clone();
        if let Some(content) = content {
            debug!(source_key = %subscription.source_key(), bytes = content.len(), "Pushed content received");
            ctx.deliver(&subscription, content).await;
        }

        tokio::select! {
            () = shutdown.wait() => break,
            changed = receiver.changed() => if changed.is_err() { break },
        }
    }
}
