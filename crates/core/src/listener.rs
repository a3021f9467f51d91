use crate::dispatch::{CallbackFailure, DispatchReport, Dispatcher};
use crate::error::DynconfError;
use fxhash::FxHashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::error;

/// Source key for a remote `(group, data_id)` pair.
#[must_use]
pub fn source_key(group: &str, data_id: &str) -> String {
    format!("{group}:{data_id}")
}

/// A remote entry a listener observes, and the callbacks it feeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub group: String,
    pub data_id: String,
    #[serde(default)]
    pub callbacks: Vec<String>,
}

impl Subscription {
    #[must_use]
    pub fn source_key(&self) -> String {
        source_key(&self.group, &self.data_id)
    }
}

/// One entry of the `listeners` configuration list.
///
/// `listener` selects the kind; every other field is handed to that kind's
/// constructor untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenerDescriptor {
    pub listener: String,
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

/// Resolves when the listener should stop.
#[derive(Debug, Clone)]
pub struct Shutdown(watch::Receiver<bool>);

impl Shutdown {
    /// Pair of trigger and receiver. Dropping the trigger also stops listeners.
    #[must_use]
    pub fn channel() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self(rx))
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.0.borrow()
    }

    /// Waits until shutdown is signalled or the trigger is dropped.
    pub async fn wait(&mut self) {
        let _ = self.0.wait_for(|stop| *stop).await;
    }
}

/// Everything a running listener needs from the core.
#[derive(Debug, Clone)]
pub struct ListenerContext {
    dispatcher: Dispatcher,
    shutdown: Shutdown,
}

impl ListenerContext {
    #[must_use]
    pub const fn new(dispatcher: Dispatcher, shutdown: Shutdown) -> Self {
        Self { dispatcher, shutdown }
    }

    #[must_use]
    pub const fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    #[must_use]
    pub fn shutdown(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Dispatches `payload` observed for `subscription` to its callbacks.
    ///
    /// Callbacks may block (timed registry locks, arbitrary closures), so the
    /// dispatch runs on the blocking pool and never holds a runtime worker.
    /// A panicking callback is reported as a failure for every bound key.
    pub async fn deliver(
        &self,
        subscription: &Subscription,
        payload: impl Into<Arc<[u8]>>,
    ) -> DispatchReport {
        let dispatcher = self.dispatcher.clone();
        let source_key = subscription.source_key();
        let keys = subscription.callbacks.clone();
        let payload = payload.into();

        let task = {
            let source_key = source_key.clone();
            let keys = keys.clone();
            tokio::task::spawn_blocking(move || dispatcher.dispatch(&source_key, &payload, &keys))
        };
        match task.await {
            Ok(report) => report,
            Err(err) => {
                error!(%source_key, %err, "Dispatch task panicked");
                let failures = keys
                    .into_iter()
                    .map(|callback| CallbackFailure {
                        error: DynconfError::Internal {
                            message: format!("dispatch task failed: {err}").into(),
                            context: Some(source_key.clone().into()),
                        },
                        callback,
                    })
                    .collect();
                DispatchReport { delivered: 0, failures }
            },
        }
    }
}

/// Observes a remote configuration source and dispatches its changes.
///
/// Construction happens at configuration time through [`ListenerKinds`];
/// `start` spawns the observation loop on the current tokio runtime and must
/// return promptly. The loop ends once the context's [`Shutdown`] fires.
pub trait Listener: fmt::Debug + Send {
    fn kind(&self) -> &'static str;

    fn start(self: Box<Self>, ctx: ListenerContext) -> Result<JoinHandle<()>, DynconfError>;
}

/// Builds a listener from the kind-specific part of its descriptor.
pub type ListenerFactory = Arc<dyn Fn(Value) -> Result<Box<dyn Listener>, DynconfError> + Send + Sync>;

/// Constructors for listener kinds, keyed by discriminator.
#[derive(Clone, Default)]
pub struct ListenerKinds {
    factories: FxHashMap<String, ListenerFactory>,
}

impl fmt::Debug for ListenerKinds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.factories.keys().collect();
        kinds.sort();
        f.debug_struct("ListenerKinds").field("kinds", &kinds).finish()
    }
}

impl ListenerKinds {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` for `kind`, replacing any previous constructor.
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(Value) -> Result<Box<dyn Listener>, DynconfError> + Send + Sync + 'static,
    {
        self.factories.insert(kind.into(), Arc::new(factory));
        self
    }

    /// Registers a kind whose options deserialize into `C`.
    pub fn register_typed<C, L, F>(&mut self, kind: &'static str, build: F) -> &mut Self
    where
        C: DeserializeOwned,
        L: Listener + 'static,
        F: Fn(C) -> Result<L, DynconfError> + Send + Sync + 'static,
    {
        self.register(kind, move |options| {
            let config = serde_json::from_value::<C>(options)
                .map_err(|source| DynconfError::ListenerConfig { kind: kind.into(), source, context: None })?;
            Ok(Box::new(build(config)?) as Box<dyn Listener>)
        })
    }

    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Constructs the listener `descriptor` describes.
    ///
    /// # Errors
    /// [`DynconfError::ListenerKind`] for unregistered kinds, or whatever the
    /// kind's constructor reports.
    pub fn build(&self, descriptor: &ListenerDescriptor) -> Result<Box<dyn Listener>, DynconfError> {
        let factory = self.factories.get(&descriptor.listener).ok_or_else(|| {
            DynconfError::ListenerKind { kind: descriptor.listener.clone().into(), context: None }
        })?;
        factory(Value::Object(descriptor.options.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct IdleConfig {
        datas: Vec<Subscription>,
    }

    #[derive(Debug)]
    struct Idle(IdleConfig);

    impl Listener for Idle {
        fn kind(&self) -> &'static str {
            "idle"
        }

        fn start(self: Box<Self>, ctx: ListenerContext) -> Result<JoinHandle<()>, DynconfError> {
            let mut shutdown = ctx.shutdown();
            tracing::trace!(subscriptions = self.0.datas.len(), "Idle listener started");
            Ok(tokio::spawn(async move { shutdown.wait().await }))
        }
    }

    fn kinds() -> ListenerKinds {
        let mut kinds = ListenerKinds::new();
        kinds.register_typed("idle", |config: IdleConfig| Ok(Idle(config)));
        kinds
    }

    fn descriptor(value: Value) -> ListenerDescriptor {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn descriptor_splits_discriminator_from_options() {
        let d = descriptor(json!({ "listener": "idle", "datas": [] }));
        assert_eq!(d.listener, "idle");
        assert_eq!(d.options.len(), 1);
    }

    #[test]
    fn builds_registered_kinds() {
        let d = descriptor(json!({
            "listener": "idle",
            "datas": [{ "group": "g", "data_id": "d", "callbacks": ["a", "b"] }],
        }));
        let listener = kinds().build(&d).unwrap();
        assert_eq!(listener.kind(), "idle");
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = kinds().build(&descriptor(json!({ "listener": "smoke" }))).unwrap_err();
        assert_eq!(err.to_string(), r#"Unknown listener kind "smoke""#);
    }

    #[test]
    fn bad_options_name_the_kind() {
        let err = kinds().build(&descriptor(json!({ "listener": "idle", "datas": 3 }))).unwrap_err();
        assert!(matches!(err, DynconfError::ListenerConfig { ref kind, .. } if kind == "idle"));
    }

    #[test]
    fn source_key_joins_group_and_id() {
        let sub = Subscription { group: "g".into(), data_id: "d".into(), callbacks: vec![] };
        assert_eq!(sub.source_key(), "g:d");
    }

    fn context_with(key: &'static str, callback: impl crate::Callback + 'static) -> ListenerContext {
        let callbacks = crate::Callbacks::default();
        callbacks.bind(key, callback).unwrap();
        ListenerContext::new(Dispatcher::new(callbacks), Shutdown::channel().1)
    }

    fn subscription(key: &str) -> Subscription {
        Subscription { group: "g".into(), data_id: "d".into(), callbacks: vec![key.to_owned()] }
    }

    #[tokio::test]
    async fn slow_callbacks_do_not_hold_the_runtime() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::time::{Duration, Instant};

        let started = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&started);
        let ctx = context_with(
            "slow",
            crate::CallbackFn::new("slow", move |_: &str, _: &[u8]| {
                flag.store(true, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(800));
                Ok(())
            }),
        );

        let delivery = tokio::spawn(async move { ctx.deliver(&subscription("slow"), b"x".as_slice()).await });
        while !started.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        let timer = Instant::now();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(timer.elapsed() < Duration::from_millis(400), "timer fired after {:?}", timer.elapsed());

        assert_eq!(delivery.await.unwrap().delivered, 1);
    }

    #[tokio::test]
    async fn panicking_callback_is_reported() {
        let ctx = context_with(
            "boom",
            crate::CallbackFn::new("boom", |_: &str, _: &[u8]| -> Result<(), DynconfError> {
                panic!("callback exploded")
            }),
        );

        let report = ctx.deliver(&subscription("boom"), b"x".as_slice()).await;
        assert_eq!(report.delivered, 0);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].callback, "boom");
        assert!(matches!(report.failures[0].error, DynconfError::Internal { .. }));
    }

    #[tokio::test]
    async fn started_listener_stops_on_shutdown() {
        let (trigger, shutdown) = Shutdown::channel();
        let d = descriptor(json!({ "listener": "idle", "datas": [] }));
        let handle = kinds()
            .build(&d)
            .unwrap()
            .start(ListenerContext::new(Dispatcher::default(), shutdown))
            .unwrap();
        trigger.send(true).unwrap();
        handle.await.unwrap();
    }
}
