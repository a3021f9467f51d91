use crate::error::DynconfError;
use crate::slot::{SlotCallback, SlotValue};
use dynconf_registry::Registry;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Applies a raw pushed payload to whatever it is bound to.
///
/// Implementations are shared between listener tasks and may be invoked
/// concurrently, including for the same key.
pub trait Callback: fmt::Debug + Send + Sync {
    /// Applies `payload`, received from the source identified by `source_key`.
    fn apply(&self, source_key: &str, payload: &[u8]) -> Result<(), DynconfError>;
}

/// How callbacks are stored in and resolved from the [`Registry`].
pub type SharedCallback = Arc<dyn Callback>;

/// Adapts a closure into a [`Callback`].
///
/// # Example
/// ```rust
/// use dynconf::{Callback, CallbackFn};
///
/// let log = CallbackFn::new("log", |key: &str, payload: &[u8]| {
///     tracing::info!(source_key = key, bytes = payload.len(), "Payload observed");
///     Ok(())
/// });
/// log.apply("g:d", br#"{"name":"degrade","value":true}"#).unwrap();
/// ```
pub struct CallbackFn<F> {
    label: &'static str,
    f: F,
}

impl<F> CallbackFn<F>
where
    F: Fn(&str, &[u8]) -> Result<(), DynconfError> + Send + Sync,
{
    pub const fn new(label: &'static str, f: F) -> Self {
        Self { label, f }
    }
}

impl<F> fmt::Debug for CallbackFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackFn").field("label", &self.label).finish_non_exhaustive()
    }
}

impl<F> Callback for CallbackFn<F>
where
    F: Fn(&str, &[u8]) -> Result<(), DynconfError> + Send + Sync,
{
    fn apply(&self, source_key: &str, payload: &[u8]) -> Result<(), DynconfError> {
        (self.f)(source_key, payload)
    }
}

/// Key-to-callback bindings, kept in the shared [`Registry`].
///
/// Other subsystems bind callbacks at startup; the defaults orchestrator and
/// the listeners only resolve them.
#[derive(Debug, Clone, Default)]
pub struct Callbacks {
    registry: Registry,
}

impl Callbacks {
    #[must_use]
    pub const fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// The registry holding both the bindings and the slots.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Binds `callback` under `key`.
    ///
    /// # Errors
    /// [`DynconfError::RegistryWrite`] if the key is already bound.
    pub fn bind(
        &self,
        key: impl Into<Cow<'static, str>>,
        callback: impl Callback + 'static,
    ) -> Result<(), DynconfError> {
        self.bind_shared(key, Arc::new(callback))
    }

    pub fn bind_shared(
        &self,
        key: impl Into<Cow<'static, str>>,
        callback: SharedCallback,
    ) -> Result<(), DynconfError> {
        let key = key.into();
        debug!(callback = %key, "Binding callback");
        self.registry.register(key.clone(), callback).map_err(|source| {
            DynconfError::RegistryWrite { slot: key, source, context: Some("bind callback".into()) }
        })
    }

    /// Binds a [`SlotCallback`] for the `T` slot called `slot` under `key`.
    pub fn bind_slot<T: SlotValue>(
        &self,
        key: impl Into<Cow<'static, str>>,
        slot: impl Into<Cow<'static, str>>,
    ) -> Result<(), DynconfError> {
        self.bind(key, SlotCallback::<T>::new(slot, self.registry.clone()))
    }

    /// Resolves the callback bound under `key`.
    ///
    /// # Errors
    /// [`DynconfError::CallbackNotFound`] for unbound keys,
    /// [`DynconfError::Registry`] if the registry could not be read.
    pub fn resolve(&self, key: &str) -> Result<SharedCallback, DynconfError> {
        match self.registry.get::<SharedCallback>(key) {
            Ok(callback) => Ok(callback),
            Err(err) if err.is_not_found() => {
                Err(DynconfError::CallbackNotFound { key: key.to_owned().into(), context: None })
            },
            Err(source) => Err(DynconfError::Registry { source, context: Some(key.to_owned().into()) }),
        }
    }
}
