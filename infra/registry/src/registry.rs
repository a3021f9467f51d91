use crate::error::RegistryError;
use crate::store::{ErasedValue, MemoryStore, SlotKey, SlotStore};
use std::any::Any;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

/// Default bound for reads that do not specify their own timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Generic, type-checked handle over a [`SlotStore`].
///
/// Cloning is cheap; clones share the same store. Construct one registry at
/// startup and hand it to every component that reads or writes slots.
#[derive(Debug, Clone)]
pub struct Registry {
    store: Arc<dyn SlotStore>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_store(MemoryStore::default())
    }
}

impl Registry {
    /// Creates a registry backed by a fresh [`MemoryStore`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry over a custom storage backend.
    pub fn with_store(store: impl SlotStore + 'static) -> Self {
        Self { store: Arc::new(store) }
    }

    /// Reads the `T` slot called `name`, waiting at most [`DEFAULT_TIMEOUT`].
    ///
    /// # Errors
    /// [`RegistryError::NotFound`] when the slot is unregistered,
    /// [`RegistryError::Timeout`] when the store is contended.
    pub fn get<T>(&self, name: &str) -> Result<T, RegistryError>
    where
        T: Any + Clone + Send + Sync,
    {
        self.get_within(name, DEFAULT_TIMEOUT)
    }

    /// Reads the `T` slot called `name`, waiting at most `timeout` for the store.
    pub fn get_within<T>(&self, name: &str, timeout: Duration) -> Result<T, RegistryError>
    where
        T: Any + Clone + Send + Sync,
    {
        let key = SlotKey::of::<T>(name.to_owned());
        let erased = self.store.get(&key, timeout)?;
        downcast(&key, &erased)
    }

    /// Reports whether the `T` slot called `name` is registered.
    pub fn contains<T>(&self, name: &str) -> Result<bool, RegistryError>
    where
        T: Any + Clone + Send + Sync,
    {
        match self.get::<T>(name) {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Creates the `T` slot called `name`.
    ///
    /// # Errors
    /// [`RegistryError::AlreadyExists`] if the slot is already populated.
    pub fn register<T>(&self, name: impl Into<Cow<'static, str>>, value: T) -> Result<(), RegistryError>
    where
        T: Any + Send + Sync,
    {
        self.store.register(SlotKey::of::<T>(name), Arc::new(value))
    }

    /// Replaces the value of an existing slot and returns the previous value.
    ///
    /// # Errors
    /// [`RegistryError::NotFound`] if the slot was never registered.
    pub fn replace<T>(&self, name: impl Into<Cow<'static, str>>, value: T) -> Result<T, RegistryError>
    where
        T: Any + Clone + Send + Sync,
    {
        let key = SlotKey::of::<T>(name);
        let previous = self.store.replace(key.clone(), Arc::new(value))?;
        downcast(&key, &previous)
    }

    /// Registers the slot if absent, otherwise replaces it, as one atomic step.
    ///
    /// Returns the value that was replaced, or `None` if this call created the slot.
    pub fn upsert<T>(
        &self,
        name: impl Into<Cow<'static, str>>,
        value: T,
    ) -> Result<Option<T>, RegistryError>
    where
        T: Any + Clone + Send + Sync,
    {
        let key = SlotKey::of::<T>(name);
        self.store
            .upsert(key.clone(), Arc::new(value))?
            .map(|previous| downcast(&key, &previous))
            .transpose()
    }

    /// Number of populated slots across all types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn downcast<T: Any + Clone>(key: &SlotKey, erased: &ErasedValue) -> Result<T, RegistryError> {
    erased.downcast_ref::<T>().cloned().ok_or_else(|| RegistryError::TypeMismatch {
        message: std::any::type_name::<T>().into(),
        context: Some(format!("slot {key} holds a different type").into()),
    })
}
