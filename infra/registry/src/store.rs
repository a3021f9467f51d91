use crate::error::RegistryError;
use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// How long a write waits for the store lock by default.
const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(3);

/// A type-erased slot value as held by a [`SlotStore`].
pub type ErasedValue = Arc<dyn Any + Send + Sync>;

/// Identity of a slot: the value's [`TypeId`] plus a name unique for that type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotKey {
    type_id: TypeId,
    type_name: &'static str,
    name: Cow<'static, str>,
}

impl SlotKey {
    pub fn of<T: Any>(name: impl Into<Cow<'static, str>>) -> Self {
        Self { type_id: TypeId::of::<T>(), type_name: std::any::type_name::<T>(), name: name.into() }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.name, self.type_name)
    }
}

/// Storage backend behind a [`crate::Registry`].
///
/// Each method must be atomic with respect to the others. A missing slot is
/// reported as [`RegistryError::NotFound`] so callers can tell it apart from
/// real failures.
pub trait SlotStore: fmt::Debug + Send + Sync {
    /// Reads a slot, giving up after `timeout` if the store is contended.
    fn get(&self, key: &SlotKey, timeout: Duration) -> Result<ErasedValue, RegistryError>;

    /// Creates a slot; fails with [`RegistryError::AlreadyExists`] if it is populated.
    fn register(&self, key: SlotKey, value: ErasedValue) -> Result<(), RegistryError>;

    /// Swaps the value of an existing slot and returns the old one.
    fn replace(&self, key: SlotKey, value: ErasedValue) -> Result<ErasedValue, RegistryError>;

    /// Registers or replaces in one step, returning the previous value if any.
    fn upsert(&self, key: SlotKey, value: ErasedValue)
    -> Result<Option<ErasedValue>, RegistryError>;

    /// Number of populated slots.
    fn len(&self) -> usize;
}

/// In-memory [`SlotStore`] built on an `FxHashMap` behind a `parking_lot::RwLock`.
#[derive(Debug)]
pub struct MemoryStore {
    slots: RwLock<FxHashMap<SlotKey, ErasedValue>>,
    write_timeout: Duration,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_write_timeout(DEFAULT_WRITE_TIMEOUT)
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose writers wait at most `timeout` for the lock.
    #[must_use]
    pub fn with_write_timeout(timeout: Duration) -> Self {
        Self { slots: RwLock::new(FxHashMap::default()), write_timeout: timeout }
    }

    fn write(
        &self,
        key: &SlotKey,
    ) -> Result<parking_lot::RwLockWriteGuard<'_, FxHashMap<SlotKey, ErasedValue>>, RegistryError>
    {
        self.slots.try_write_for(self.write_timeout).ok_or_else(|| RegistryError::Timeout {
            message: format!("write lock not acquired within {:?}", self.write_timeout).into(),
            context: Some(key.to_string().into()),
        })
    }
}

impl SlotStore for MemoryStore {
    fn get(&self, key: &SlotKey, timeout: Duration) -> Result<ErasedValue, RegistryError> {
        let slots = self.slots.try_read_for(timeout).ok_or_else(|| RegistryError::Timeout {
            message: format!("read lock not acquired within {timeout:?}").into(),
            context: Some(key.to_string().into()),
        })?;
        slots
            .get(key)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound { message: key.to_string().into(), context: None })
    }

    fn register(&self, key: SlotKey, value: ErasedValue) -> Result<(), RegistryError> {
        let mut slots = self.write(&key)?;
        match slots.entry(key) {
            Entry::Occupied(entry) => Err(RegistryError::AlreadyExists {
                message: entry.key().to_string().into(),
                context: None,
            }),
            Entry::Vacant(entry) => {
                trace!(slot = %entry.key(), "Registering slot");
                entry.insert(value);
                Ok(())
            },
        }
    }

    fn replace(&self, key: SlotKey, value: ErasedValue) -> Result<ErasedValue, RegistryError> {
        let mut slots = self.write(&key)?;
        let Some(current) = slots.get_mut(&key) else {
            return Err(RegistryError::NotFound { message: key.to_string().into(), context: None });
        };
        trace!(slot = %key, "Replacing slot");
        Ok(std::mem::replace(current, value))
    }

    fn upsert(
        &self,
        key: SlotKey,
        value: ErasedValue,
    ) -> Result<Option<ErasedValue>, RegistryError> {
        let mut slots = self.write(&key)?;
        trace!(slot = %key, "Upserting slot");
        Ok(slots.insert(key, value))
    }

    fn len(&self) -> usize {
        self.slots.read().len()
    }
}
