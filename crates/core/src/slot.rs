use crate::callback::Callback;
use crate::envelope::{Envelope, check_name};
use crate::error::{DynconfError, DynconfErrorExt};
use dynconf_registry::Registry;
use dynconf_schema::{SchemaError, Shape, Validator};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Upper bound on how long the probe waits for the registry.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Types that can live in a slot fed by a [`SlotCallback`].
pub trait SlotValue: Shape + Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> SlotValue for T where T: Shape + Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

/// What an apply did to its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The slot held no value before.
    First,
    /// An existing value was replaced.
    Changed,
}

/// Binds the registry slot `name` of type `T` to the [`Callback`] capability.
///
/// Every payload is checked before anything is written: the envelope must be
/// addressed to this slot and must pass the strict schema of `Envelope<T>`.
/// A failed apply never mutates the registry.
pub struct SlotCallback<T> {
    name: Cow<'static, str>,
    registry: Registry,
    validator: Arc<Validator>,
    probe_timeout: Duration,
    _value: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for SlotCallback<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotCallback")
            .field("name", &self.name)
            .field("value", &std::any::type_name::<T>())
            .field("probe_timeout", &self.probe_timeout)
            .finish_non_exhaustive()
    }
}

impl<T: SlotValue> SlotCallback<T> {
    pub fn new(name: impl Into<Cow<'static, str>>, registry: Registry) -> Self {
        Self {
            name: name.into(),
            registry,
            validator: Validator::global(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            _value: PhantomData,
        }
    }

    #[must_use]
    pub fn with_validator(mut self, validator: Arc<Validator>) -> Self {
        self.validator = validator;
        self
    }

    #[must_use]
    pub const fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value of the slot, if any.
    pub fn current(&self) -> Result<Option<T>, DynconfError> {
        self.probe()
    }

    /// Validates `payload` and stores its value, reporting the transition.
    ///
    /// # Errors
    /// * [`DynconfError::Probe`] when the registry cannot be read in time.
    /// * [`DynconfError::NameMismatch`] when the envelope targets another slot.
    /// * [`DynconfError::SchemaViolation`] listing every offending field.
    /// * [`DynconfError::RegistryWrite`] when the store rejects the write.
    pub fn apply_payload(&self, source_key: &str, payload: &[u8]) -> Result<Transition, DynconfError> {
        let probed = self.probe().context(source_key.to_owned())?;

        check_name(payload, &self.name).context(source_key.to_owned())?;

        let document = self
            .validator
            .validate::<Envelope<T>>(payload)
            .map_err(|err| self.rejected(source_key, err))?;
        let envelope: Envelope<T> =
            serde_json::from_value(document).context(format!("decode slot {}", self.name))?;

        let previous = self
            .registry
            .upsert(self.name.clone(), envelope.value.clone())
            .map_err(|source| DynconfError::RegistryWrite {
                slot: self.name.clone(),
                source,
                context: Some(source_key.to_owned().into()),
            })?;

        let current = render(&envelope.value);
        match previous {
            None => {
                info!(slot = %self.name, source_key, value = %current, "First value received");
                Ok(Transition::First)
            },
            Some(previous) => {
                if probed.is_none() {
                    debug!(slot = %self.name, source_key, "Slot was registered concurrently, replaced it");
                }
                info!(
                    slot = %self.name,
                    source_key,
                    previous = %render(&previous),
                    current = %current,
                    "Slot value changed"
                );
                Ok(Transition::Changed)
            },
        }
    }

    fn probe(&self) -> Result<Option<T>, DynconfError> {
        match self.registry.get_within::<T>(&self.name, self.probe_timeout) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(source) => Err(DynconfError::Probe { slot: self.name.clone(), source, context: None }),
        }
    }

    /// Violations carry no context: their message is exactly the violation list.
    fn rejected(&self, source_key: &str, err: SchemaError) -> DynconfError {
        match err {
            SchemaError::Violation { violations } => {
                DynconfError::SchemaViolation { slot: self.name.clone(), violations }
            },
            SchemaError::Parse { source, .. } => {
                DynconfError::Decode { source, context: Some(source_key.to_owned().into()) }
            },
        }
    }
}

impl<T: SlotValue> Callback for SlotCallback<T> {
    fn apply(&self, source_key: &str, payload: &[u8]) -> Result<(), DynconfError> {
        self.apply_payload(source_key, payload).map(|_| ())
    }
}

fn render<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|err| format!("<unrenderable: {err}>"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Shape)]
    struct Limits {
        #[serde(default)]
        burst: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    }

    fn slot() -> SlotCallback<Limits> {
        SlotCallback::new("limits", Registry::new())
    }

    #[test]
    fn first_apply_registers_then_replaces() {
        let slot = slot();
        let first = slot.apply_payload("g:d", br#"{"name":"limits","value":{"burst":1,"label":null}}"#);
        assert_eq!(first.unwrap(), Transition::First);

        let second = slot.apply_payload("g:d", br#"{"name":"limits","value":{"burst":2,"label":"x"}}"#);
        assert_eq!(second.unwrap(), Transition::Changed);
        assert_eq!(
            slot.current().unwrap(),
            Some(Limits { burst: 2, label: Some("x".into()) })
        );
    }

    #[test]
    fn nested_optional_fields_are_required() {
        let slot = slot();
        let err = slot.apply_payload("g:d", br#"{"name":"limits","value":{"burst":1}}"#).unwrap_err();
        assert!(err.is_schema_violation());
        assert_eq!(err.to_string(), "jsonschema: - value.label: is required\n");
        assert_eq!(slot.current().unwrap(), None);
    }

    #[test]
    fn rejections_keep_violations_verbatim_and_tag_decode_errors() {
        let slot = slot();
        let violation = slot.apply_payload("g:d", br#"{"name":"limits","value":{"label":null}}"#).unwrap_err();
        assert_eq!(violation.to_string(), "jsonschema: - value.burst: is required\n");

        let parse = serde_json::from_slice::<serde_json::Value>(b"{").unwrap_err();
        let err = slot.rejected("g:d", SchemaError::Parse { source: parse, context: None });
        assert!(matches!(err, DynconfError::Decode { context: Some(ref c), .. } if c == "g:d"));
    }

    #[test]
    fn name_is_checked_before_schema() {
        let slot = slot();
        let err = slot.apply_payload("g:d", br#"{"name":"other","value":{}}"#).unwrap_err();
        assert!(err.is_name_mismatch());
        assert_eq!(slot.current().unwrap(), None);
    }

    #[test]
    fn contended_probe_fails_without_writing() {
        use dynconf_registry::{ErasedValue, RegistryError, SlotKey, SlotStore};

        #[derive(Debug)]
        struct Jammed;

        impl SlotStore for Jammed {
            fn get(&self, key: &SlotKey, _: Duration) -> Result<ErasedValue, RegistryError> {
                Err(RegistryError::Timeout { message: key.to_string().into(), context: None })
            }
            fn register(&self, _: SlotKey, _: ErasedValue) -> Result<(), RegistryError> {
                unreachable!("probe failure must stop the apply")
            }
            fn replace(&self, _: SlotKey, _: ErasedValue) -> Result<ErasedValue, RegistryError> {
                unreachable!("probe failure must stop the apply")
            }
            fn upsert(&self, _: SlotKey, _: ErasedValue) -> Result<Option<ErasedValue>, RegistryError> {
                unreachable!("probe failure must stop the apply")
            }
            fn len(&self) -> usize {
                0
            }
        }

        let slot = SlotCallback::<bool>::new("degrade", Registry::with_store(Jammed))
            .with_probe_timeout(Duration::from_millis(5));
        let err = slot.apply("g:d", br#"{"name":"degrade","value":true}"#).unwrap_err();
        assert!(matches!(err, DynconfError::Probe { .. }));
        assert!(err.to_string().contains("(g:d)"));
    }
}
