use crate::error::DynconfError;
use dynconf_schema::Shape;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire form of a pushed change: the slot name plus its full value.
///
/// ```json
/// { "name": "degrade", "value": true }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Shape)]
pub struct Envelope<T> {
    pub name: String,
    pub value: T,
}

impl<T> Envelope<T> {
    pub fn new(name: impl Into<String>, value: T) -> Self {
        Self { name: name.into(), value }
    }
}

/// Only the `name` of an envelope; `value` is skipped without being decoded.
#[derive(Deserialize)]
struct NameProbe {
    #[serde(default)]
    name: Option<Value>,
}

/// Checks that `payload` is addressed to the slot called `expected`.
///
/// # Errors
/// [`DynconfError::Decode`] if the payload is not a JSON object,
/// [`DynconfError::NameMismatch`] if `name` is missing, not a string or different.
pub fn check_name(payload: &[u8], expected: &str) -> Result<(), DynconfError> {
    let probe: NameProbe = serde_json::from_slice(payload)?;
    match probe.name {
        Some(Value::String(name)) if name == expected => Ok(()),
        found => Err(DynconfError::NameMismatch {
            expected: expected.to_owned().into(),
            found: found.map_or_else(|| "<missing>".to_owned(), |v| v.to_string()),
            context: None,
        }),
    }
}
