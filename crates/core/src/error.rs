use dynconf_registry::RegistryError;
use dynconf_schema::Violations;
use std::borrow::Cow;

/// Errors raised while seeding, dispatching or applying configuration.
///
/// A slot that is not registered yet is never reported here: the probe treats
/// it as the first-value branch.
#[dynconf_derive::dynconf_error]
pub enum DynconfError {
    /// The registry could not be read before applying (contended or broken).
    #[error("Probe of slot {slot} failed{}: {source}", format_context(.context))]
    Probe {
        slot: Cow<'static, str>,
        #[source]
        source: RegistryError,
        context: Option<Cow<'static, str>>,
    },

    #[error("Slot name mismatch{}: expected {expected:?}, found {found}", format_context(.context))]
    NameMismatch {
        expected: Cow<'static, str>,
        found: String,
        context: Option<Cow<'static, str>>,
    },

    /// Displays exactly as the violation list.
    #[error("{violations}")]
    SchemaViolation { slot: Cow<'static, str>, violations: Violations },

    #[error("Invalid payload{}: {source}", format_context(.context))]
    Decode { source: serde_json::Error, context: Option<Cow<'static, str>> },

    /// The registry rejected the write; nothing was stored.
    #[error("Write to slot {slot} failed{}: {source}", format_context(.context))]
    RegistryWrite {
        slot: Cow<'static, str>,
        #[source]
        source: RegistryError,
        context: Option<Cow<'static, str>>,
    },

    #[error("Registry error{}: {source}", format_context(.context))]
    Registry { source: RegistryError, context: Option<Cow<'static, str>> },

    #[error("Callback {key} not found{}", format_context(.context))]
    CallbackNotFound { key: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Callback {key} failed{}: {source}", format_context(.context))]
    Callback {
        key: Cow<'static, str>,
        #[source]
        source: Box<DynconfError>,
        context: Option<Cow<'static, str>>,
    },

    #[error("Unknown listener kind {kind:?}{}", format_context(.context))]
    ListenerKind { kind: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Invalid {kind} listener configuration{}: {source}", format_context(.context))]
    ListenerConfig {
        kind: Cow<'static, str>,
        #[source]
        source: serde_json::Error,
        context: Option<Cow<'static, str>>,
    },

    #[error("Listener error{}: {message}", format_context(.context))]
    Listener { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl DynconfError {
    /// Wraps a callback failure with the key it was resolved by.
    pub fn callback(key: impl Into<Cow<'static, str>>, source: Self) -> Self {
        Self::Callback { key: key.into(), source: Box::new(source), context: None }
    }

    /// Follows [`DynconfError::Callback`] wrappers down to the originating error.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Callback { source, .. } => source.root(),
            other => other,
        }
    }

    #[must_use]
    pub const fn is_name_mismatch(&self) -> bool {
        matches!(self, Self::NameMismatch { .. })
    }

    #[must_use]
    pub const fn is_schema_violation(&self) -> bool {
        matches!(self, Self::SchemaViolation { .. })
    }
}
