use std::borrow::Cow;

/// Errors raised by registry lookups and writes.
#[dynconf_derive::dynconf_error]
pub enum RegistryError {
    /// No slot exists for the requested `(type, name)` pair.
    #[error("Slot not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A register action hit a slot that is already populated.
    #[error("Slot already registered{}: {message}", format_context(.context))]
    AlreadyExists { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The stored value could not be downcast to the requested type.
    /// This indicates a broken store implementation, since keys carry the type identity.
    #[error("Type mismatch{}: {message}", format_context(.context))]
    TypeMismatch { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The store lock could not be acquired within the allotted time.
    #[error("Registry timed out{}: {message}", format_context(.context))]
    Timeout { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Backend failures that fit no other class.
    #[error("Internal registry error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl RegistryError {
    /// `true` for the recoverable "slot is unregistered" condition.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[must_use]
    pub const fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
