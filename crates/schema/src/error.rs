use crate::violation::Violations;
use std::borrow::Cow;

/// Errors produced while validating a payload against a derived schema.
#[dynconf_derive::dynconf_error]
pub enum SchemaError {
    /// The payload is not well-formed JSON.
    #[error("Invalid JSON payload{}: {source}", format_context(.context))]
    Parse { source: serde_json::Error, context: Option<Cow<'static, str>> },

    /// The payload is JSON but does not match the schema.
    /// Displays exactly as the violation list so tooling can match on it.
    #[error("{violations}")]
    Violation { violations: Violations },
}

impl SchemaError {
    /// The individual violations, empty for parse failures.
    #[must_use]
    pub fn violations(&self) -> &[crate::Violation] {
        match self {
            Self::Violation { violations } => violations.as_slice(),
            Self::Parse { .. } => &[],
        }
    }
}
