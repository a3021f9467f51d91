use crate::error::SchemaError;
use crate::schema::{RequirednessRule, Schema, StrictRule};
use crate::shape::Shape;
use fxhash::FxHashMap;
use parking_lot::RwLock;
use serde_json::Value;
use std::any::{Any, TypeId, type_name};
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Validates payloads against schemas derived once per type.
///
/// The cache is keyed by [`TypeId`]; the schema of a type never changes at
/// runtime, so entries are never evicted.
#[derive(Debug)]
pub struct Validator {
    rule: Box<dyn RequirednessRule>,
    schemas: RwLock<FxHashMap<TypeId, Arc<Schema>>>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::strict()
    }
}

impl Validator {
    /// A validator using [`StrictRule`].
    #[must_use]
    pub fn strict() -> Self {
        Self::with_rule(StrictRule)
    }

    pub fn with_rule(rule: impl RequirednessRule + 'static) -> Self {
        Self { rule: Box::new(rule), schemas: RwLock::new(FxHashMap::default()) }
    }

    /// Process-wide strict validator shared by every slot callback.
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<Validator>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Self::strict())))
    }

    /// Cached schema of `T`, derived on first use.
    pub fn schema<T: Shape + Any>(&self) -> Arc<Schema> {
        let id = TypeId::of::<T>();
        if let Some(schema) = self.schemas.read().get(&id) {
            return Arc::clone(schema);
        }

        // Derive outside the lock; a racing thread may insert first.
        let derived = Arc::new(Schema::derive::<T>(self.rule.as_ref()));
        debug!(ty = type_name::<T>(), "Derived payload schema");
        Arc::clone(self.schemas.write().entry(id).or_insert(derived))
    }

    /// Parses `payload` and checks it against the schema of `T`.
    ///
    /// Returns the parsed document so callers can decode it without parsing twice.
    ///
    /// # Errors
    /// [`SchemaError::Parse`] for malformed JSON, [`SchemaError::Violation`]
    /// with every violation otherwise.
    pub fn validate<T: Shape + Any>(&self, payload: &[u8]) -> Result<Value, SchemaError> {
        let document: Value = serde_json::from_slice(payload)?;
        self.validate_value::<T>(&document)?;
        Ok(document)
    }

    /// Checks an already parsed document against the schema of `T`.
    pub fn validate_value<T: Shape + Any>(&self, document: &Value) -> Result<(), SchemaError> {
        self.schema::<T>()
            .validate(document)
            .map_err(|violations| SchemaError::Violation { violations })
    }

    /// Number of cached schemas.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.schemas.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DeclaredRule;

    #[test]
    fn schemas_are_derived_once_per_type() {
        let validator = Validator::strict();
        let first = validator.schema::<Vec<String>>();
        let second = validator.schema::<Vec<String>>();
        assert!(Arc::ptr_eq(&first, &second));
        let _ = validator.schema::<bool>();
        assert_eq!(validator.cached(), 2);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = Validator::with_rule(DeclaredRule).validate::<bool>(b"{not json").unwrap_err();
        assert!(matches!(err, SchemaError::Parse { .. }));
        assert!(err.violations().is_empty());
    }

    #[test]
    fn global_is_shared() {
        assert!(Arc::ptr_eq(&Validator::global(), &Validator::global()));
    }
}
