//! # Schema
//!
//! Derives a validation schema from a Rust type and enforces it on raw JSON
//! payloads before they are decoded.
//!
//! ## Overview
//!
//! * [`Shape`] describes a type's wire form. `#[derive(Shape)]` builds it from
//!   the type's fields and `serde` attributes.
//! * [`Schema::derive`] walks that description and asks a [`RequirednessRule`]
//!   whether each field is required. [`StrictRule`] forces every field of
//!   nested objects to be required while the outermost object (the wrapper)
//!   keeps its declared optionality.
//! * [`Validator`] caches one schema per type and reports every violation in a
//!   stable, line-per-violation format.
//!
//! # Example
//!
//! ```rust
//! use dynconf_schema::{Shape, Validator};
//!
//! #[derive(Shape)]
//! struct Wrapper {
//!     name: String,
//!     value: Inner,
//! }
//!
//! #[derive(Shape)]
//! struct Inner {
//!     #[serde(default)]
//!     burst: u32,
//! }
//!
//! let validator = Validator::strict();
//! let err = validator
//!     .validate::<Wrapper>(br#"{"name":"limits","value":{}}"#)
//!     .unwrap_err();
//! assert_eq!(err.to_string(), "jsonschema: - value.burst: is required\n");
//! ```

mod error;
mod schema;
mod shape;
mod validator;
mod violation;

pub use dynconf_derive::Shape;
pub use error::{SchemaError, SchemaErrorExt};
pub use schema::{DeclaredRule, Node, ObjectNode, Property, RequirednessRule, Schema, StrictRule};
pub use shape::{FieldShape, ObjectShape, Shape, ShapeKind};
pub use validator::Validator;
pub use violation::{Rule, VIOLATION_MARKER, Violation, Violations};
