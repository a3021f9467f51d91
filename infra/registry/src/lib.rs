//! # Registry
//!
//! A process-wide mapping from `(type, name)` to a value of that type.
//!
//! ## Overview
//!
//! Values are stored type-erased behind the [`SlotStore`] interface and
//! recovered through the generic [`Registry`] accessor, which checks the type
//! at the boundary. Every store operation is atomic on its own; [`Registry::upsert`]
//! is the single verb to use when "register if absent, otherwise replace" must
//! not race with other writers.
//!
//! ## Features
//!
//! * **Type-Safe**: Slots are keyed by the Rust type *and* a name.
//! * **Swappable backend**: [`MemoryStore`] by default, any [`SlotStore`] via [`Registry::with_store`].
//! * **Bounded waits**: lock acquisition is timed; contention surfaces as [`RegistryError::Timeout`].
//!
//! # Example
//!
//! ```rust
//! use dynconf_registry::{Registry, RegistryError};
//!
//! # fn main() -> Result<(), RegistryError> {
//! let registry = Registry::new();
//! registry.register("degrade", false)?;
//! assert!(!registry.get::<bool>("degrade")?);
//!
//! let previous = registry.upsert("degrade", true)?;
//! assert_eq!(previous, Some(false));
//! # Ok(())
//! # }
//! ```

mod error;
mod registry;
mod store;

pub use error::{RegistryError, RegistryErrorExt};
pub use registry::{DEFAULT_TIMEOUT, Registry};
pub use store::{ErasedValue, MemoryStore, SlotKey, SlotStore};
