//! # Dynconf
//!
//! Applies externally pushed configuration to live, strongly-typed slots.
//!
//! ## Pipeline
//!
//! 1. Subsystems bind [`Callback`]s by key, usually a [`SlotCallback`] per slot.
//! 2. [`defaults::provision`] seeds every configured default before anything
//!    else runs. Any failure aborts startup.
//! 3. [`Listener`]s, built from configuration through [`ListenerKinds`],
//!    observe remote sources and hand each change to a [`Dispatcher`].
//! 4. Each [`SlotCallback`] checks the envelope name, validates the payload
//!    against the strict schema of `Envelope<T>` and stores the value in the
//!    shared [`Registry`].
//!
//! # Example
//!
//! ```rust
//! use dynconf::{Callbacks, Registry};
//! use dynconf::defaults::{CallbacksConfig, DefaultEntry, provision};
//!
//! let registry = Registry::new();
//! let callbacks = Callbacks::new(registry.clone());
//! callbacks.bind_slot::<bool>("g:d", "degrade").unwrap();
//!
//! let defaults = CallbacksConfig {
//!     defaults: vec![DefaultEntry {
//!         keys: vec!["g:d".into()],
//!         default: serde_json::json!({ "name": "degrade", "value": false }),
//!     }],
//! };
//! provision(&callbacks, &defaults).unwrap();
//! assert!(!registry.get::<bool>("degrade").unwrap());
//! ```

mod bootstrap;
mod callback;
pub mod config;
pub mod defaults;
mod dispatch;
mod envelope;
mod error;
mod listener;
mod slot;

pub use bootstrap::{Dynconf, RunningListeners};
pub use callback::{Callback, CallbackFn, Callbacks, SharedCallback};
pub use dispatch::{CallbackFailure, DispatchReport, Dispatcher};
pub use dynconf_registry::{Registry, RegistryError};
pub use dynconf_schema::{Shape, Validator};
pub use envelope::{Envelope, check_name};
pub use error::{DynconfError, DynconfErrorExt};
pub use listener::{
    Listener, ListenerContext, ListenerDescriptor, ListenerFactory, ListenerKinds, Shutdown,
    Subscription, source_key,
};
pub use slot::{DEFAULT_PROBE_TIMEOUT, SlotCallback, SlotValue, Transition};
