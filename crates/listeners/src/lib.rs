//! # Listeners
//!
//! Reference [`Listener`](dynconf::Listener) implementations.
//!
//! * [`HttpListener`] (`http`): polls urls on an interval and dispatches a
//!   body whenever it changes.
//! * [`PushListener`]: subscribes to a [`ConfigSource`] and dispatches every
//!   pushed change. [`MemorySource`] is an in-process source.
//!
//! ```rust
//! use dynconf::ListenerKinds;
//!
//! let mut kinds = ListenerKinds::new();
//! dynconf_listeners::register_builtin(&mut kinds);
//! assert!(kinds.contains("http"));
//! ```

mod duration;
mod http;
mod push;

use dynconf::ListenerKinds;

pub use http::{HttpConfig, HttpData, HttpListener, KIND as HTTP_KIND};
pub use push::{ConfigSource, Content, MemorySource, PushConfig, PushListener};

/// Registers every listener kind that needs no external collaborator.
pub fn register_builtin(kinds: &mut ListenerKinds) -> &mut ListenerKinds {
    kinds.register_typed(HTTP_KIND, HttpListener::new)
}
