use crate::callback::Callbacks;
use crate::error::DynconfError;
use tracing::{debug, warn};

/// A callback that failed during a dispatch.
#[derive(Debug)]
pub struct CallbackFailure {
    pub callback: String,
    pub error: DynconfError,
}

/// Outcome of delivering one payload to its bound callbacks.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failures: Vec<CallbackFailure>,
}

impl DispatchReport {
    /// `true` when every bound callback applied the payload.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Delivers observed changes to the callbacks bound to a source.
///
/// Each callback is resolved and applied on its own: a failure is logged and
/// reported but never stops delivery to the rest.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    callbacks: Callbacks,
}

impl Dispatcher {
    #[must_use]
    pub const fn new(callbacks: Callbacks) -> Self {
        Self { callbacks }
    }

    #[must_use]
    pub const fn callbacks(&self) -> &Callbacks {
        &self.callbacks
    }

    pub fn dispatch<K: AsRef<str>>(&self, source_key: &str, payload: &[u8], keys: &[K]) -> DispatchReport {
        let mut report = DispatchReport::default();

        for key in keys {
            let key = key.as_ref();
            let applied = self.callbacks.resolve(key).and_then(|callback| callback.apply(source_key, payload));
            match applied {
                Ok(()) => report.delivered += 1,
                Err(error) => {
                    warn!(source_key, callback = key, %error, "Callback failed");
                    report.failures.push(CallbackFailure { callback: key.to_owned(), error });
                },
            }
        }

        debug!(
            source_key,
            delivered = report.delivered,
            failed = report.failures.len(),
            "Dispatched change"
        );
        report
    }
}
