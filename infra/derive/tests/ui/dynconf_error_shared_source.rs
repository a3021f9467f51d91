use dynconf_derive::dynconf_error;
use std::borrow::Cow;

#[derive(Debug, thiserror::Error)]
#[error("store unavailable")]
pub struct StoreError;

#[dynconf_error]
pub enum ApplyError {
    #[error("Probe of {slot} failed{}: {source}", format_context(.context))]
    Probe {
        slot: Cow<'static, str>,
        #[source]
        source: StoreError,
        context: Option<Cow<'static, str>>,
    },

    #[error("Write of {slot} failed{}: {source}", format_context(.context))]
    Write {
        slot: Cow<'static, str>,
        #[source]
        source: StoreError,
        context: Option<Cow<'static, str>>,
    },
}

fn write() -> Result<(), ApplyError> {
    Err(ApplyError::Write { slot: "degrade".into(), source: StoreError, context: None })
}

fn main() {
    let err = write().context("g:d").unwrap_err();
    assert_eq!(err.to_string(), "Write of degrade failed (g:d): store unavailable");

    let probe = ApplyError::Probe { slot: "degrade".into(), source: StoreError, context: None };
    assert!(std::error::Error::source(&probe).is_some());
}
