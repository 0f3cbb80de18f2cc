//! Error type shared by every stage of the analysis core.
//!
//! All failures are returned as values; nothing in the core panics on
//! caller-supplied input. A failed operation leaves previously committed
//! state untouched.
use thiserror::Error;

use crate::store::SignalVersion;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Out-of-range frequency, threshold, window, channel or range.
    /// Always caller-correctable.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A detector result was computed against a working signal that has
    /// since been replaced, or was never computed at all (`computed: None`).
    #[error("stale {what}: {}", stale_detail(.computed, .current))]
    StaleState {
        what: &'static str,
        computed: Option<SignalVersion>,
        current: SignalVersion,
    },

    /// A statistics query has no underlying data.
    #[error("no data: {0}")]
    EmptyResult(String),
}

fn stale_detail(computed: &Option<SignalVersion>, current: &SignalVersion) -> String {
    match computed {
        Some(v) => format!("computed against signal version {v}, current is {current}"),
        None => format!("never computed, current signal version is {current}"),
    }
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        log::warn!("rejected parameter: {msg}");
        Error::InvalidParameter(msg)
    }

    pub(crate) fn empty(msg: impl Into<String>) -> Self {
        Error::EmptyResult(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
