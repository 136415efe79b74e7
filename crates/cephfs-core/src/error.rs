//! Error taxonomy and native errno translation.
//!
//! Every libcephfs entry point reports failure as a (usually negative) errno.
//! Those codes never leave this crate raw: [`translate`] classifies them into
//! [`Error`] variants, keeping the numeric code for anything it does not
//! recognise.
//!
//! Binding-level failures (wrong lifecycle state, unusable arguments, missing
//! native library) have their own variants so callers can tell a programming
//! error apart from a filesystem error.

use std::ffi::c_int;

use thiserror::Error;

use crate::client::State;

/// Errors returned by the CephFS binding.
#[derive(Debug, Error)]
pub enum Error {
    /// EPERM from the native library.
    #[error("Permission denied: {context}")]
    Permission { context: String },

    /// ENOENT from the native library.
    #[error("Object not found: {context}")]
    ObjectNotFound { context: String },

    /// EIO from the native library.
    #[error("I/O error: {context}")]
    Io { context: String },

    /// ENOSPC from the native library.
    #[error("No space left: {context}")]
    NoSpace { context: String },

    /// EEXIST from the native library.
    #[error("Object already exists: {context}")]
    ObjectExists { context: String },

    /// ENODATA from the native library.
    #[error("No data available: {context}")]
    NoData { context: String },

    /// Any other native error code.
    ///
    /// `code` is the positive errno; `i32::MIN`, whose magnitude does not
    /// fit, is kept as returned.
    #[error("{context}: error code {}", code.unsigned_abs())]
    Native { context: String, code: i32 },

    /// The operation is not valid in the session's current lifecycle state.
    #[error("You cannot perform that operation on a CephFS object in state {state}")]
    InvalidState { state: State },

    /// An argument cannot be passed across the native boundary.
    #[error("Invalid argument {name}: {reason}")]
    ArgumentType { name: &'static str, reason: String },

    /// The native library could not be loaded or bound.
    #[error("Unable to load libcephfs: {0}")]
    Environment(String),
}

/// Result type for CephFS operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Translates a native return code into an [`Error`].
///
/// The sign of `code` is ignored. Codes outside the classified set become
/// [`Error::Native`] with the absolute code embedded in the message.
pub fn translate(code: c_int, context: impl Into<String>) -> Error {
    let context = context.into();
    match magnitude(code) {
        libc::EPERM => Error::Permission { context },
        libc::ENOENT => Error::ObjectNotFound { context },
        libc::EIO => Error::Io { context },
        libc::ENOSPC => Error::NoSpace { context },
        libc::EEXIST => Error::ObjectExists { context },
        libc::ENODATA => Error::NoData { context },
        code => Error::Native { context, code },
    }
}

/// Absolute value of a native return code. `i32::MIN` has no positive
/// counterpart and is returned unchanged.
pub(crate) fn magnitude(code: c_int) -> i32 {
    code.checked_abs().unwrap_or(code)
}

/// Fails with a translated error when `ret` is non-zero.
///
/// For entry points that return 0 on success.
pub(crate) fn check(ret: c_int, context: impl FnOnce() -> String) -> Result<()> {
    if ret == 0 {
        Ok(())
    } else {
        Err(translate(ret, context()))
    }
}

/// Fails with a translated error when `ret` is negative, passing other
/// values through.
///
/// For entry points whose non-negative return carries data (descriptors).
pub(crate) fn check_nonneg(ret: c_int, context: impl FnOnce() -> String) -> Result<c_int> {
    if ret < 0 {
        Err(translate(ret, context()))
    } else {
        Ok(ret)
    }
}

impl Error {
    /// Returns the errno this error was translated from, if it came from
    /// the native library.
    pub fn errno(&self) -> Option<i32> {
        match self {
            Error::Permission { .. } => Some(libc::EPERM),
            Error::ObjectNotFound { .. } => Some(libc::ENOENT),
            Error::Io { .. } => Some(libc::EIO),
            Error::NoSpace { .. } => Some(libc::ENOSPC),
            Error::ObjectExists { .. } => Some(libc::EEXIST),
            Error::NoData { .. } => Some(libc::ENODATA),
            Error::Native { code, .. } => Some(*code),
            Error::InvalidState { .. } | Error::ArgumentType { .. } | Error::Environment(_) => {
                None
            }
        }
    }

    /// True when the error originated in the native library rather than in
    /// the binding's own precondition checks.
    pub fn is_native(&self) -> bool {
        self.errno().is_some()
    }
}
