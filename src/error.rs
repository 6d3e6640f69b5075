// error.rs — crate-wide error taxonomy.
//
// Three categories, matching how failures are actually handled:
//
//   InvalidParameter   — caller precondition violated (bad dimensions,
//                        too-short signal, mismatched band lengths).
//                        Checked before any GPU buffer is touched.
//   UnsupportedFeature — no compute device exists on this machine. The
//                        backend selector treats this as "CPU only"; it
//                        surfaces as an error only from code that cannot
//                        run without a device at all.
//   InternalError      — device, queue, kernel, or command-buffer creation
//                        failed at runtime. Never retried internally; the
//                        caller may force the CPU backend on a later call.

use std::fmt;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the transform engine and its GPU layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A caller-supplied argument violates a documented precondition.
    /// The message names the argument and the constraint.
    InvalidParameter(String),
    /// No compute device is present on this system.
    UnsupportedFeature(String),
    /// A GPU object (device, queue, pipeline, command buffer) could not
    /// be created or a dispatch failed after submission.
    InternalError(String),
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidParameter(msg.into())
    }

    pub(crate) fn unsupported(msg: impl Into<String>) -> Self {
        Error::UnsupportedFeature(msg.into())
    }

    pub(crate) fn internal(msg: impl Into<String>) -> Self {
        Error::InternalError(msg.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
            Error::UnsupportedFeature(msg) => write!(f, "unsupported feature: {msg}"),
            Error::InternalError(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}
