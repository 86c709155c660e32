// src/error.rs

//! Crate-wide error types.
//!
//! Library modules return `crate::Result`; the command layer wraps these
//! with `anyhow` for user-facing context. Action-level failures inside an
//! apply run are reported per action via [`ErrorKind`] rather than
//! propagated, so a partially-failed apply still returns a complete result.

use thiserror::Error;

/// Errors produced by the outfit library
#[derive(Debug, Error)]
pub enum Error {
    #[error("Initialization error: {0}")]
    InitError(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("Snapshot error: {0}")]
    SnapshotError(String),

    #[error("Descriptor error: {0}")]
    DescriptorError(#[from] crate::descriptor::DescriptorError),

    #[error("Incompatible descriptor: {0}")]
    Incompatible(String),

    #[error("Unknown package source: {0}")]
    UnknownSource(String),

    #[error("Executor error: {0}")]
    ExecutorError(String),

    #[error("Preference store error: {0}")]
    PreferenceError(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::IoError(e.to_string())
    }
}

/// Result type for outfit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Classification of a single failed reconciliation action.
///
/// These are the only failure categories an [`crate::apply::ApplyResult`]
/// reports; every entry in `failed` carries exactly one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum ErrorKind {
    /// Descriptor major version rejected by the compatibility gate
    IncompatibleVersion,
    /// Package source not available on this host
    MissingPackageSource,
    /// Version string could not be parsed; lexicographic fallback used
    MalformedVersionString,
    /// The sandbox executor reported a failure
    ExecutorFailure,
    /// The action exceeded its per-action timeout
    Timeout,
    /// Rollback of a failed action itself failed; host state may be inconsistent
    RollbackFailure,
    /// The local preference store rejected a preference change
    PreferenceStore,
}
