//! Domain error taxonomy.
//!
//! Every service operation resolves to one of these variants. Validation and
//! permission failures are raised before anything is written; storage errors
//! are wrapped by the storage crate's `From` impl.

use thiserror::Error;

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the lifecycle, admin and project services.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad input; nothing was persisted.
    #[error("validation failed on `{field}`: {message}")]
    Validation {
        /// The offending input field.
        field: &'static str,
        /// Human-readable message suitable for direct display.
        message: String,
    },

    /// The id did not resolve to a record.
    #[error("not found: {0}")]
    NotFound(String),

    /// Uniqueness or state conflict (duplicate username, already converted).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Role or ownership check failed.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Disallowed status-machine edge.
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition {
        /// Status the record is in.
        from: String,
        /// Status that was requested.
        to: String,
    },

    /// The record is not in a state that permits the operation.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The operation itself is not permitted (self-delete, last super admin).
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Workload limit reached.
    #[error("capacity exceeded: workload {workload} of {max}")]
    CapacityExceeded {
        /// Current assigned-project count.
        workload: u32,
        /// Configured capacity.
        max: u32,
    },

    /// External email/repository call failed.
    #[error("dispatch failed: {0}")]
    Dispatch(String),

    /// Underlying storage failure.
    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Shorthand for a field-level validation error.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Shorthand for a not-found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Shorthand for a conflict error.
    pub fn conflict(what: impl Into<String>) -> Self {
        Self::Conflict(what.into())
    }
}
