//! Error types for Setlog with categorization:
//!
//! - **Domain errors**: the caller asked for something the data does not allow
//!   (`NotFound`, `Conflict`, invalid identifiers, exercises or paper text)
//! - **Execution errors**: the atomic scope or the database failed
//!   (`TransactionAbort`, `DatabaseError`)
//! - **Environment errors**: configuration, parsing of stored data, IO
//!
//! Nothing here is retried. Errors surface to the immediate caller.

use std::fmt::Display;

use thiserror::Error;

use crate::domain::{AggregateError, IdentifierError};

/// Top-level error type for the core.
#[derive(Debug, Error)]
pub enum Error {
    /// Referenced workout or exercise does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Write would duplicate an existing record
    #[error("conflict: {0}")]
    Conflict(String),

    /// Atomic scope failed; nothing inside it was applied
    #[error("transaction aborted during {operation}: {reason}")]
    TransactionAbort {
        operation: &'static str,
        reason: String,
    },

    /// Database operation failed outside an atomic scope
    #[error("database error: {0}")]
    DatabaseError(String),

    #[error(transparent)]
    InvalidIdentifier(#[from] IdentifierError),

    #[error(transparent)]
    InvalidExercise(#[from] AggregateError),

    /// Exercise paper text could not be read
    #[error("invalid exercise paper at line {line}: {reason}")]
    InvalidPaper { line: usize, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("io error: {0}")]
    IoError(String),
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Create a not found error for an entity kind and id.
    pub fn not_found(entity: &'static str, id: impl Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict(reason.into())
    }

    pub fn transaction_abort(operation: &'static str, reason: impl Display) -> Self {
        Self::TransactionAbort {
            operation,
            reason: reason.to_string(),
        }
    }

    pub fn database_error(msg: impl Into<String>) -> Self {
        Self::DatabaseError(msg.into())
    }

    pub fn invalid_paper(line: usize, reason: impl Into<String>) -> Self {
        Self::InvalidPaper {
            line,
            reason: reason.into(),
        }
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::IoError(msg.into())
    }

    /// Errors caused by the request itself rather than by the store.
    #[must_use]
    pub const fn is_domain(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::Conflict(_)
                | Self::InvalidIdentifier(_)
                | Self::InvalidExercise(_)
                | Self::InvalidPaper { .. }
        )
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Process exit code for command-line front ends.
    ///
    /// 1 for invalid input, 2 for missing or conflicting records, 3 for
    /// store and environment failures.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidIdentifier(_)
            | Self::InvalidExercise(_)
            | Self::InvalidPaper { .. }
            | Self::InvalidConfig(_) => 1,
            Self::NotFound { .. } | Self::Conflict(_) => 2,
            Self::TransactionAbort { .. }
            | Self::DatabaseError(_)
            | Self::ParseError(_)
            | Self::IoError(_) => 3,
        }
    }

    /// Classify a failure raised inside an atomic scope.
    ///
    /// Domain errors pass through unchanged; everything else becomes
    /// [`Error::TransactionAbort`] for `operation`.
    #[must_use]
    pub fn into_abort(self, operation: &'static str) -> Self {
        if self.is_domain() || matches!(self, Self::TransactionAbort { .. }) {
            self
        } else {
            Self::transaction_abort(operation, self)
        }
    }
}
