//! Error types for txnest
//!
//! This module defines the errors surfaced by the coordinator and its
//! configuration layer. We use `thiserror` for automatic `Display` and
//! `Error` trait implementations.
//!
//! `TransactionError` is generic over the physical resource's own error type,
//! so a failure reported by the resource reaches the caller as the untouched
//! `source` of [`TransactionError::Resource`].

use crate::types::TransactionId;
use std::fmt;
use std::io;
use thiserror::Error;

/// Result type alias for coordinator operations
pub type TxResult<T, E> = std::result::Result<T, TransactionError<E>>;

/// Physical resource operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceOperation {
    /// Opening a physical transaction
    Open,
    /// Committing a physical transaction
    Commit,
    /// Rolling back a physical transaction
    Rollback,
}

impl fmt::Display for ResourceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceOperation::Open => "open",
            ResourceOperation::Commit => "commit",
            ResourceOperation::Rollback => "rollback",
        };
        f.write_str(name)
    }
}

/// Errors raised by the transaction coordinator
///
/// `E` is the error type of the wrapped physical resource.
#[derive(Debug, Error)]
pub enum TransactionError<E> {
    /// Commit was requested, but the transaction had been marked rollback-only
    ///
    /// The physical transaction has already been rolled back when this error
    /// is returned.
    #[error("transaction {transaction} rolled back because it has been marked as rollback-only")]
    UnexpectedRollback {
        /// Physical transaction that was rolled back
        transaction: TransactionId,
    },

    /// The requested propagation cannot be honored in the current context
    #[error("illegal transaction state: {0}")]
    IllegalState(String),

    /// The physical resource failed
    #[error("physical resource failed during {operation}: {source}")]
    Resource {
        /// Operation that failed
        operation: ResourceOperation,
        /// Error reported by the resource
        #[source]
        source: E,
    },
}

impl<E> TransactionError<E> {
    /// Wrap a resource error
    pub fn resource(operation: ResourceOperation, source: E) -> Self {
        TransactionError::Resource { operation, source }
    }

    /// Create an illegal-state error
    pub fn illegal_state(message: impl Into<String>) -> Self {
        TransactionError::IllegalState(message.into())
    }

    /// Whether this is an `UnexpectedRollback`
    pub fn is_unexpected_rollback(&self) -> bool {
        matches!(self, TransactionError::UnexpectedRollback { .. })
    }

    /// Whether this is an `IllegalState`
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, TransactionError::IllegalState(_))
    }

    /// Borrow the resource error, if this wraps one
    pub fn resource_error(&self) -> Option<&E> {
        match self {
            TransactionError::Resource { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Take the resource error, if this wraps one
    pub fn into_resource_error(self) -> Option<E> {
        match self {
            TransactionError::Resource { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Resource operation that failed, if this wraps a resource error
    pub fn failed_operation(&self) -> Option<ResourceOperation> {
        match self {
            TransactionError::Resource { operation, .. } => Some(*operation),
            _ => None,
        }
    }
}

/// Errors raised while loading or storing coordinator configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config file '{path}': {source}")]
    Read {
        /// File path
        path: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Config file could not be written
    #[error("failed to write config file '{path}': {source}")]
    Write {
        /// File path
        path: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Config file contents are invalid
    #[error("failed to parse config file '{path}': {message}")]
    Parse {
        /// File path
        path: String,
        /// Parser message
        message: String,
    },

    /// Config could not be serialized
    #[error("failed to serialize config: {0}")]
    Serialize(String),
}
