//! Core trait for the physical transactional resource
//!
//! The coordinator never talks to a datastore directly. It drives whatever
//! implements [`PhysicalResource`]: a database connection, a file journal, or
//! an in-memory double in tests.

use std::sync::Arc;

use crate::types::TransactionDefinition;

/// A resource that can run physical transactions
///
/// Each call to [`open`](PhysicalResource::open) starts one physical
/// transaction and returns a token identifying it. The coordinator later hands
/// that token back to exactly one of [`commit`](PhysicalResource::commit) or
/// [`rollback`](PhysicalResource::rollback).
///
/// Calls are blocking. The coordinator does not retry them; any error is
/// returned to the caller unchanged.
///
/// Thread safety: a coordinator shared between threads calls the resource
/// concurrently, one physical transaction per execution context (requires
/// Send + Sync).
pub trait PhysicalResource: Send + Sync {
    /// Handle of one open physical transaction
    type Token: std::fmt::Debug + Send + Sync;

    /// Resource-specific failure
    type Error: std::error::Error + Send + Sync + 'static;

    /// Start a physical transaction
    ///
    /// # Errors
    ///
    /// Returns an error if the resource cannot start a transaction.
    fn open(&self, definition: &TransactionDefinition) -> Result<Self::Token, Self::Error>;

    /// Commit a physical transaction
    ///
    /// # Errors
    ///
    /// Returns an error if the resource fails to commit.
    fn commit(&self, token: &Self::Token) -> Result<(), Self::Error>;

    /// Roll back a physical transaction
    ///
    /// # Errors
    ///
    /// Returns an error if the resource fails to roll back.
    fn rollback(&self, token: &Self::Token) -> Result<(), Self::Error>;
}

impl<R: PhysicalResource + ?Sized> PhysicalResource for Arc<R> {
    type Token = R::Token;
    type Error = R::Error;

    fn open(&self, definition: &TransactionDefinition) -> Result<Self::Token, Self::Error> {
        (**self).open(definition)
    }

    fn commit(&self, token: &Self::Token) -> Result<(), Self::Error> {
        (**self).commit(token)
    }

    fn rollback(&self, token: &Self::Token) -> Result<(), Self::Error> {
        (**self).rollback(token)
    }
}
